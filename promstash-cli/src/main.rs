//! CLI for promstash metric snapshots.
//!
//! Every command works on a JSON snapshot of an in-memory store: it loads
//! the snapshot (or starts empty), runs through the same registry and
//! adapter an application would, and saves the snapshot back when the
//! command mutates it.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use promstash::render::{RenderMode, render};
use promstash::{Config, MemoryStore, Registry, StorageAdapter, WriteOptions};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// promstash: shared-store Prometheus metrics CLI.
#[derive(Parser)]
#[command(name = "promstash", version, about)]
struct Cli {
    /// JSON configuration file (adapter, registry, and wipe sections).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Prefix the store client adds to every physical key.
    #[arg(long, global = true, default_value = "")]
    transport_prefix: String,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Print the snapshot in the Prometheus text exposition format.
    Render {
        /// Path to the snapshot file.
        snapshot: PathBuf,

        /// Replace mismatched samples with comment lines instead of failing.
        #[arg(long)]
        silent: bool,

        /// Wipe the snapshot after a successful render.
        #[arg(long)]
        wipe: bool,
    },

    /// Display metric families, sample counts, and key counts.
    Info {
        /// Path to the snapshot file.
        snapshot: PathBuf,

        /// Output format.
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Increment a counter.
    Inc {
        #[command(flatten)]
        target: Target,

        /// Amount to add.
        #[arg(long, default_value = "1")]
        by: f64,
    },

    /// Set a gauge.
    Set {
        #[command(flatten)]
        target: Target,

        /// New value.
        #[arg(allow_hyphen_values = true)]
        value: f64,
    },

    /// Record a histogram observation.
    Observe {
        #[command(flatten)]
        target: Target,

        /// Observed value.
        #[arg(allow_hyphen_values = true)]
        value: f64,

        /// Bucket boundaries, comma separated (defaults to latency buckets).
        #[arg(long, value_delimiter = ',')]
        buckets: Option<Vec<f64>>,
    },

    /// Remove corrupted samples from the snapshot.
    Clean {
        /// Path to the snapshot file.
        snapshot: PathBuf,
    },

    /// Delete every metric record from the snapshot.
    Wipe {
        /// Path to the snapshot file.
        snapshot: PathBuf,
    },
}

/// Metric addressed by a write command.
#[derive(clap::Args)]
struct Target {
    /// Path to the snapshot file (created if absent).
    snapshot: PathBuf,

    /// Metric name, without the namespace.
    name: String,

    /// Label as `name=value`; repeat for several labels.
    #[arg(long = "label", value_parser = parse_label)]
    labels: Vec<(String, String)>,

    /// Help text stored with the metric.
    #[arg(long, default_value = "")]
    help_text: String,

    /// Sample timestamp in milliseconds.
    #[arg(long)]
    timestamp: Option<i64>,
}

impl Target {
    fn label_names(&self) -> Vec<&str> {
        self.labels.iter().map(|(name, _)| name.as_str()).collect()
    }

    fn label_values(&self) -> Vec<&str> {
        self.labels.iter().map(|(_, value)| value.as_str()).collect()
    }

    fn options(&self) -> WriteOptions {
        WriteOptions {
            timestamp: self.timestamp,
        }
    }
}

/// Output format for `info`.
#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable listing.
    Text,
    /// JSON object.
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = load_config(cli.config.as_deref()).and_then(|config| {
        let prefix = cli.transport_prefix.as_str();
        match &cli.command {
            Commands::Render {
                snapshot,
                silent,
                wipe,
            } => cmd_render(&config, prefix, snapshot, *silent, *wipe),
            Commands::Info { snapshot, format } => cmd_info(&config, prefix, snapshot, format),
            Commands::Inc { target, by } => cmd_inc(&config, prefix, target, *by),
            Commands::Set { target, value } => cmd_set(&config, prefix, target, *value),
            Commands::Observe {
                target,
                value,
                buckets,
            } => cmd_observe(&config, prefix, target, *value, buckets.clone()),
            Commands::Clean { snapshot } => cmd_clean(&config, prefix, snapshot),
            Commands::Wipe { snapshot } => cmd_wipe(&config, prefix, snapshot),
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(Config::from_json_file(path)?),
        None => Ok(Config::default()),
    }
}

/// Parses a `name=value` label argument.
fn parse_label(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))
}

fn open_registry(
    config: &Config,
    transport_prefix: &str,
    snapshot: &Path,
) -> Result<Registry<MemoryStore>, Box<dyn std::error::Error>> {
    let store = MemoryStore::load_or_new(snapshot, transport_prefix)?;
    debug!(snapshot = %snapshot.display(), keys = store.len(), "loaded snapshot");
    Ok(Registry::new(store, config)?)
}

fn save(registry: &Registry<MemoryStore>, snapshot: &Path) -> CliResult {
    registry.adapter().store().save(snapshot)?;
    debug!(snapshot = %snapshot.display(), "saved snapshot");
    Ok(())
}

/// Implements `promstash render <snapshot>`.
fn cmd_render(
    config: &Config,
    transport_prefix: &str,
    snapshot: &Path,
    silent: bool,
    wipe: bool,
) -> CliResult {
    let mut config = config.clone();
    if silent {
        config.registry.render_mode = RenderMode::Silent;
    }

    let registry = open_registry(&config, transport_prefix, snapshot)?;
    let text = registry.scrape(wipe)?;
    print!("{text}");

    // Collection may have cleaned corrupted samples, so persist either way.
    save(&registry, snapshot)
}

/// Implements `promstash info <snapshot>`.
fn cmd_info(
    config: &Config,
    transport_prefix: &str,
    snapshot: &Path,
    format: &OutputFormat,
) -> CliResult {
    let store = MemoryStore::load(snapshot, transport_prefix)?;
    let keys = store.len();

    // Inspection never deletes anything.
    let mut adapter_config = config.adapter.clone();
    adapter_config.auto_clean_corrupted = false;
    let families = StorageAdapter::new(store, adapter_config)?.collect(true)?;

    match format {
        OutputFormat::Text => {
            println!("Snapshot: {}", snapshot.display());
            println!("Keys: {keys}");
            println!("Families: {}", families.len());
            for family in &families {
                let labels = if family.has_label_names() {
                    format!(" {{{}}}", family.label_names().join(", "))
                } else {
                    String::new()
                };
                println!(
                    "  - {}{labels} ({}, {} samples)",
                    family.name(),
                    family.kind(),
                    family.samples().len()
                );
            }
        }
        OutputFormat::Json => {
            let summary: Vec<serde_json::Value> = families
                .iter()
                .map(|family| {
                    serde_json::json!({
                        "name": family.name(),
                        "type": family.kind(),
                        "labels": family.label_names(),
                        "samples": family.samples().len(),
                    })
                })
                .collect();

            let output = serde_json::json!({
                "snapshot": snapshot.display().to_string(),
                "keys": keys,
                "families": summary,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Implements `promstash inc <snapshot> <name>`.
fn cmd_inc(config: &Config, transport_prefix: &str, target: &Target, by: f64) -> CliResult {
    let mut registry = open_registry(config, transport_prefix, &target.snapshot)?;
    let handle = registry.counter(&target.name, &target.help_text, &target.label_names())?;

    match whole_number(by) {
        Some(delta) => registry.inc_by(handle, &target.label_values(), delta, target.options())?,
        None => registry.inc_by_float(handle, &target.label_values(), by, target.options())?,
    }

    save(&registry, &target.snapshot)
}

/// Implements `promstash set <snapshot> <name> <value>`.
fn cmd_set(config: &Config, transport_prefix: &str, target: &Target, value: f64) -> CliResult {
    let mut registry = open_registry(config, transport_prefix, &target.snapshot)?;
    let handle = registry.gauge(&target.name, &target.help_text, &target.label_names())?;
    registry.set(handle, &target.label_values(), value, target.options())?;
    save(&registry, &target.snapshot)
}

/// Implements `promstash observe <snapshot> <name> <value>`.
fn cmd_observe(
    config: &Config,
    transport_prefix: &str,
    target: &Target,
    value: f64,
    buckets: Option<Vec<f64>>,
) -> CliResult {
    let mut registry = open_registry(config, transport_prefix, &target.snapshot)?;
    let handle =
        registry.histogram(&target.name, &target.help_text, &target.label_names(), buckets)?;
    registry.observe(handle, &target.label_values(), value, target.options())?;
    save(&registry, &target.snapshot)
}

/// Implements `promstash clean <snapshot>`.
fn cmd_clean(config: &Config, transport_prefix: &str, snapshot: &Path) -> CliResult {
    let store = MemoryStore::load(snapshot, transport_prefix)?;
    let before = store.len();

    let mut adapter_config = config.adapter.clone();
    adapter_config.auto_clean_corrupted = true;
    let adapter = StorageAdapter::new(store, adapter_config)?;
    let families = adapter.collect(true)?;

    // Surface anything the renderer would still reject.
    render(&families, RenderMode::Strict)?;

    adapter.store().save(snapshot)?;
    println!(
        "Removed {} corrupted keys ({before} -> {})",
        before - adapter.store().len(),
        adapter.store().len()
    );
    Ok(())
}

/// Implements `promstash wipe <snapshot>`.
fn cmd_wipe(config: &Config, transport_prefix: &str, snapshot: &Path) -> CliResult {
    let registry = open_registry(config, transport_prefix, snapshot)?;
    let removed = registry.wipe()?;
    save(&registry, snapshot)?;
    println!("Wiped {removed} keys");
    Ok(())
}

/// Returns `value` as an integer if it is a whole number that fits exactly.
#[allow(clippy::cast_possible_truncation)] // range checked before the cast
fn whole_number(value: f64) -> Option<i64> {
    const EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    if value.fract() == 0.0 && value.abs() <= EXACT {
        Some(value as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promstash::{HashStore, MetricType};
    use tempfile::tempdir;

    #[test]
    fn test_parse_label() {
        assert_eq!(
            parse_label("method=GET").unwrap(),
            ("method".to_string(), "GET".to_string())
        );
        assert_eq!(
            parse_label("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert!(parse_label("novalue").is_err());
    }

    #[test]
    fn test_whole_number() {
        assert_eq!(whole_number(5.0), Some(5));
        assert_eq!(whole_number(-2.0), Some(-2));
        assert_eq!(whole_number(0.5), None);
        assert_eq!(whole_number(f64::INFINITY), None);
        assert_eq!(whole_number(f64::NAN), None);
    }

    #[test]
    fn test_inc_then_render_from_snapshot() {
        let dir = tempdir().unwrap();
        let snapshot = dir.path().join("metrics.json");
        let config = Config::default();

        let target = Target {
            snapshot: snapshot.clone(),
            name: "requests_total".to_string(),
            labels: vec![("method".to_string(), "GET".to_string())],
            help_text: "Requests".to_string(),
            timestamp: None,
        };
        cmd_inc(&config, "", &target, 1.0).unwrap();
        cmd_inc(&config, "", &target, 5.0).unwrap();

        let registry = open_registry(&config, "", &snapshot).unwrap();
        assert!(
            registry
                .render()
                .unwrap()
                .contains("app_requests_total{method=\"GET\"} 6\n")
        );

        cmd_wipe(&config, "", &snapshot).unwrap();
        let registry = open_registry(&config, "", &snapshot).unwrap();
        assert_eq!(registry.render().unwrap(), "");
    }

    #[test]
    fn test_clean_removes_corrupted_sample() {
        let dir = tempdir().unwrap();
        let snapshot = dir.path().join("metrics.json");
        let config = Config::default();

        let target = Target {
            snapshot: snapshot.clone(),
            name: "temp".to_string(),
            labels: vec![("room".to_string(), "hall".to_string())],
            help_text: String::new(),
            timestamp: None,
        };
        cmd_set(&config, "", &target, 19.5).unwrap();

        // Plant a sample with a malformed value next to the healthy one.
        let store = MemoryStore::load(&snapshot, "").unwrap();
        let adapter = StorageAdapter::new(store.clone(), config.adapter.clone()).unwrap();
        let key = adapter.keys().sample_key(
            MetricType::Gauge,
            "app_temp",
            &["kitchen".to_string()],
        );
        store
            .set_fields(
                &key,
                &[("value", "warm".to_string()), ("labelValues", "[\"kitchen\"]".to_string())],
            )
            .unwrap();
        store.save(&snapshot).unwrap();
        assert_eq!(store.len(), 3);

        cmd_clean(&config, "", &snapshot).unwrap();
        assert_eq!(MemoryStore::load(&snapshot, "").unwrap().len(), 2);
    }
}
