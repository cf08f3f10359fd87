//! Metric registration and the application-facing write API.
//!
//! The registry maps metric definitions to lightweight handles and turns
//! handle writes into storage updates.
//!
//! # Registration Flow
//!
//! 1. Client calls [`Registry::counter`] (or `gauge`, `histogram`, `summary`)
//! 2. The name is qualified with the configured namespace and validated
//! 3. If the same definition already exists, its handle is returned
//! 4. Otherwise the definition is stored and a new [`MetricHandle`] issued
//! 5. Writes go through the handle with label values and [`WriteOptions`]
//!
//! Label values are checked against the definition before anything reaches
//! the store, according to [`LabelMismatchBehavior`].
//!
//! # Example
//!
//! ```rust
//! use promstash::memory::MemoryStore;
//! use promstash::registry::{Registry, WriteOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = Registry::with_defaults(MemoryStore::new())?;
//!
//! let requests = registry.counter("requests_total", "Total requests", &["method"])?;
//! registry.inc(requests, &["GET"], WriteOptions::default())?;
//! registry.inc_by(requests, &["GET"], 5, WriteOptions::default())?;
//!
//! let text = registry.render()?;
//! assert!(text.contains("app_requests_total{method=\"GET\"} 6\n"));
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

use tracing::warn;

use crate::adapter::{MetricKind, MetricUpdate, Mutation, StorageAdapter};
use crate::backend::HashStore;
use crate::config::{Config, LabelMismatchBehavior, RegistryConfig, WipeConfig};
use crate::error::{PromstashError, RegistryError, Result, UpdateError};
use crate::histogram::{BUCKET_LABEL, default_buckets, validate_buckets};
use crate::keys::MetricType;
use crate::render::{self, CONTENT_TYPE};
use crate::sample::MetricFamily;

/// Opaque handle to a registered metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetricHandle {
    index: usize,
}

/// Per-write options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Timestamp to attach to the sample, in milliseconds.
    pub timestamp: Option<i64>,
}

impl WriteOptions {
    /// Options carrying a timestamp.
    pub fn at(timestamp_ms: i64) -> Self {
        Self {
            timestamp: Some(timestamp_ms),
        }
    }
}

#[derive(Debug, Clone)]
struct Definition {
    kind: MetricKind,
    name: String,
    help: String,
    label_names: Vec<String>,
}

struct GaugeCallback {
    handle: MetricHandle,
    label_values: Vec<String>,
    callback: Box<dyn Fn() -> f64 + Send + Sync>,
}

/// Registry of metric definitions backed by a [`StorageAdapter`].
pub struct Registry<S> {
    adapter: StorageAdapter<S>,
    config: RegistryConfig,
    definitions: Vec<Definition>,
    by_name: HashMap<String, usize>,
    callbacks: Vec<GaugeCallback>,
}

impl<S: HashStore> Registry<S> {
    /// Creates a registry over `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(store: S, config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            adapter: StorageAdapter::new(store, config.adapter.clone())?,
            config: config.registry.clone(),
            definitions: Vec::new(),
            by_name: HashMap::new(),
            callbacks: Vec::new(),
        })
    }

    /// Creates a registry with the default configuration.
    ///
    /// # Errors
    ///
    /// Never fails with the default configuration; the signature matches
    /// [`Registry::new`].
    pub fn with_defaults(store: S) -> Result<Self> {
        Self::new(store, &Config::default())
    }

    /// The storage adapter.
    pub fn adapter(&self) -> &StorageAdapter<S> {
        &self.adapter
    }

    /// The registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Qualifies `name` with the namespace.
    pub fn full_name(&self, name: &str) -> String {
        if self.config.namespace.is_empty() {
            name.to_string()
        } else {
            format!("{}_{}", self.config.namespace, name)
        }
    }

    /// Registers (or fetches) a counter.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if a name is invalid or the metric is
    /// already registered with a different definition.
    pub fn counter(
        &mut self,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> Result<MetricHandle> {
        self.register(MetricKind::Counter, name, help, label_names)
    }

    /// Registers (or fetches) a gauge.
    ///
    /// # Errors
    ///
    /// Same as [`Registry::counter`].
    pub fn gauge(&mut self, name: &str, help: &str, label_names: &[&str]) -> Result<MetricHandle> {
        self.register(MetricKind::Gauge, name, help, label_names)
    }

    /// Registers (or fetches) a histogram. `None` selects the default buckets.
    ///
    /// # Errors
    ///
    /// Same as [`Registry::counter`], plus [`RegistryError::ReservedLabel`]
    /// for an `le` label and [`UpdateError::InvalidBuckets`] for unusable
    /// boundaries.
    pub fn histogram(
        &mut self,
        name: &str,
        help: &str,
        label_names: &[&str],
        buckets: Option<Vec<f64>>,
    ) -> Result<MetricHandle> {
        let buckets = buckets.unwrap_or_else(default_buckets);
        let full_name = self.full_name(name);

        if label_names.contains(&BUCKET_LABEL) {
            return Err(RegistryError::ReservedLabel {
                metric: full_name,
                kind: MetricType::Histogram,
                label: BUCKET_LABEL.to_string(),
            }
            .into());
        }

        validate_buckets(&buckets).map_err(|reason| UpdateError::InvalidBuckets {
            name: full_name,
            reason,
        })?;

        self.register(MetricKind::Histogram { buckets }, name, help, label_names)
    }

    /// Registers (or fetches) a summary. Writes to it always fail.
    ///
    /// # Errors
    ///
    /// Same as [`Registry::counter`].
    pub fn summary(
        &mut self,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> Result<MetricHandle> {
        self.register(MetricKind::Summary, name, help, label_names)
    }

    fn register(
        &mut self,
        kind: MetricKind,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> Result<MetricHandle> {
        let full_name = self.full_name(name);
        if !is_valid_metric_name(&full_name) {
            return Err(RegistryError::InvalidName { name: full_name }.into());
        }
        if let Some(label) = label_names.iter().find(|l| !is_valid_label_name(l)) {
            return Err(RegistryError::InvalidLabelName {
                metric: full_name,
                label: (*label).to_string(),
            }
            .into());
        }

        let label_names: Vec<String> = label_names.iter().map(|l| (*l).to_string()).collect();

        if let Some(&index) = self.by_name.get(&full_name) {
            let existing = &self.definitions[index];
            if existing.kind == kind && existing.label_names == label_names {
                return Ok(MetricHandle { index });
            }
            return Err(RegistryError::Conflict {
                name: full_name,
                existing: existing.kind.metric_type(),
                labels: existing.label_names.clone(),
            }
            .into());
        }

        let index = self.definitions.len();
        self.definitions.push(Definition {
            kind,
            name: full_name.clone(),
            help: help.to_string(),
            label_names,
        });
        self.by_name.insert(full_name, index);

        Ok(MetricHandle { index })
    }

    fn definition(&self, handle: MetricHandle) -> std::result::Result<&Definition, RegistryError> {
        self.definitions
            .get(handle.index)
            .ok_or(RegistryError::UnknownHandle {
                index: handle.index,
            })
    }

    /// Increments a counter by one.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is not a counter, the label values
    /// are rejected by the mismatch policy, or the store fails.
    pub fn inc(
        &self,
        handle: MetricHandle,
        label_values: &[&str],
        options: WriteOptions,
    ) -> Result<()> {
        self.inc_by(handle, label_values, 1, options)
    }

    /// Increments a counter by a non-negative integer.
    ///
    /// # Errors
    ///
    /// Same as [`Registry::inc`], plus [`RegistryError::NegativeIncrement`].
    pub fn inc_by(
        &self,
        handle: MetricHandle,
        label_values: &[&str],
        delta: i64,
        options: WriteOptions,
    ) -> Result<()> {
        if delta < 0 {
            #[allow(clippy::cast_precision_loss)]
            let value = delta as f64;
            return Err(self.negative(handle, value));
        }
        self.write(
            handle,
            "inc_by",
            MetricType::Counter,
            label_values,
            Mutation::IncrementBy(delta),
            options,
        )
    }

    /// Increments a counter by a non-negative float.
    ///
    /// # Errors
    ///
    /// Same as [`Registry::inc_by`].
    pub fn inc_by_float(
        &self,
        handle: MetricHandle,
        label_values: &[&str],
        delta: f64,
        options: WriteOptions,
    ) -> Result<()> {
        if delta.is_nan() || delta < 0.0 {
            return Err(self.negative(handle, delta));
        }
        self.write(
            handle,
            "inc_by_float",
            MetricType::Counter,
            label_values,
            Mutation::IncrementByFloat(delta),
            options,
        )
    }

    /// Sets a gauge.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is not a gauge, the label values are
    /// rejected by the mismatch policy, or the store fails.
    pub fn set(
        &self,
        handle: MetricHandle,
        label_values: &[&str],
        value: f64,
        options: WriteOptions,
    ) -> Result<()> {
        self.write(
            handle,
            "set",
            MetricType::Gauge,
            label_values,
            Mutation::Set(value),
            options,
        )
    }

    /// Adds to a gauge.
    ///
    /// # Errors
    ///
    /// Same as [`Registry::set`].
    pub fn gauge_inc_by(
        &self,
        handle: MetricHandle,
        label_values: &[&str],
        delta: f64,
        options: WriteOptions,
    ) -> Result<()> {
        self.write(
            handle,
            "gauge_inc_by",
            MetricType::Gauge,
            label_values,
            Mutation::IncrementByFloat(delta),
            options,
        )
    }

    /// Subtracts from a gauge.
    ///
    /// # Errors
    ///
    /// Same as [`Registry::set`].
    pub fn dec_by(
        &self,
        handle: MetricHandle,
        label_values: &[&str],
        delta: f64,
        options: WriteOptions,
    ) -> Result<()> {
        self.write(
            handle,
            "dec_by",
            MetricType::Gauge,
            label_values,
            Mutation::IncrementByFloat(-delta),
            options,
        )
    }

    /// Records a histogram observation.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is not a histogram, the label values
    /// are rejected by the mismatch policy, or the store fails.
    pub fn observe(
        &self,
        handle: MetricHandle,
        label_values: &[&str],
        value: f64,
        options: WriteOptions,
    ) -> Result<()> {
        self.write(
            handle,
            "observe",
            MetricType::Histogram,
            label_values,
            Mutation::Observe(value),
            options,
        )
    }

    fn negative(&self, handle: MetricHandle, value: f64) -> PromstashError {
        match self.definition(handle) {
            Ok(definition) => RegistryError::NegativeIncrement {
                metric: definition.name.clone(),
                value,
            }
            .into(),
            Err(error) => error.into(),
        }
    }

    fn write(
        &self,
        handle: MetricHandle,
        operation: &'static str,
        expected: MetricType,
        label_values: &[&str],
        mutation: Mutation,
        options: WriteOptions,
    ) -> Result<()> {
        let definition = self.definition(handle)?;
        let kind = definition.kind.metric_type();

        if kind == MetricType::Summary {
            return Err(UpdateError::NotImplemented { kind }.into());
        }
        if kind != expected {
            return Err(RegistryError::WrongKind {
                metric: definition.name.clone(),
                kind,
                operation,
            }
            .into());
        }

        if label_values.len() != definition.label_names.len() {
            let mismatch = RegistryError::LabelMismatch {
                metric: definition.name.clone(),
                expected: definition.label_names.len(),
                expected_names: definition.label_names.clone(),
                actual: label_values.len(),
                actual_values: label_values.iter().map(|v| (*v).to_string()).collect(),
            };
            return match self.config.label_mismatch {
                LabelMismatchBehavior::Error => Err(mismatch.into()),
                LabelMismatchBehavior::Log => {
                    warn!(
                        metric = %definition.name,
                        error = %mismatch,
                        "dropping write with wrong label count"
                    );
                    Ok(())
                }
                LabelMismatchBehavior::Ignore => Ok(()),
            };
        }

        self.adapter.update(&MetricUpdate {
            kind: definition.kind.clone(),
            name: definition.name.clone(),
            help: definition.help.clone(),
            label_names: definition.label_names.clone(),
            label_values: label_values.iter().map(|v| (*v).to_string()).collect(),
            mutation,
            timestamp: options.timestamp,
        })
    }

    /// Registers a gauge whose value is computed by `callback` before every
    /// collection and stored with a set.
    ///
    /// # Errors
    ///
    /// Returns an error if the gauge cannot be registered or the label
    /// values do not match the label names.
    pub fn register_gauge_callback<F>(
        &mut self,
        name: &str,
        help: &str,
        label_names: &[&str],
        label_values: &[&str],
        callback: F,
    ) -> Result<MetricHandle>
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        if label_values.len() != label_names.len() {
            return Err(RegistryError::LabelMismatch {
                metric: self.full_name(name),
                expected: label_names.len(),
                expected_names: label_names.iter().map(|l| (*l).to_string()).collect(),
                actual: label_values.len(),
                actual_values: label_values.iter().map(|v| (*v).to_string()).collect(),
            }
            .into());
        }

        let handle = self.gauge(name, help, label_names)?;
        self.callbacks.push(GaugeCallback {
            handle,
            label_values: label_values.iter().map(|v| (*v).to_string()).collect(),
            callback: Box::new(callback),
        });

        Ok(handle)
    }

    fn run_gauge_callbacks(&self) {
        for entry in &self.callbacks {
            let value = (entry.callback)();
            let labels: Vec<&str> = entry.label_values.iter().map(String::as_str).collect();
            if let Err(error) = self.set(entry.handle, &labels, value, WriteOptions::default()) {
                warn!(error = %error, "gauge callback write failed");
            }
        }
    }

    /// Evaluates gauge callbacks, then collects every family sorted by name.
    ///
    /// # Errors
    ///
    /// Returns a store error if collection fails.
    pub fn collect(&self) -> Result<Vec<MetricFamily>> {
        self.run_gauge_callbacks();
        self.adapter.collect(true)
    }

    /// Collects and renders exposition text using the configured mode.
    ///
    /// # Errors
    ///
    /// Returns a store error, or a render error in strict mode.
    pub fn render(&self) -> Result<String> {
        let families = self.collect()?;
        Ok(render::render(&families, self.config.render_mode)?)
    }

    /// Renders, then wipes the store when `wipe_after` is set.
    ///
    /// The wipe only happens after a successful render.
    ///
    /// # Errors
    ///
    /// Same as [`Registry::render`] and [`Registry::wipe`].
    pub fn scrape(&self, wipe_after: bool) -> Result<String> {
        let text = self.render()?;
        if wipe_after {
            self.wipe()?;
        }
        Ok(text)
    }

    /// Deletes every stored metric record. Registrations are kept.
    ///
    /// # Errors
    ///
    /// Returns a store error if the wipe fails.
    pub fn wipe(&self) -> Result<u64> {
        self.adapter.wipe()
    }

    /// Content type of [`Registry::render`] output.
    pub fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }
}

/// Decides whether a scrape request should wipe the store afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WipePolicy {
    config: WipeConfig,
}

impl WipePolicy {
    /// Creates a policy from its configuration.
    pub fn new(config: WipeConfig) -> Self {
        Self { config }
    }

    /// Returns true if the request's query parameters call for a wipe.
    ///
    /// `auto_wipe` always wipes. Otherwise, with the parameter trigger
    /// enabled, a pair equal to `(param, value)` wipes.
    pub fn should_wipe<'a, I>(&self, query: I) -> bool
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        if self.config.auto_wipe {
            return true;
        }
        self.config.param_enabled
            && query
                .into_iter()
                .any(|(key, value)| key == self.config.param && value == self.config.value)
    }
}

/// Returns true if `name` matches `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == ':')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Returns true if `name` matches `[a-zA-Z_][a-zA-Z0-9_]*` and is not
/// reserved (`__` prefix).
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    !name.starts_with("__")
        && chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn registry() -> Registry<MemoryStore> {
        Registry::with_defaults(MemoryStore::new()).unwrap()
    }

    fn registry_with(label_mismatch: LabelMismatchBehavior) -> Registry<MemoryStore> {
        let mut config = Config::default();
        config.registry.label_mismatch = label_mismatch;
        Registry::new(MemoryStore::new(), &config).unwrap()
    }

    #[test]
    fn test_namespace_is_applied() {
        let mut registry = registry();
        let handle = registry.counter("hits_total", "Hits", &[]).unwrap();
        registry.inc(handle, &[], WriteOptions::default()).unwrap();

        let families = registry.collect().unwrap();
        assert_eq!(families[0].name(), "app_hits_total");

        let mut config = Config::default();
        config.registry.namespace = String::new();
        let bare = Registry::new(MemoryStore::new(), &config).unwrap();
        assert_eq!(bare.full_name("hits_total"), "hits_total");
    }

    #[test]
    fn test_reregistration() {
        let mut registry = registry();
        let a = registry.counter("jobs_total", "Jobs", &["queue"]).unwrap();
        let b = registry.counter("jobs_total", "Other help", &["queue"]).unwrap();
        assert_eq!(a, b);

        assert!(matches!(
            registry.counter("jobs_total", "Jobs", &["queue", "status"]),
            Err(PromstashError::Registry(RegistryError::Conflict { .. }))
        ));
        assert!(matches!(
            registry.gauge("jobs_total", "Jobs", &["queue"]),
            Err(PromstashError::Registry(RegistryError::Conflict {
                existing: MetricType::Counter,
                ..
            }))
        ));
    }

    #[test]
    fn test_name_validation() {
        let mut registry = registry();
        assert!(matches!(
            registry.counter("bad-name", "", &[]),
            Err(PromstashError::Registry(RegistryError::InvalidName { .. }))
        ));
        assert!(matches!(
            registry.counter("ok", "", &["1abc"]),
            Err(PromstashError::Registry(RegistryError::InvalidLabelName { .. }))
        ));
        assert!(matches!(
            registry.counter("ok", "", &["__reserved"]),
            Err(PromstashError::Registry(RegistryError::InvalidLabelName { .. }))
        ));
        assert!(matches!(
            registry.histogram("h", "", &["le"], None),
            Err(PromstashError::Registry(RegistryError::ReservedLabel { .. }))
        ));
        assert!(matches!(
            registry.histogram("h", "", &[], Some(vec![])),
            Err(PromstashError::Update(UpdateError::InvalidBuckets { .. }))
        ));

        assert!(is_valid_metric_name("app:requests_total"));
        assert!(!is_valid_metric_name(""));
        assert!(is_valid_label_name("_private"));
        assert!(!is_valid_label_name("with:colon"));
    }

    #[test]
    fn test_wrong_kind_and_negative() {
        let mut registry = registry();
        let counter = registry.counter("c_total", "", &[]).unwrap();
        let gauge = registry.gauge("g", "", &[]).unwrap();
        let opts = WriteOptions::default();

        assert!(matches!(
            registry.set(counter, &[], 1.0, opts),
            Err(PromstashError::Registry(RegistryError::WrongKind { operation: "set", .. }))
        ));
        assert!(matches!(
            registry.inc(gauge, &[], opts),
            Err(PromstashError::Registry(RegistryError::WrongKind { .. }))
        ));
        assert!(matches!(
            registry.inc_by(counter, &[], -1, opts),
            Err(PromstashError::Registry(RegistryError::NegativeIncrement { .. }))
        ));
        assert!(registry.inc_by_float(counter, &[], f64::NAN, opts).is_err());
        assert!(matches!(
            registry.inc(MetricHandle { index: 99 }, &[], opts),
            Err(PromstashError::Registry(RegistryError::UnknownHandle { index: 99 }))
        ));
    }

    #[test]
    fn test_summary_not_implemented() {
        let mut registry = registry();
        let summary = registry.summary("s", "", &[]).unwrap();
        assert!(matches!(
            registry.observe(summary, &[], 1.0, WriteOptions::default()),
            Err(PromstashError::Update(UpdateError::NotImplemented { .. }))
        ));
    }

    #[test]
    fn test_gauge_operations() {
        let mut registry = registry();
        let gauge = registry.gauge("queue_depth", "Depth", &["queue"]).unwrap();
        let opts = WriteOptions::default();

        registry.set(gauge, &["mail"], 10.0, opts).unwrap();
        registry.gauge_inc_by(gauge, &["mail"], 2.5, opts).unwrap();
        registry.dec_by(gauge, &["mail"], 4.0, opts).unwrap();

        let families = registry.collect().unwrap();
        assert_eq!(families[0].samples()[0].value(), 8.5);
    }

    #[test]
    fn test_label_mismatch_policies() {
        let mut strict = registry_with(LabelMismatchBehavior::Error);
        let handle = strict.counter("orders_total", "", &["status", "region"]).unwrap();
        let error = strict
            .inc(handle, &["paid"], WriteOptions::default())
            .unwrap_err();
        assert!(error.to_string().contains("expected 2 labels (status, region)"));

        for policy in [LabelMismatchBehavior::Log, LabelMismatchBehavior::Ignore] {
            let mut registry = registry_with(policy);
            let handle = registry.counter("orders_total", "", &["status", "region"]).unwrap();
            registry
                .inc(handle, &["paid"], WriteOptions::default())
                .unwrap();
            assert!(registry.adapter().store().is_empty());
        }
    }

    #[test]
    fn test_timestamped_write() {
        let mut registry = registry();
        let gauge = registry.gauge("temp", "", &[]).unwrap();
        registry
            .set(gauge, &[], 21.5, WriteOptions::at(1_703_203_200_000))
            .unwrap();

        let text = registry.render().unwrap();
        assert!(text.contains("app_temp 21.5 1703203200000\n"));
    }

    #[test]
    fn test_gauge_callback_runs_before_render() {
        let mut registry = registry();
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);

        registry
            .register_gauge_callback("workers", "Workers", &["pool"], &["default"], move || {
                #[allow(clippy::cast_precision_loss)]
                let n = counter.fetch_add(1, Ordering::SeqCst) as f64;
                n + 3.0
            })
            .unwrap();

        assert!(registry.render().unwrap().contains("app_workers{pool=\"default\"} 3\n"));
        assert!(registry.render().unwrap().contains("app_workers{pool=\"default\"} 4\n"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(
            registry
                .register_gauge_callback("bad", "", &["a"], &[], || 1.0)
                .is_err()
        );
    }

    #[test]
    fn test_scrape_wipes_after_render() {
        let mut registry = registry();
        let counter = registry.counter("c_total", "", &[]).unwrap();
        registry.inc(counter, &[], WriteOptions::default()).unwrap();

        let text = registry.scrape(true).unwrap();
        assert!(text.contains("app_c_total 1\n"));
        assert!(registry.adapter().store().is_empty());
        assert_eq!(registry.render().unwrap(), "");
        assert_eq!(registry.content_type(), "text/plain; version=0.0.4; charset=utf-8");
    }

    const NO_QUERY: [(&str, &str); 0] = [];

    #[test]
    fn test_wipe_policy() {
        let policy = WipePolicy::default();
        assert!(!policy.should_wipe(NO_QUERY));
        assert!(policy.should_wipe([("wipe", "1")]));
        assert!(!policy.should_wipe([("wipe", "0")]));
        assert!(!policy.should_wipe([("other", "1")]));

        let disabled = WipePolicy::new(WipeConfig {
            param_enabled: false,
            ..WipeConfig::default()
        });
        assert!(!disabled.should_wipe([("wipe", "1")]));

        let auto = WipePolicy::new(WipeConfig {
            auto_wipe: true,
            ..WipeConfig::default()
        });
        assert!(auto.should_wipe(NO_QUERY));
    }
}
