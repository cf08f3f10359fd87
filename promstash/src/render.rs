//! Prometheus text exposition format.
//!
//! Renders reconstructed metric families into the plaintext format scraped
//! by a Prometheus server:
//!
//! ```text
//! # HELP app_requests_total Total requests
//! # TYPE app_requests_total counter
//! app_requests_total{method="GET"} 6
//! ```
//!
//! A sample whose label values do not line up with its label names cannot
//! be rendered. In [`RenderMode::Strict`] that fails the whole render; in
//! [`RenderMode::Silent`] the sample is replaced by comment lines describing
//! the problem, which scrapers ignore.

use serde::{Deserialize, Serialize};

use crate::codec::encode_label_values;
use crate::error::RenderError;
use crate::sample::{MetricFamily, Sample};

/// Content type of the exposition text.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// How label mismatches are handled while rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Fail with [`RenderError::LabelMismatch`].
    #[default]
    Strict,
    /// Emit `# Error:` comment lines and keep going.
    Silent,
}

/// Renders metric families as exposition text.
///
/// Families are emitted in ascending name order regardless of input order,
/// so the same families always produce the same bytes. An empty slice
/// renders as an empty string; otherwise the output ends with a newline.
///
/// # Errors
///
/// In strict mode, returns [`RenderError::LabelMismatch`] for the first
/// sample whose label value count differs from its label names.
pub fn render(families: &[MetricFamily], mode: RenderMode) -> Result<String, RenderError> {
    let mut sorted: Vec<&MetricFamily> = families.iter().collect();
    sorted.sort_by(|a, b| a.name().cmp(b.name()));

    let mut out = String::new();
    for family in sorted {
        out.push_str(&format!(
            "# HELP {} {}\n",
            family.name(),
            escape_help(family.help())
        ));
        out.push_str(&format!("# TYPE {} {}\n", family.name(), family.kind()));

        for sample in family.samples() {
            match render_sample(family, sample) {
                Ok(line) => {
                    out.push_str(&line);
                    out.push('\n');
                }
                Err(error) if mode == RenderMode::Silent => {
                    let names = expected_names(family, sample);
                    // Label values may hold newlines; every line stays a comment.
                    let message = error.to_string();
                    let mut lines = message.lines();
                    out.push_str(&format!("# Error: {}\n", lines.next().unwrap_or_default()));
                    for line in lines {
                        out.push_str(&format!("# {line}\n"));
                    }
                    out.push_str(&format!("#   Labels: {}\n", encode_label_values(&names)));
                    out.push_str(&format!(
                        "#   Values: {}\n",
                        encode_label_values(sample.label_values())
                    ));
                }
                Err(error) => return Err(error),
            }
        }
    }

    Ok(out)
}

fn expected_names(family: &MetricFamily, sample: &Sample) -> Vec<String> {
    family
        .label_names()
        .iter()
        .chain(sample.label_names())
        .cloned()
        .collect()
}

fn render_sample(family: &MetricFamily, sample: &Sample) -> Result<String, RenderError> {
    let names = expected_names(family, sample);
    let values = sample.label_values();

    if names.len() != values.len() {
        return Err(RenderError::LabelMismatch {
            metric: family.name().to_string(),
            expected: names.len(),
            expected_names: names,
            actual: values.len(),
            actual_values: values.to_vec(),
        });
    }

    let mut line = String::from(sample.name());
    if !names.is_empty() {
        let labels: Vec<String> = names
            .iter()
            .zip(values)
            .map(|(name, value)| format!("{name}=\"{}\"", escape_label_value(value)))
            .collect();
        line.push('{');
        line.push_str(&labels.join(","));
        line.push('}');
    }

    line.push(' ');
    line.push_str(&sample.value_string());

    if let Some(timestamp) = sample.timestamp() {
        line.push(' ');
        line.push_str(&timestamp.to_string());
    }

    Ok(line)
}

/// Escapes a label value: backslash, newline, and double quote.
pub fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('"', "\\\"")
}

/// Escapes help text: backslash and newline.
pub fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}
