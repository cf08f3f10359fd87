//! Metric family and sample value objects.
//!
//! These are the reconstructed view of stored data that the renderer
//! consumes. A [`MetricFamily`] carries the identity and help text; each
//! [`Sample`] carries one exposition line's worth of data.

use crate::codec::format_number;
use crate::keys::MetricType;

/// One exposition line: a name, label values, a value, and an optional timestamp.
///
/// `label_names` holds only the names this sample adds beyond its family's
/// (for example `le` on histogram buckets). `label_values` covers the family
/// labels first, then the sample's own.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    name: String,
    label_names: Vec<String>,
    label_values: Vec<String>,
    value: f64,
    timestamp: Option<i64>,
}

impl Sample {
    /// Creates a sample.
    pub fn new(
        name: impl Into<String>,
        label_names: Vec<String>,
        label_values: Vec<String>,
        value: f64,
        timestamp: Option<i64>,
    ) -> Self {
        Self {
            name: name.into(),
            label_names,
            label_values,
            value,
            timestamp,
        }
    }

    /// The rendered sample name (may carry a `_bucket`/`_sum`/`_count` suffix).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Label names added by this sample beyond the family's.
    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// All label values, family labels first.
    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    /// The numeric value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Timestamp in milliseconds, if one was written.
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    /// Returns true if the sample adds label names of its own.
    pub fn has_label_names(&self) -> bool {
        !self.label_names.is_empty()
    }

    /// Returns true if the sample carries a timestamp.
    pub fn has_timestamp(&self) -> bool {
        self.timestamp.is_some()
    }

    /// The value as it appears in exposition text (`+Inf`, `-Inf`, `NaN`, `6`, `1.5`).
    pub fn value_string(&self) -> String {
        format_number(self.value)
    }
}

/// A named metric with its type, help text, label names, and samples.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    name: String,
    kind: MetricType,
    help: String,
    label_names: Vec<String>,
    samples: Vec<Sample>,
}

impl MetricFamily {
    /// Creates a metric family.
    pub fn new(
        name: impl Into<String>,
        kind: MetricType,
        help: impl Into<String>,
        label_names: Vec<String>,
        samples: Vec<Sample>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            help: help.into(),
            label_names,
            samples,
        }
    }

    /// Fully-qualified metric name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The metric type.
    pub fn kind(&self) -> MetricType {
        self.kind
    }

    /// Help text, unescaped.
    pub fn help(&self) -> &str {
        &self.help
    }

    /// Declared label names, in order.
    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// The samples, in collection order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Returns true if the family declares label names.
    pub fn has_label_names(&self) -> bool {
        !self.label_names.is_empty()
    }
}
