//! Storage key layout for metric records.
//!
//! Every metric instance lives under two kinds of keys in the shared store:
//!
//! ```text
//! <PREFIX><type>:<name>:meta      <- meta record (name, help, label names, buckets)
//! <PREFIX><type>:<name>:<hash>    <- one sample record per label-value combination
//! ```
//!
//! `<hash>` is a fixed-width digest of the label values, so two processes
//! writing the same label values for the same metric always land on the same
//! key without coordinating.
//!
//! # Transport prefixes
//!
//! Some store clients transparently prepend their own namespace to every
//! physical key. Commands sent through such a client take logical keys, but
//! key listings come back physical. [`KeySpace::strip_transport_prefix`]
//! maps a listed key back to its logical form and is idempotent, so it is
//! safe to apply to a key that was already stripped.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::codec::encode_label_values;

/// Default logical prefix reserved for metric records.
pub const DEFAULT_PREFIX: &str = "PROMETHEUS_";

/// Suffix of every meta key.
const META_SUFFIX: &str = ":meta";

/// Number of digest bytes kept in a sample key (32 hex characters).
const HASH_BYTES: usize = 16;

/// The kind of a metric, as encoded in storage keys and `# TYPE` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// Monotonically increasing value.
    Counter,
    /// Value that can go up and down.
    Gauge,
    /// Bucketed observations with sum and count.
    Histogram,
    /// Streaming quantiles. Not implemented.
    Summary,
}

impl MetricType {
    /// All metric types in collection order.
    pub const ALL: [MetricType; 4] = [
        MetricType::Gauge,
        MetricType::Counter,
        MetricType::Histogram,
        MetricType::Summary,
    ];

    /// Returns the lowercase type name used in keys and exposition text.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Histogram => "histogram",
            MetricType::Summary => "summary",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computes the label hash used in sample keys.
///
/// The digest covers the JSON encoding of the label values in declaration
/// order and is rendered as 32 lowercase hex characters. It depends only on
/// the values, never on process state, so it is stable across writers.
pub fn label_hash(label_values: &[String]) -> String {
    let encoded = encode_label_values(label_values);
    let digest = Sha256::digest(encoded.as_bytes());
    hex::encode(&digest[..HASH_BYTES])
}

/// Logical key layout for one storage namespace.
///
/// # Example
///
/// ```rust
/// use promstash::keys::{KeySpace, MetricType};
///
/// let keys = KeySpace::default();
/// assert_eq!(
///     keys.meta_key(MetricType::Counter, "app_requests_total"),
///     "PROMETHEUS_counter:app_requests_total:meta"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    /// Creates a key space under the given logical prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns the logical prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Key of the meta record for `(kind, name)`.
    pub fn meta_key(&self, kind: MetricType, name: &str) -> String {
        format!("{}{}:{}{}", self.prefix, kind.as_str(), name, META_SUFFIX)
    }

    /// Key of the sample record for `(kind, name, label_values)`.
    pub fn sample_key(&self, kind: MetricType, name: &str, label_values: &[String]) -> String {
        format!(
            "{}:{}",
            self.base_key(kind, name),
            label_hash(label_values)
        )
    }

    /// Glob matching every meta key of one metric type.
    pub fn meta_pattern(&self, kind: MetricType) -> String {
        format!("{}{}:*{}", self.prefix, kind.as_str(), META_SUFFIX)
    }

    /// Glob matching every key (meta included) of one metric.
    pub fn sample_pattern(&self, kind: MetricType, name: &str) -> String {
        format!("{}:*", self.base_key(kind, name))
    }

    /// Glob matching every key in this namespace.
    pub fn wipe_pattern(&self) -> String {
        format!("{}*", self.prefix)
    }

    /// Returns the metric name encoded in a meta key of the given type.
    pub fn name_from_meta_key<'a>(&self, kind: MetricType, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.prefix.as_str())?
            .strip_prefix(kind.as_str())?
            .strip_prefix(':')?
            .strip_suffix(META_SUFFIX)
    }

    /// Returns true if `key` is a sample key of exactly this metric.
    ///
    /// A metric named `a` must not pick up the records of a metric named
    /// `a:b`, so the remainder after the base key has to be a bare hash.
    pub fn is_sample_key(&self, kind: MetricType, name: &str, key: &str) -> bool {
        let base = self.base_key(kind, name);
        key.strip_prefix(base.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
            .is_some_and(|hash| {
                hash.len() == HASH_BYTES * 2 && hash.bytes().all(|b| b.is_ascii_hexdigit())
            })
    }

    /// Returns true if `key` has the shape `<PREFIX><type>:...`.
    pub fn is_logical_key(&self, key: &str) -> bool {
        key.strip_prefix(self.prefix.as_str()).is_some_and(|rest| {
            MetricType::ALL.iter().any(|kind| {
                rest.strip_prefix(kind.as_str())
                    .is_some_and(|after| after.starts_with(':'))
            })
        })
    }

    /// Maps a physical key returned by a key listing to its logical key.
    ///
    /// The transport prefix is removed whenever what follows it lies under
    /// this key space's prefix, metric-shaped or not, so every key a wipe
    /// lists can be deleted. Metric keys that are already logical are
    /// returned unchanged, and stripping a stripped key is a no-op, which
    /// makes the mapping idempotent. An empty `transport_prefix` is a no-op.
    pub fn strip_transport_prefix<'a>(&self, transport_prefix: &str, key: &'a str) -> &'a str {
        if transport_prefix.is_empty() || self.is_logical_key(key) {
            return key;
        }

        match key.strip_prefix(transport_prefix) {
            Some(rest) if rest.starts_with(self.prefix.as_str()) => rest,
            _ => key,
        }
    }

    fn base_key(&self, kind: MetricType, name: &str) -> String {
        format!("{}{}:{}", self.prefix, kind.as_str(), name)
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}
