//! Storage adapter: writes metric updates to a shared hash store and
//! reconstructs metric families from it.
//!
//! The adapter is the only component that knows the storage layout. Writers
//! in different processes call [`StorageAdapter::update`] concurrently
//! without coordinating: every value change is a single atomic field
//! increment or field set in the store, never a local read-modify-write.
//!
//! # Write order
//!
//! An update touches two records, in this order:
//!
//! 1. the meta record (multi-field set, idempotent),
//! 2. the value fields of the sample record (histograms: the selected bucket
//!    count, then `sum`),
//! 3. the sample's `labelValues`, then `timestamp` when one is given.
//!
//! A concurrent [`collect`](StorageAdapter::collect) can observe any prefix
//! of that sequence. A sample without `labelValues` (or, for counters and
//! gauges, without `value`) reads as "nothing to report yet".
//!
//! # Corruption
//!
//! A sample whose label value count differs from its meta's label names,
//! or whose fields do not decode, is corrupt. It is excluded from the
//! result and, when [`AdapterConfig::auto_clean_corrupted`] is set, deleted
//! within the same call. Either way a structured warning is emitted with an
//! `action` field of `deleted` or `skipped`. Store errors are never
//! swallowed.

use tracing::{debug, warn};

use crate::backend::HashStore;
use crate::codec::{
    Decoded, HistogramRecord, LABEL_VALUES_FIELD, MetaRecord, SUM_FIELD, ScalarRecord,
    TIMESTAMP_FIELD, VALUE_FIELD, encode_label_values, format_number,
};
use crate::config::AdapterConfig;
use crate::error::{CodecError, Result, UpdateError};
use crate::histogram::{reconstruct, select_bucket, validate_buckets};
use crate::keys::{KeySpace, MetricType};
use crate::sample::{MetricFamily, Sample};

/// Metric kind of an update. Histograms carry their bucket boundaries.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricKind {
    /// Monotonic counter.
    Counter,
    /// Gauge.
    Gauge,
    /// Histogram with the given finite, ascending boundaries.
    Histogram {
        /// Upper bounds of the finite buckets.
        buckets: Vec<f64>,
    },
    /// Summary. Every update fails with [`UpdateError::NotImplemented`].
    Summary,
}

impl MetricKind {
    /// The storage type tag for this kind.
    pub fn metric_type(&self) -> MetricType {
        match self {
            MetricKind::Counter => MetricType::Counter,
            MetricKind::Gauge => MetricType::Gauge,
            MetricKind::Histogram { .. } => MetricType::Histogram,
            MetricKind::Summary => MetricType::Summary,
        }
    }
}

/// A value change applied to one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mutation {
    /// Overwrite the value (gauges).
    Set(f64),
    /// Atomically add an integer.
    IncrementBy(i64),
    /// Atomically add a float.
    IncrementByFloat(f64),
    /// Record one observation (histograms).
    Observe(f64),
}

impl Mutation {
    fn as_str(self) -> &'static str {
        match self {
            Mutation::Set(_) => "set",
            Mutation::IncrementBy(_) => "increment_by",
            Mutation::IncrementByFloat(_) => "increment_by_float",
            Mutation::Observe(_) => "observe",
        }
    }
}

/// One write against one sample of one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricUpdate {
    /// Metric kind (and histogram buckets).
    pub kind: MetricKind,
    /// Fully-qualified metric name.
    pub name: String,
    /// Help text stored in the meta record.
    pub help: String,
    /// Declared label names, in order.
    pub label_names: Vec<String>,
    /// Label values, same length and order as `label_names`.
    pub label_values: Vec<String>,
    /// The value change.
    pub mutation: Mutation,
    /// Optional sample timestamp in milliseconds.
    pub timestamp: Option<i64>,
}

/// Why a stored sample was rejected during collection.
enum Corruption {
    LabelCount(Vec<String>),
    Codec(CodecError),
}

/// Reads and writes metric records in a [`HashStore`].
///
/// # Example
///
/// ```rust
/// use promstash::adapter::{MetricKind, MetricUpdate, Mutation, StorageAdapter};
/// use promstash::config::AdapterConfig;
/// use promstash::memory::MemoryStore;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let adapter = StorageAdapter::new(MemoryStore::new(), AdapterConfig::default())?;
///
/// adapter.update(&MetricUpdate {
///     kind: MetricKind::Counter,
///     name: "requests_total".to_string(),
///     help: "Total requests".to_string(),
///     label_names: vec![],
///     label_values: vec![],
///     mutation: Mutation::IncrementBy(1),
///     timestamp: None,
/// })?;
///
/// let families = adapter.collect(true)?;
/// assert_eq!(families[0].samples()[0].value(), 1.0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct StorageAdapter<S> {
    store: S,
    keys: KeySpace,
    config: AdapterConfig,
}

impl<S: HashStore> StorageAdapter<S> {
    /// Creates an adapter over `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(store: S, config: AdapterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            keys: KeySpace::new(config.key_prefix.clone()),
            config,
        })
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The adapter configuration.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// The key layout in use.
    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    /// Applies one update to the store.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError`] if the kind, mutation, labels, or buckets
    /// are unusable (nothing is written in that case), or a store error if
    /// a primitive fails partway.
    pub fn update(&self, update: &MetricUpdate) -> Result<()> {
        let kind = update.kind.metric_type();
        Self::check(update)?;

        let meta = MetaRecord {
            name: update.name.clone(),
            help: update.help.clone(),
            label_names: update.label_names.clone(),
            buckets: match &update.kind {
                MetricKind::Histogram { buckets } => Some(buckets.clone()),
                _ => None,
            },
        };
        self.store
            .set_fields(&self.keys.meta_key(kind, &update.name), &meta.to_fields())?;

        let sample_key = self.keys.sample_key(kind, &update.name, &update.label_values);
        match (&update.kind, update.mutation) {
            (_, Mutation::Set(value)) => {
                self.store.set_field(&sample_key, VALUE_FIELD, &format_number(value))?;
            }
            (_, Mutation::IncrementBy(delta)) => {
                self.store.increment_by(&sample_key, VALUE_FIELD, delta)?;
            }
            (_, Mutation::IncrementByFloat(delta)) => {
                self.store.increment_by_float(&sample_key, VALUE_FIELD, delta)?;
            }
            (MetricKind::Histogram { buckets }, Mutation::Observe(value)) => {
                let field = select_bucket(buckets, value);
                self.store.increment_by(&sample_key, &field, 1)?;
                self.store.increment_by_float(&sample_key, SUM_FIELD, value)?;
            }
            // Rejected by `check`.
            (_, Mutation::Observe(_)) => {}
        }

        self.store.set_field(
            &sample_key,
            LABEL_VALUES_FIELD,
            &encode_label_values(&update.label_values),
        )?;

        if let Some(timestamp) = update.timestamp {
            self.store
                .set_field(&sample_key, TIMESTAMP_FIELD, &timestamp.to_string())?;
        }

        Ok(())
    }

    fn check(update: &MetricUpdate) -> std::result::Result<(), UpdateError> {
        let kind = update.kind.metric_type();

        let allowed = match (&update.kind, update.mutation) {
            (MetricKind::Summary, _) => return Err(UpdateError::NotImplemented { kind }),
            (MetricKind::Counter, Mutation::IncrementBy(_) | Mutation::IncrementByFloat(_))
            | (
                MetricKind::Gauge,
                Mutation::Set(_) | Mutation::IncrementBy(_) | Mutation::IncrementByFloat(_),
            )
            | (MetricKind::Histogram { .. }, Mutation::Observe(_)) => true,
            _ => false,
        };
        if !allowed {
            return Err(UpdateError::UnsupportedMutation {
                kind,
                name: update.name.clone(),
                mutation: update.mutation.as_str(),
            });
        }

        if update.label_values.len() != update.label_names.len() {
            return Err(UpdateError::LabelCount {
                name: update.name.clone(),
                expected: update.label_names.len(),
                actual: update.label_values.len(),
            });
        }

        if let MetricKind::Histogram { buckets } = &update.kind {
            validate_buckets(buckets).map_err(|reason| UpdateError::InvalidBuckets {
                name: update.name.clone(),
                reason,
            })?;
        }

        Ok(())
    }

    /// Reconstructs every metric family from the store.
    ///
    /// Families are gathered per type in the order gauge, counter,
    /// histogram, summary; within a type they are ordered by meta key. With
    /// `sort_by_name` the result is sorted by family name instead. Families
    /// left with no valid samples are omitted.
    ///
    /// # Errors
    ///
    /// Returns a store error if any primitive fails. Corrupted records are
    /// handled per record and never fail the call.
    pub fn collect(&self, sort_by_name: bool) -> Result<Vec<MetricFamily>> {
        let mut families = Vec::new();

        for kind in MetricType::ALL {
            for meta_key in self.scan_logical(&self.keys.meta_pattern(kind))? {
                if let Some(family) = self.collect_family(kind, &meta_key)? {
                    families.push(family);
                }
            }
        }

        if sort_by_name {
            families.sort_by(|a, b| a.name().cmp(b.name()));
        }

        Ok(families)
    }

    fn collect_family(&self, kind: MetricType, meta_key: &str) -> Result<Option<MetricFamily>> {
        let Some(key_name) = self.keys.name_from_meta_key(kind, meta_key) else {
            return Ok(None);
        };

        let fields = self.store.read_fields(meta_key)?;
        let meta = match MetaRecord::from_fields(&fields, kind == MetricType::Histogram) {
            Ok(Decoded::Complete(meta)) => meta,
            Ok(Decoded::Partial) => {
                debug!(meta_key, "meta record not written yet");
                return Ok(None);
            }
            Err(error) => {
                warn!(meta_key, error = %error, action = "skipped", "corrupted meta record");
                return Ok(None);
            }
        };

        let buckets = meta.buckets.clone().unwrap_or_default();
        if kind == MetricType::Histogram
            && let Err(reason) = validate_buckets(&buckets)
        {
            warn!(meta_key, error = %reason, action = "skipped", "corrupted histogram buckets");
            return Ok(None);
        }

        if kind == MetricType::Summary {
            debug!(meta_key, "summary metrics are not collected");
            return Ok(None);
        }

        let mut records: Vec<(Vec<String>, Vec<Sample>)> = Vec::new();
        for sample_key in self.scan_logical(&self.keys.sample_pattern(kind, key_name))? {
            if !self.keys.is_sample_key(kind, key_name, &sample_key) {
                continue;
            }

            let fields = self.store.read_fields(&sample_key)?;
            let decoded = if kind == MetricType::Histogram {
                HistogramRecord::from_fields(&fields, &buckets).and_then(|d| match d {
                    Decoded::Complete(record) => Ok(Decoded::Complete((
                        record.label_values.clone(),
                        reconstruct(&meta.name, &buckets, &record)?,
                    ))),
                    Decoded::Partial => Ok(Decoded::Partial),
                })
            } else {
                ScalarRecord::from_fields(&fields).map(|d| match d {
                    Decoded::Complete(record) => Decoded::Complete((
                        record.label_values.clone(),
                        vec![Sample::new(
                            meta.name.clone(),
                            Vec::new(),
                            record.label_values,
                            record.value,
                            record.timestamp,
                        )],
                    )),
                    Decoded::Partial => Decoded::Partial,
                })
            };

            match decoded {
                Ok(Decoded::Complete((label_values, samples))) => {
                    if label_values.len() == meta.label_names.len() {
                        records.push((label_values, samples));
                    } else {
                        self.discard(&meta, &sample_key, Corruption::LabelCount(label_values))?;
                    }
                }
                Ok(Decoded::Partial) => {
                    debug!(metric = %meta.name, sample_key, "sample record not written yet");
                }
                Err(error) => {
                    self.discard(&meta, &sample_key, Corruption::Codec(error))?;
                }
            }
        }

        if records.is_empty() {
            return Ok(None);
        }

        records.sort_by(|a, b| a.0.cmp(&b.0));
        let samples = records.into_iter().flat_map(|(_, samples)| samples).collect();

        Ok(Some(MetricFamily::new(
            meta.name,
            kind,
            meta.help,
            meta.label_names,
            samples,
        )))
    }

    fn discard(&self, meta: &MetaRecord, sample_key: &str, problem: Corruption) -> Result<()> {
        let action = if self.config.auto_clean_corrupted {
            self.store.delete(&[sample_key.to_string()])?;
            "deleted"
        } else {
            "skipped"
        };

        let expected_labels = encode_label_values(&meta.label_names);
        match problem {
            Corruption::LabelCount(values) => warn!(
                metric = %meta.name,
                sample_key,
                expected_labels = %expected_labels,
                actual_values = %encode_label_values(&values),
                action,
                "corrupted metric sample: label count mismatch"
            ),
            Corruption::Codec(error) => warn!(
                metric = %meta.name,
                sample_key,
                expected_labels = %expected_labels,
                error = %error,
                action,
                "corrupted metric sample: malformed field"
            ),
        }

        Ok(())
    }

    /// Deletes every key under the adapter's prefix in one bulk delete.
    ///
    /// Returns the number of keys removed; wiping an empty store is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a store error if the scan or delete fails.
    pub fn wipe(&self) -> Result<u64> {
        let keys = self.scan_logical(&self.keys.wipe_pattern())?;
        if keys.is_empty() {
            debug!(prefix = self.keys.prefix(), "nothing to wipe");
            return Ok(0);
        }

        let removed = self.store.delete(&keys)?;
        debug!(prefix = self.keys.prefix(), removed, "wiped metric store");
        Ok(removed)
    }

    /// Scans `pattern` and maps the physical keys to logical ones, sorted.
    fn scan_logical(&self, pattern: &str) -> Result<Vec<String>> {
        let transport_prefix = self.store.transport_prefix();
        let mut keys: Vec<String> = self
            .store
            .scan(pattern)?
            .iter()
            .map(|key| {
                self.keys
                    .strip_transport_prefix(transport_prefix, key)
                    .to_string()
            })
            .collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}
