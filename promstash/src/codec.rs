//! Encoding of meta and sample records as flat field maps.
//!
//! The store only knows string fields. This module owns the field names and
//! their formats, and turns raw field maps back into typed records. Decoding
//! distinguishes three outcomes:
//!
//! - a complete record,
//! - [`Decoded::Partial`]: the record is empty or a concurrent writer has
//!   not yet written every field (nothing to report yet),
//! - a [`CodecError`]: a field is present but malformed (corruption).

use crate::backend::Fields;
use crate::error::CodecError;

/// Meta field holding the metric name.
pub const NAME_FIELD: &str = "name";
/// Meta field holding the help text.
pub const HELP_FIELD: &str = "help";
/// Meta field holding the JSON list of label names.
pub const LABEL_NAMES_FIELD: &str = "labelNames";
/// Meta field holding the JSON list of histogram bucket boundaries.
pub const BUCKETS_FIELD: &str = "buckets";
/// Sample field holding the counter or gauge value.
pub const VALUE_FIELD: &str = "value";
/// Sample field holding the JSON list of label values.
pub const LABEL_VALUES_FIELD: &str = "labelValues";
/// Sample field holding the optional timestamp in milliseconds.
pub const TIMESTAMP_FIELD: &str = "timestamp";
/// Histogram field holding the running sum of observations.
pub const SUM_FIELD: &str = "sum";
/// Histogram field counting observations above the last boundary.
pub const BUCKET_INF_FIELD: &str = "bucket_inf";

/// Serializes a label list (names or values) as a JSON array.
pub fn encode_label_values(values: &[String]) -> String {
    // A slice of strings always serializes.
    serde_json::to_string(values).unwrap_or_else(|_| String::from("[]"))
}

/// Parses a JSON array of strings produced by [`encode_label_values`].
///
/// # Errors
///
/// Returns [`CodecError::MalformedList`] if `raw` is not a JSON string array.
pub fn decode_label_values(raw: &str) -> Result<Vec<String>, CodecError> {
    decode_list(LABEL_VALUES_FIELD, raw)
}

fn decode_list(field: &'static str, raw: &str) -> Result<Vec<String>, CodecError> {
    serde_json::from_str(raw).map_err(|source| CodecError::MalformedList { field, source })
}

/// Renders a numeric boundary or value in canonical decimal form.
///
/// `10.0` becomes `10`, `0.005` stays `0.005`. Used for bucket field names,
/// `le` label values, and stored gauge values, so every writer and reader
/// agrees on the same spelling.
pub fn format_number(value: f64) -> String {
    if value.is_infinite() {
        return if value > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    value.to_string()
}

/// Field name of the bucket with upper bound `boundary`.
pub fn bucket_field(boundary: f64) -> String {
    format!("bucket_{}", format_number(boundary))
}

/// Outcome of decoding a record that may be mid-write.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    /// Every required field is present and well-formed.
    Complete(T),
    /// The record is empty or not fully written yet.
    Partial,
}

/// Meta record stored once per metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaRecord {
    /// Fully-qualified metric name.
    pub name: String,
    /// Help text.
    pub help: String,
    /// Declared label names, in order.
    pub label_names: Vec<String>,
    /// Histogram bucket boundaries (histograms only).
    pub buckets: Option<Vec<f64>>,
}

impl MetaRecord {
    /// Encodes the record as field/value pairs for a multi-field set.
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            (NAME_FIELD, self.name.clone()),
            (HELP_FIELD, self.help.clone()),
            (LABEL_NAMES_FIELD, encode_label_values(&self.label_names)),
        ];
        if let Some(buckets) = &self.buckets {
            // Finite f64 values always serialize.
            let encoded = serde_json::to_string(buckets).unwrap_or_else(|_| String::from("[]"));
            fields.push((BUCKETS_FIELD, encoded));
        }
        fields
    }

    /// Decodes a meta record.
    ///
    /// `with_buckets` requires the `buckets` field (histogram metas).
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if a required field is missing or malformed.
    pub fn from_fields(fields: &Fields, with_buckets: bool) -> Result<Decoded<Self>, CodecError> {
        if fields.is_empty() {
            return Ok(Decoded::Partial);
        }

        let name = required(fields, NAME_FIELD)?.to_string();
        let help = fields.get(HELP_FIELD).cloned().unwrap_or_default();
        let label_names = match fields.get(LABEL_NAMES_FIELD) {
            Some(raw) => decode_list(LABEL_NAMES_FIELD, raw)?,
            None => Vec::new(),
        };

        let buckets = if with_buckets {
            let raw = required(fields, BUCKETS_FIELD)?;
            let buckets: Vec<f64> = serde_json::from_str(raw)
                .map_err(|source| CodecError::MalformedBuckets { source })?;
            Some(buckets)
        } else {
            None
        };

        Ok(Decoded::Complete(Self {
            name,
            help,
            label_names,
            buckets,
        }))
    }
}

/// Accumulated value of one counter or gauge label combination.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarRecord {
    /// The accumulated value.
    pub value: f64,
    /// Label values, in declaration order.
    pub label_values: Vec<String>,
    /// Timestamp of the last timestamped write, in milliseconds.
    pub timestamp: Option<i64>,
}

impl ScalarRecord {
    /// Decodes a counter or gauge sample record.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if a present field is malformed.
    pub fn from_fields(fields: &Fields) -> Result<Decoded<Self>, CodecError> {
        let Some(raw_labels) = fields.get(LABEL_VALUES_FIELD) else {
            return Ok(Decoded::Partial);
        };
        let Some(raw_value) = fields.get(VALUE_FIELD) else {
            return Ok(Decoded::Partial);
        };

        Ok(Decoded::Complete(Self {
            value: parse_f64(VALUE_FIELD, raw_value)?,
            label_values: decode_label_values(raw_labels)?,
            timestamp: parse_timestamp(fields)?,
        }))
    }
}

/// Accumulated state of one histogram label combination.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramRecord {
    /// Non-cumulative count per bucket; the last entry is the `+Inf` bucket.
    pub bucket_counts: Vec<u64>,
    /// Running sum of observed values.
    pub sum: f64,
    /// Label values, in declaration order.
    pub label_values: Vec<String>,
    /// Timestamp of the last timestamped write, in milliseconds.
    pub timestamp: Option<i64>,
}

impl HistogramRecord {
    /// Decodes a histogram sample record against the meta's boundaries.
    ///
    /// Bucket fields that were never incremented count as zero.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if a present field is malformed.
    pub fn from_fields(fields: &Fields, buckets: &[f64]) -> Result<Decoded<Self>, CodecError> {
        let Some(raw_labels) = fields.get(LABEL_VALUES_FIELD) else {
            return Ok(Decoded::Partial);
        };
        let label_values = decode_label_values(raw_labels)?;

        let mut bucket_counts = Vec::with_capacity(buckets.len() + 1);
        for &boundary in buckets {
            let field = bucket_field(boundary);
            bucket_counts.push(parse_count(fields, &field)?);
        }
        bucket_counts.push(parse_count(fields, BUCKET_INF_FIELD)?);

        let sum = match fields.get(SUM_FIELD) {
            Some(raw) => parse_f64(SUM_FIELD, raw)?,
            None => 0.0,
        };

        Ok(Decoded::Complete(Self {
            bucket_counts,
            sum,
            label_values,
            timestamp: parse_timestamp(fields)?,
        }))
    }
}

fn required<'a>(fields: &'a Fields, field: &'static str) -> Result<&'a str, CodecError> {
    fields
        .get(field)
        .map(String::as_str)
        .ok_or(CodecError::MissingField { field })
}

fn parse_f64(field: &str, raw: &str) -> Result<f64, CodecError> {
    raw.trim().parse::<f64>().map_err(|_| CodecError::NotNumeric {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

fn parse_count(fields: &Fields, field: &str) -> Result<u64, CodecError> {
    match fields.get(field) {
        Some(raw) => raw.trim().parse::<u64>().map_err(|_| CodecError::NotNumeric {
            field: field.to_string(),
            value: raw.clone(),
        }),
        None => Ok(0),
    }
}

fn parse_timestamp(fields: &Fields) -> Result<Option<i64>, CodecError> {
    fields
        .get(TIMESTAMP_FIELD)
        .map(|raw| {
            raw.trim().parse::<i64>().map_err(|_| CodecError::NotNumeric {
                field: TIMESTAMP_FIELD.to_string(),
                value: raw.clone(),
            })
        })
        .transpose()
}
