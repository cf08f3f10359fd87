//! Histogram bucket selection and cumulative reconstruction.
//!
//! On the write path an observation increments exactly one non-cumulative
//! bucket field (the first boundary it does not exceed, or the implicit
//! `+Inf` bucket) plus the running `sum`. On the read path those
//! independent counts are folded back into the cumulative `_bucket`,
//! `_sum`, and `_count` samples of the exposition format.

use crate::codec::{BUCKET_INF_FIELD, HistogramRecord, bucket_field, format_number};
use crate::error::CodecError;
use crate::sample::Sample;

/// Extra label carried by every `_bucket` sample.
pub const BUCKET_LABEL: &str = "le";

/// Default boundaries, tuned for request latencies in seconds.
pub fn default_buckets() -> Vec<f64> {
    vec![
        0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
    ]
}

/// Checks that boundaries are non-empty, finite, and strictly ascending.
///
/// # Errors
///
/// Returns a description of the first problem found.
pub fn validate_buckets(buckets: &[f64]) -> Result<(), String> {
    if buckets.is_empty() {
        return Err("at least one bucket boundary is required".to_string());
    }

    if let Some(bad) = buckets.iter().find(|b| !b.is_finite()) {
        return Err(format!("boundary {bad} is not finite (+Inf is implicit)"));
    }

    for pair in buckets.windows(2) {
        if pair[0] >= pair[1] {
            return Err(format!(
                "boundaries must be strictly ascending: {} >= {}",
                pair[0], pair[1]
            ));
        }
    }

    Ok(())
}

/// Returns the field to increment for an observation of `value`.
pub fn select_bucket(buckets: &[f64], value: f64) -> String {
    buckets
        .iter()
        .find(|&&boundary| value <= boundary)
        .map_or_else(|| BUCKET_INF_FIELD.to_string(), |&boundary| bucket_field(boundary))
}

/// Expands one stored histogram record into exposition samples.
///
/// Emits, in order: one `<name>_bucket` sample per boundary with the
/// running cumulative count, the `le="+Inf"` bucket with the total, then
/// `<name>_sum` and `<name>_count`. Cumulative counts never decrease.
///
/// # Errors
///
/// Returns [`CodecError::CountOverflow`] if the stored counts sum past
/// `u64::MAX`, which only a corrupted record can produce.
pub fn reconstruct(
    name: &str,
    buckets: &[f64],
    record: &HistogramRecord,
) -> Result<Vec<Sample>, CodecError> {
    let bucket_name = format!("{name}_bucket");
    let mut samples = Vec::with_capacity(buckets.len() + 3);
    let mut cumulative: u64 = 0;

    let bucket_sample = |le: String, count: u64| {
        let mut label_values = record.label_values.clone();
        label_values.push(le);
        Sample::new(
            bucket_name.clone(),
            vec![BUCKET_LABEL.to_string()],
            label_values,
            count_value(count),
            record.timestamp,
        )
    };

    let accumulate = |cumulative: u64, index: usize, field: String| {
        let count = record.bucket_counts.get(index).copied().unwrap_or(0);
        cumulative
            .checked_add(count)
            .ok_or(CodecError::CountOverflow { field })
    };

    for (index, &boundary) in buckets.iter().enumerate() {
        cumulative = accumulate(cumulative, index, bucket_field(boundary))?;
        samples.push(bucket_sample(format_number(boundary), cumulative));
    }

    cumulative = accumulate(cumulative, buckets.len(), BUCKET_INF_FIELD.to_string())?;
    samples.push(bucket_sample(format_number(f64::INFINITY), cumulative));

    samples.push(Sample::new(
        format!("{name}_sum"),
        Vec::new(),
        record.label_values.clone(),
        record.sum,
        record.timestamp,
    ));
    samples.push(Sample::new(
        format!("{name}_count"),
        Vec::new(),
        record.label_values.clone(),
        count_value(cumulative),
        record.timestamp,
    ));

    Ok(samples)
}

#[allow(clippy::cast_precision_loss)] // counts beyond 2^53 observations are not a practical concern
fn count_value(count: u64) -> f64 {
    count as f64
}
