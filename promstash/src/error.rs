//! Error types for the promstash metrics engine.

use thiserror::Error;

use crate::keys::MetricType;

/// The main error type for all promstash operations.
///
/// This enum covers every failure that can escape the crate: backend
/// failures, rejected writes, strict-mode render failures, registry policy
/// violations, and configuration problems. Corrupted stored records never
/// surface here from `collect()`; they are handled per record.
#[derive(Error, Debug)]
pub enum PromstashError {
    /// Error talking to the external key-value store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Error decoding a stored record.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Error during an update (write path).
    #[error("update error: {0}")]
    Update(#[from] UpdateError),

    /// Error during text rendering (strict mode only).
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// Error raised by the registry (definitions and label policy).
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Error validating or loading configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors returned by a [`HashStore`](crate::backend::HashStore) backend.
///
/// These are fatal for the calling operation and are propagated untouched.
/// Retrying is the store client's concern, not the adapter's.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend could not be reached or rejected the command.
    #[error("store unavailable during {operation}: {reason}")]
    Unavailable {
        /// The primitive that failed (e.g. `scan`, `increment_by`).
        operation: &'static str,
        /// Backend-provided description.
        reason: String,
    },

    /// An integer increment targeted a field that does not hold an integer.
    #[error("field '{field}' of '{key}' is not an integer: {value:?}")]
    NotAnInteger {
        /// The record key.
        key: String,
        /// The field name.
        field: String,
        /// The current field contents.
        value: String,
    },

    /// A float increment targeted a field that does not hold a number.
    #[error("field '{field}' of '{key}' is not a float: {value:?}")]
    NotAFloat {
        /// The record key.
        key: String,
        /// The field name.
        field: String,
        /// The current field contents.
        value: String,
    },

    /// Failed to read a store snapshot file.
    #[error("failed to read snapshot '{}': {source}", path.display())]
    SnapshotIo {
        /// The snapshot path.
        path: std::path::PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a store snapshot file.
    #[error("failed to parse snapshot '{}': {source}", path.display())]
    SnapshotParse {
        /// The snapshot path.
        path: std::path::PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A scan pattern is not a valid glob.
    #[error("invalid scan pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Why the pattern was rejected.
        reason: String,
    },

    /// Failed to serialize or write a store snapshot.
    #[error("failed to write snapshot '{}': {reason}", path.display())]
    SnapshotWrite {
        /// The snapshot path.
        path: std::path::PathBuf,
        /// Description of the failure.
        reason: String,
    },
}

/// Errors decoding a stored meta or sample record.
///
/// The adapter treats every one of these as corruption of a single record:
/// the record is skipped (and optionally deleted), never fatal.
#[derive(Error, Debug)]
pub enum CodecError {
    /// A required field is absent.
    #[error("missing field '{field}'")]
    MissingField {
        /// The field name.
        field: &'static str,
    },

    /// A serialized label list is not a JSON array of strings.
    #[error("field '{field}' is not a JSON string list: {source}")]
    MalformedList {
        /// The field name.
        field: &'static str,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A serialized bucket list is not a JSON array of numbers.
    #[error("field 'buckets' is not a JSON number list: {source}")]
    MalformedBuckets {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A numeric field does not parse.
    #[error("field '{field}' is not numeric: {value:?}")]
    NotNumeric {
        /// The field name.
        field: String,
        /// The raw field contents.
        value: String,
    },

    /// Histogram bucket counts add up past `u64::MAX`.
    #[error("histogram bucket counts overflow at field '{field}'")]
    CountOverflow {
        /// The bucket field whose count overflowed the running total.
        field: String,
    },
}

/// Errors rejecting a write before anything reaches the store.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// The metric kind has no storage implementation.
    #[error("{kind} metrics are not implemented")]
    NotImplemented {
        /// The unsupported metric type.
        kind: MetricType,
    },

    /// The mutation does not apply to the metric kind.
    #[error("{mutation} is not a valid mutation for {kind} '{name}'")]
    UnsupportedMutation {
        /// The metric type.
        kind: MetricType,
        /// The metric name.
        name: String,
        /// The rejected mutation.
        mutation: &'static str,
    },

    /// Label value count differs from the declared label names.
    #[error("metric '{name}' declares {expected} labels but {actual} values were supplied")]
    LabelCount {
        /// The metric name.
        name: String,
        /// Number of declared label names.
        expected: usize,
        /// Number of label values supplied.
        actual: usize,
    },

    /// Histogram bucket boundaries are unusable.
    #[error("invalid histogram buckets for '{name}': {reason}")]
    InvalidBuckets {
        /// The metric name.
        name: String,
        /// Why the buckets were rejected.
        reason: String,
    },
}

/// Errors raised while rendering the exposition text in strict mode.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A sample's label values do not line up with the label names.
    #[error(
        "Label mismatch for metric \"{metric}\": expected {expected} labels ({}) \
         but got {actual} values ({}). \
         This usually means the metric was created with different labels \
         than when it was last stored. \
         Try wiping the metric store (e.g. ?wipe=1) to clear the stale data.",
        expected_names.join(", "),
        actual_values.join(", ")
    )]
    LabelMismatch {
        /// The metric family name.
        metric: String,
        /// Expected label count (family + sample label names).
        expected: usize,
        /// The expected label names.
        expected_names: Vec<String>,
        /// Actual number of label values.
        actual: usize,
        /// The actual label values.
        actual_values: Vec<String>,
    },
}

/// Errors raised by the metric registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Label value count differs from the metric definition.
    #[error(
        "Label count mismatch for metric \"{metric}\": expected {expected} labels ({}) \
         but got {actual} values ({})",
        expected_names.join(", "),
        actual_values.join(", ")
    )]
    LabelMismatch {
        /// The metric name.
        metric: String,
        /// Number of declared label names.
        expected: usize,
        /// The declared label names.
        expected_names: Vec<String>,
        /// Number of label values supplied.
        actual: usize,
        /// The supplied label values.
        actual_values: Vec<String>,
    },

    /// A metric is already registered with a different definition.
    #[error("metric '{name}' is already registered as {existing} with labels {labels:?}")]
    Conflict {
        /// The metric name.
        name: String,
        /// Kind of the existing registration.
        existing: MetricType,
        /// Label names of the existing registration.
        labels: Vec<String>,
    },

    /// The metric name is not a valid Prometheus metric name.
    #[error("invalid metric name '{name}'")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// A label name is not a valid Prometheus label name.
    #[error("invalid label name '{label}' for metric '{metric}'")]
    InvalidLabelName {
        /// The metric name.
        metric: String,
        /// The rejected label name.
        label: String,
    },

    /// A label name is reserved for the metric kind.
    #[error("label '{label}' is reserved for {kind} metrics ('{metric}')")]
    ReservedLabel {
        /// The metric name.
        metric: String,
        /// The metric type.
        kind: MetricType,
        /// The reserved label name.
        label: String,
    },

    /// Counters can only go up.
    #[error("counter '{metric}' cannot be incremented by a negative value ({value})")]
    NegativeIncrement {
        /// The metric name.
        metric: String,
        /// The rejected increment.
        value: f64,
    },

    /// The handle refers to a metric of a different kind.
    #[error("operation '{operation}' is not valid for {kind} '{metric}'")]
    WrongKind {
        /// The metric name.
        metric: String,
        /// The metric type.
        kind: MetricType,
        /// The attempted operation.
        operation: &'static str,
    },

    /// The handle was not issued by this registry.
    #[error("unknown metric handle {index}")]
    UnknownHandle {
        /// The handle index.
        index: usize,
    },
}

/// Errors validating or loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The key prefix is empty or contains glob metacharacters.
    #[error("invalid key prefix {prefix:?}: {reason}")]
    InvalidPrefix {
        /// The rejected prefix.
        prefix: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The registry namespace is not a valid metric name fragment.
    #[error("invalid namespace {namespace:?}")]
    InvalidNamespace {
        /// The rejected namespace.
        namespace: String,
    },

    /// Failed to read a configuration file.
    #[error("failed to read config '{}': {source}", path.display())]
    Load {
        /// The config path.
        path: std::path::PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a configuration file.
    #[error("failed to parse config '{}': {source}", path.display())]
    Parse {
        /// The config path.
        path: std::path::PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Type alias for `Result<T, PromstashError>`.
pub type Result<T> = std::result::Result<T, PromstashError>;
