//! # promstash
//!
//! Shared-store Prometheus metrics accumulation and text exposition.
//!
//! promstash lets many independent processes (request workers, job runners,
//! short-lived scripts) record counters, gauges, and histograms into one
//! external hash-of-hashes key-value store, and renders the accumulated
//! state in the Prometheus plaintext exposition format on demand. Writers
//! never coordinate: every value change is a single atomic field primitive
//! in the store.
//!
//! **Status**: This crate is in early development. The API is not yet stable.
//!
//! ## Key Properties
//!
//! - Race-free accumulation from uncoordinated writers via atomic field increments
//! - Histograms stored as independent bucket counts, rebuilt cumulatively on read
//! - Torn and corrupted records are skipped (and optionally cleaned) without failing a scrape
//! - Byte-deterministic exposition output, sorted by metric name
//! - Pluggable store behind the [`HashStore`] trait
//!
//! ## Quick Start
//!
//! ```rust
//! use promstash::{MemoryStore, Registry, WriteOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = Registry::with_defaults(MemoryStore::new())?;
//!
//! // Register metrics
//! let requests = registry.counter("requests_total", "Total requests", &["method"])?;
//! let latency = registry.histogram("latency_seconds", "Latency", &[], Some(vec![0.1, 1.0]))?;
//!
//! // Record values
//! registry.inc(requests, &["GET"], WriteOptions::default())?;
//! registry.observe(latency, &[], 0.25, WriteOptions::default())?;
//!
//! // Render for a scraper
//! let text = registry.render()?;
//! assert!(text.contains("app_latency_seconds_bucket{le=\"1\"} 1\n"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`Registry`]: Metric definitions, handles, label policy, render and wipe
//! - [`StorageAdapter`]: Storage layout: update, collect, wipe
//! - [`HashStore`]: The six store primitives the adapter relies on
//! - [`MemoryStore`]: Thread-safe in-process store with JSON snapshots
//! - [`render`](render::render): Text exposition serializer
//!
//! ## Modules
//!
//! - [`adapter`]: Write path, read path, corruption handling
//! - [`backend`]: Store contract
//! - [`codec`]: Field names and record decoding
//! - [`config`]: Configuration and validation
//! - [`histogram`]: Bucket selection and cumulative reconstruction
//! - [`keys`]: Storage key layout and label hashing
//! - [`memory`]: In-memory store
//! - [`registry`]: Application-facing API and wipe policy
//! - [`render`]: Exposition text
//! - [`sample`]: Metric family and sample value objects
//! - [`error`]: Error types

pub mod adapter;
pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod histogram;
pub mod keys;
pub mod memory;
pub mod registry;
pub mod render;
pub mod sample;

// Re-export primary API types at crate root for convenience.
pub use adapter::{MetricKind, MetricUpdate, Mutation, StorageAdapter};
pub use backend::{Fields, HashStore};
pub use config::{AdapterConfig, Config, LabelMismatchBehavior, RegistryConfig, WipeConfig};
pub use error::{PromstashError, Result};
pub use keys::{KeySpace, MetricType};
pub use memory::MemoryStore;
pub use registry::{MetricHandle, Registry, WipePolicy, WriteOptions};
pub use render::{CONTENT_TYPE, RenderMode};
pub use sample::{MetricFamily, Sample};
