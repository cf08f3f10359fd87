//! In-memory hash store.
//!
//! This module provides [`MemoryStore`], an in-process implementation of
//! [`HashStore`] used by tests, benchmarks, and the CLI.
//!
//! # Features
//!
//! - **Thread-safe**: one [`parking_lot::RwLock`] guards the whole keyspace,
//!   so every increment is atomic for its field
//! - **Shared**: clones share the same data via [`Arc`]
//! - **Transport prefix**: [`MemoryStore::with_transport_prefix`] prepends a
//!   namespace to every physical key, the way some networked store clients do
//! - **Snapshots**: [`MemoryStore::save`] / [`MemoryStore::load`] persist the
//!   keyspace as JSON
//!
//! Field semantics follow networked hash stores: integer increments reject
//! fields holding fractional values, and float increments store the result
//! in canonical decimal form.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use glob::Pattern;
use parking_lot::RwLock;

use crate::backend::{Fields, HashStore};
use crate::codec::format_number;
use crate::error::StoreError;

/// In-memory hash-of-hashes store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<BTreeMap<String, Fields>>>,
    transport_prefix: String,
}

impl MemoryStore {
    /// Creates an empty store with no transport prefix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that prefixes every physical key.
    pub fn with_transport_prefix(prefix: impl Into<String>) -> Self {
        Self {
            data: Arc::default(),
            transport_prefix: prefix.into(),
        }
    }

    /// Loads a snapshot written by [`save`](Self::save).
    ///
    /// Keys in the snapshot are physical; `transport_prefix` should match
    /// the prefix the snapshot was written with.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P, transport_prefix: &str) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| StoreError::SnapshotIo {
            path: path.to_path_buf(),
            source,
        })?;
        let data: BTreeMap<String, Fields> =
            serde_json::from_str(&raw).map_err(|source| StoreError::SnapshotParse {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            data: Arc::new(RwLock::new(data)),
            transport_prefix: transport_prefix.to_string(),
        })
    }

    /// Loads a snapshot, or returns an empty store if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_new<P: AsRef<Path>>(
        path: P,
        transport_prefix: &str,
    ) -> Result<Self, StoreError> {
        if path.as_ref().exists() {
            Self::load(path, transport_prefix)
        } else {
            Ok(Self::with_transport_prefix(transport_prefix))
        }
    }

    /// Writes the whole keyspace to `path` as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the file write fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), StoreError> {
        let path = path.as_ref();
        let json = {
            let data = self.data.read();
            serde_json::to_string_pretty(&*data).map_err(|e| StoreError::SnapshotWrite {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        };
        std::fs::write(path, json).map_err(|e| StoreError::SnapshotWrite {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Number of physical keys currently stored.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Returns every physical key, in order.
    pub fn physical_keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    fn physical(&self, key: &str) -> String {
        format!("{}{}", self.transport_prefix, key)
    }
}

impl HashStore for MemoryStore {
    fn scan(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let physical = format!("{}{pattern}", Pattern::escape(&self.transport_prefix));
        let matcher = Pattern::new(&physical).map_err(|e| StoreError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.msg.to_string(),
        })?;

        let data = self.data.read();
        Ok(data
            .keys()
            .filter(|key| matcher.matches(key))
            .cloned()
            .collect())
    }

    fn read_fields(&self, key: &str) -> Result<Fields, StoreError> {
        Ok(self
            .data
            .read()
            .get(&self.physical(key))
            .cloned()
            .unwrap_or_default())
    }

    fn increment_by(&self, key: &str, field: &str, delta: i64) -> Result<i64, StoreError> {
        let physical = self.physical(key);
        let mut data = self.data.write();
        let record = data.entry(physical).or_default();

        let current = match record.get(field) {
            Some(raw) => raw.parse::<i64>().map_err(|_| StoreError::NotAnInteger {
                key: key.to_string(),
                field: field.to_string(),
                value: raw.clone(),
            })?,
            None => 0,
        };

        let next = current.wrapping_add(delta);
        record.insert(field.to_string(), next.to_string());
        Ok(next)
    }

    fn increment_by_float(&self, key: &str, field: &str, delta: f64) -> Result<f64, StoreError> {
        let physical = self.physical(key);
        let mut data = self.data.write();
        let record = data.entry(physical).or_default();

        let current = match record.get(field) {
            Some(raw) => raw.parse::<f64>().map_err(|_| StoreError::NotAFloat {
                key: key.to_string(),
                field: field.to_string(),
                value: raw.clone(),
            })?,
            None => 0.0,
        };

        let next = current + delta;
        record.insert(field.to_string(), format_number(next));
        Ok(next)
    }

    fn set_fields(&self, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError> {
        let physical = self.physical(key);
        let mut data = self.data.write();
        let record = data.entry(physical).or_default();
        for (field, value) in fields {
            record.insert((*field).to_string(), value.clone());
        }
        Ok(())
    }

    fn delete(&self, keys: &[String]) -> Result<u64, StoreError> {
        let mut data = self.data.write();
        let mut removed = 0;
        for key in keys {
            if data.remove(&self.physical(key)).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn transport_prefix(&self) -> &str {
        &self.transport_prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_increment_by_creates_and_accumulates() {
        let store = MemoryStore::new();
        assert_eq!(store.increment_by("k", "value", 1).unwrap(), 1);
        assert_eq!(store.increment_by("k", "value", 5).unwrap(), 6);
        assert_eq!(store.read_fields("k").unwrap()["value"], "6");
    }

    #[test]
    fn test_increment_by_rejects_fractional_field() {
        let store = MemoryStore::new();
        store.increment_by_float("k", "value", 0.5).unwrap();
        assert!(matches!(
            store.increment_by("k", "value", 1),
            Err(StoreError::NotAnInteger { .. })
        ));
    }

    #[test]
    fn test_increment_by_float_on_integer_field() {
        let store = MemoryStore::new();
        store.increment_by("k", "value", 2).unwrap();
        assert_eq!(store.increment_by_float("k", "value", 0.5).unwrap(), 2.5);
        assert_eq!(store.read_fields("k").unwrap()["value"], "2.5");

        // Whole results are stored without a fraction, so integer increments keep working.
        store.increment_by_float("k", "value", 0.5).unwrap();
        assert_eq!(store.increment_by("k", "value", 1).unwrap(), 4);
    }

    #[test]
    fn test_read_missing_key_is_empty() {
        let store = MemoryStore::new();
        assert!(store.read_fields("missing").unwrap().is_empty());
    }

    #[test]
    fn test_transport_prefix_is_physical() {
        let store = MemoryStore::with_transport_prefix("tp_");
        store.set_field("PROMETHEUS_gauge:x:meta", "name", "x").unwrap();

        assert_eq!(store.physical_keys(), vec!["tp_PROMETHEUS_gauge:x:meta".to_string()]);
        assert_eq!(
            store.scan("PROMETHEUS_*").unwrap(),
            vec!["tp_PROMETHEUS_gauge:x:meta".to_string()]
        );
        assert_eq!(store.read_fields("PROMETHEUS_gauge:x:meta").unwrap()["name"], "x");

        let removed = store
            .delete(&["PROMETHEUS_gauge:x:meta".to_string()])
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_scan_patterns() {
        let store = MemoryStore::new();
        let keys = [
            "P_counter:a:meta",
            "P_counter:a:b:meta",
            "P_counter:a:0123",
            "P_gauge:x:meta",
        ];
        for key in keys {
            store.set_field(key, "name", "x").unwrap();
        }

        assert_eq!(store.scan("P_*").unwrap().len(), 4);
        assert_eq!(
            store.scan("P_counter:*:meta").unwrap(),
            vec!["P_counter:a:b:meta".to_string(), "P_counter:a:meta".to_string()]
        );
        assert_eq!(store.scan("P_gaug?:x:meta").unwrap().len(), 1);
        assert!(store.scan("Q_*").unwrap().is_empty());
    }

    #[test]
    fn test_scan_escapes_transport_prefix() {
        let store = MemoryStore::with_transport_prefix("[tp]*");
        store.set_field("PROMETHEUS_gauge:x:meta", "name", "x").unwrap();

        assert_eq!(
            store.scan("PROMETHEUS_*").unwrap(),
            vec!["[tp]*PROMETHEUS_gauge:x:meta".to_string()]
        );
    }

    #[test]
    fn test_scan_rejects_invalid_pattern() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.scan("P_[*"),
            Err(StoreError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_clones_share_data() {
        let store = MemoryStore::new();
        let clone = store.clone();
        clone.increment_by("k", "f", 3).unwrap();
        assert_eq!(store.read_fields("k").unwrap()["f"], "3");
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        let store = MemoryStore::new();
        store.increment_by("a", "value", 7).unwrap();
        store.set_field("b", "labelValues", "[\"x\"]").unwrap();
        store.save(&path).unwrap();

        let loaded = MemoryStore::load(&path, "").unwrap();
        assert_eq!(loaded.physical_keys(), store.physical_keys());
        assert_eq!(loaded.read_fields("a").unwrap()["value"], "7");

        let fresh = MemoryStore::load_or_new(dir.path().join("absent.json"), "").unwrap();
        assert!(fresh.is_empty());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            MemoryStore::load(&path, ""),
            Err(StoreError::SnapshotParse { .. })
        ));
    }
}
