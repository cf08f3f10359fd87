//! Key-value store contract.
//!
//! This module defines the [`HashStore`] trait: the six primitives the
//! storage adapter needs from an external hash-of-hashes store. Any store
//! offering them is interchangeable, whether it is the in-process
//! [`MemoryStore`](crate::memory::MemoryStore) used in tests or a networked
//! hash store shared by many processes.
//!
//! # Atomicity
//!
//! Each increment primitive must be atomic for its field. The adapter never
//! reads a value, adds to it, and writes it back; concurrent writers rely on
//! the store alone to serialize increments to the same field.
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`scan`](HashStore::scan) | List keys matching a glob |
//! | [`read_fields`](HashStore::read_fields) | Read every field of a record |
//! | [`increment_by`](HashStore::increment_by) | Atomic integer field increment |
//! | [`increment_by_float`](HashStore::increment_by_float) | Atomic float field increment |
//! | [`set_fields`](HashStore::set_fields) | Set one or more fields |
//! | [`delete`](HashStore::delete) | Delete many keys at once |

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::StoreError;

/// All fields of one stored record.
pub type Fields = BTreeMap<String, String>;

/// Abstract hash-of-hashes store shared by every writer.
///
/// Implementations are expected to be thread-safe. Every method is a
/// blocking round-trip; deadlines and retries belong to the implementation.
pub trait HashStore: Send + Sync {
    /// Lists keys matching a glob pattern (`*`, `?`, and `[...]` classes).
    ///
    /// Returned keys are physical: if the store client prepends a
    /// [`transport_prefix`](HashStore::transport_prefix), it is included.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend is unavailable.
    fn scan(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    /// Reads every field of a record. A missing key yields an empty map.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend is unavailable.
    fn read_fields(&self, key: &str) -> Result<Fields, StoreError>;

    /// Atomically adds `delta` to an integer field, creating it at zero.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotAnInteger`] if the field holds a
    /// non-integer, or another [`StoreError`] if the backend is unavailable.
    fn increment_by(&self, key: &str, field: &str, delta: i64) -> Result<i64, StoreError>;

    /// Atomically adds `delta` to a float field, creating it at zero.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotAFloat`] if the field is not numeric, or
    /// another [`StoreError`] if the backend is unavailable.
    fn increment_by_float(&self, key: &str, field: &str, delta: f64) -> Result<f64, StoreError>;

    /// Sets several fields of a record in one command.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend is unavailable.
    fn set_fields(&self, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError>;

    /// Sets a single field of a record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend is unavailable.
    fn set_field(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.set_fields(key, &[(field, value.to_string())])
    }

    /// Deletes the given keys, returning how many existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend is unavailable.
    fn delete(&self, keys: &[String]) -> Result<u64, StoreError>;

    /// Prefix the store client adds to every physical key.
    fn transport_prefix(&self) -> &str {
        ""
    }
}

impl<S: HashStore + ?Sized> HashStore for Arc<S> {
    fn scan(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        (**self).scan(pattern)
    }

    fn read_fields(&self, key: &str) -> Result<Fields, StoreError> {
        (**self).read_fields(key)
    }

    fn increment_by(&self, key: &str, field: &str, delta: i64) -> Result<i64, StoreError> {
        (**self).increment_by(key, field, delta)
    }

    fn increment_by_float(&self, key: &str, field: &str, delta: f64) -> Result<f64, StoreError> {
        (**self).increment_by_float(key, field, delta)
    }

    fn set_fields(&self, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError> {
        (**self).set_fields(key, fields)
    }

    fn set_field(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        (**self).set_field(key, field, value)
    }

    fn delete(&self, keys: &[String]) -> Result<u64, StoreError> {
        (**self).delete(keys)
    }

    fn transport_prefix(&self) -> &str {
        (**self).transport_prefix()
    }
}
