//! Key/value persistence contract.
//!
//! Mirrors the browser storage the client was designed around: string keys
//! mapping to serialized string values, one value replaced at a time.

use crate::error::Result;
use async_trait::async_trait;

/// A durable string-keyed store.
///
/// `set` must be all-or-nothing: after a failed write the previous value of
/// the key is still readable.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a value, `Ok(None)` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the value stored under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes the key; removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<()>;
}
