use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::StoreResult;

/// Field/value pairs stored under one key (a hash in key-value store terms)
pub type Fields = BTreeMap<String, String>;

/// Port for the session system of record
///
/// A flat key-value store of string hashes. The simulation only needs
/// whole-hash writes, reads, deletes and a prefix scan for restore.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Replace all fields stored under `key`
    async fn put(&self, key: &str, fields: Fields) -> StoreResult<()>;

    /// Read all fields under `key`, `None` if absent
    async fn get(&self, key: &str) -> StoreResult<Option<Fields>>;

    /// Delete `key`, returning whether it existed
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// All keys starting with `prefix`, in no particular order
    async fn keys(&self, prefix: &str) -> StoreResult<Vec<String>>;
}
