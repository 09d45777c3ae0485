//! Origin-scoped key/value storage.
//!
//! Mirrors what a page gets from `localStorage`: string keys, string values,
//! synchronous access, shared by every page load on the origin. Concurrent
//! loads writing the same key race and the last write wins.

use anyhow::{anyhow, Result};
use std::{collections::HashMap, sync::RwLock};

pub mod json_file;
pub mod ledger;
pub mod sqlite;

pub use json_file::JsonFileStorage;
pub use ledger::FrequencyLedger;
pub use sqlite::SqliteStorage;

pub trait OriginStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
}

/// Volatile storage. Used for embedding without persistence and in tests.
#[derive(Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OriginStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self
            .items
            .read()
            .map_err(|_| anyhow!("memory storage lock poisoned"))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self
            .items
            .write()
            .map_err(|_| anyhow!("memory storage lock poisoned"))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_overwrites() {
        let storage = MemoryStorage::new();
        assert!(storage.get_item("k").unwrap().is_none());

        storage.set_item("k", "1").unwrap();
        storage.set_item("k", "2").unwrap();

        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("2"));
        assert_eq!(storage.len(), 1);
    }
}
