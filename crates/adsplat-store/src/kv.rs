//! The key-value storage contract and its in-memory backend.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Result, StoreError};

/// Persistent string-to-string storage.
///
/// Implementations must be safe to share between tasks; every method is a
/// short synchronous operation.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    /// Remove every entry.
    fn clear_all(&self) -> Result<()>;
}

/// Process-local store. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn clear_all(&self) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("authorization").unwrap(), None);

        store.set("authorization", "tok").unwrap();
        assert_eq!(store.get("authorization").unwrap().as_deref(), Some("tok"));

        store.set("authorization", "tok2").unwrap();
        assert_eq!(store.get("authorization").unwrap().as_deref(), Some("tok2"));

        store.remove("authorization").unwrap();
        assert_eq!(store.get("authorization").unwrap(), None);
        // Removing a missing key is fine.
        store.remove("authorization").unwrap();
    }

    #[test]
    fn clear_all_empties_store() {
        let store = MemoryStore::new();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        assert_eq!(store.len(), 2);

        store.clear_all().unwrap();
        assert!(store.is_empty());
    }
}
