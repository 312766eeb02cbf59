//! Variable storage backing an [`Environment`](super::Environment).
//!
//! A store is created once per suite run and shared by every call in it.
//! Implementations must be safe for concurrent readers and writers: each
//! `get` observes a value completely written by some `set`, and concurrent
//! writes to one key resolve last-writer-wins.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

/// Concurrent string-to-string key/value storage.
pub trait VariableStore: Send + Sync + fmt::Debug {
    /// Returns the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str);

    /// Removes `key`, returning its previous value.
    fn remove(&self, key: &str) -> Option<String>;

    /// Returns all entries in lexicographic key order.
    fn entries(&self) -> Vec<(String, String)>;

    /// Returns the number of stored variables.
    fn len(&self) -> usize {
        self.entries().len()
    }
}

/// In-memory store ordered by key.
///
/// The lock is held only for the duration of a single operation.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    variables: RwLock<BTreeMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with `variables`.
    pub fn with_variables(variables: BTreeMap<String, String>) -> Self {
        Self {
            variables: RwLock::new(variables),
        }
    }
}

impl VariableStore for InMemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.variables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.variables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) -> Option<String> {
        self.variables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.variables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn len(&self) -> usize {
        self.variables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_set_overwrites() {
        let store = InMemoryStore::new();
        store.set("token", "one");
        store.set("token", "two");

        assert_eq!(store.get("token"), Some("two".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_entries_are_ordered() {
        let store = InMemoryStore::new();
        store.set("zeta", "1");
        store.set("alpha", "2");
        store.set("mid", "3");

        let keys: Vec<String> = store.entries().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_remove() {
        let store = InMemoryStore::new();
        store.set("a", "1");
        assert_eq!(store.remove("a"), Some("1".to_string()));
        assert_eq!(store.get("a"), None);
        assert_eq!(store.remove("a"), None);
    }

    #[test]
    fn test_concurrent_writers_never_tear() {
        let store = Arc::new(InMemoryStore::new());
        let values: Vec<String> = (0..8).map(|i| format!("value-{}-{}", i, "x".repeat(64))).collect();

        let handles: Vec<_> = values
            .iter()
            .cloned()
            .map(|value| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..200 {
                        store.set("shared", &value);
                        let seen = store.get("shared").unwrap();
                        assert!(seen.starts_with("value-") && seen.ends_with(&"x".repeat(64)));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let last = store.get("shared").unwrap();
        assert!(values.contains(&last));
    }
}
