use std::collections::HashMap;

use parking_lot::RwLock;

use crate::engine::KvEngine;
use crate::error::KvError;

/// Volatile engine holding everything in a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KvEngine for MemoryEngine {
    fn get(&self, key: &str) -> Result<Vec<u8>, KvError> {
        self.entries.read().get(key).cloned().ok_or(KvError::NotFound)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), KvError> {
        self.entries
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or(KvError::NotFound)
    }

    fn keys(&self) -> Result<Vec<String>, KvError> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}
