//! In-memory slot storage, used when no data directory is available and in tests

use parking_lot::RwLock;
use std::collections::HashMap;

use super::{SlotStorage, StoreError};

/// Keeps slot contents in a process-local map
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates a slot with raw contents
    pub fn with_slot(self, key: impl Into<String>, contents: impl Into<String>) -> Self {
        self.slots.write().insert(key.into(), contents.into());
        self
    }

    /// Number of slots that have been written
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

impl SlotStorage for MemoryStore {
    fn read_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.slots.read().get(key).cloned())
    }

    fn write_raw(&self, key: &str, contents: &str) -> Result<(), StoreError> {
        self.slots.write().insert(key.to_string(), contents.to_string());
        Ok(())
    }
}
