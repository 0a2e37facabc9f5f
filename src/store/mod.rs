//! Durable storage for favorites and other small persisted values
//!
//! Values live in named slots. A [`SlotStorage`] backend knows how to read and
//! write the raw serialized form of a slot; a [`StoredSlot`] binds one slot to
//! an in-memory value, hydrating it once and writing it through on every change.

mod disk;
mod memory;
mod slot;

pub use disk::DiskStore;
pub use memory::MemoryStore;
pub use slot::StoredSlot;

use thiserror::Error;

/// Errors raised by storage backends
///
/// These never reach callers of [`StoredSlot`]; the slot logs them and keeps
/// its in-memory value.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing medium failed
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The value could not be serialized or deserialized
    #[error("failed to (de)serialize stored value: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Backend holding the raw serialized contents of named slots
pub trait SlotStorage: Send + Sync {
    /// Returns the stored contents for `key`, or `Ok(None)` if the slot is empty
    fn read_raw(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replaces the stored contents for `key`
    fn write_raw(&self, key: &str, contents: &str) -> Result<(), StoreError>;
}
