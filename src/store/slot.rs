//! Binding between one storage slot and an in-memory value

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

use super::{SlotStorage, StoreError};

/// A named storage slot mirrored by an in-memory value
///
/// The slot is hydrated once when bound: a stored value that deserializes as
/// `T` wins, anything else (missing, unreadable, corrupt) falls back to the
/// default. After that the in-memory value is authoritative and every change
/// is written through to the backend. Persistence failures are logged and
/// never returned, so a failed write means the change only lives until the
/// process exits.
///
/// Each call to [`StoredSlot::bind`] creates an independent mirror; bind a key
/// once per feature.
pub struct StoredSlot<T> {
    key: String,
    storage: Arc<dyn SlotStorage>,
    value: Mutex<T>,
}

impl<T> StoredSlot<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Binds `key` in `storage`, reading its current value or using `default`
    ///
    /// # Arguments
    /// * `storage` - Backend the slot reads from and writes through to
    /// * `key` - Storage key for the slot (e.g., "favorites")
    /// * `default` - Value used when the key is missing or unreadable
    pub fn bind(storage: Arc<dyn SlotStorage>, key: impl Into<String>, default: T) -> Self {
        let key = key.into();
        let value = match Self::hydrate(storage.as_ref(), &key) {
            Ok(Some(value)) => {
                tracing::debug!(key = %key, "Hydrated slot from storage");
                value
            }
            Ok(None) => {
                tracing::debug!(key = %key, "Slot is empty, using default");
                default
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to read slot, using default");
                default
            }
        };

        Self {
            key,
            storage,
            value: Mutex::new(value),
        }
    }

    fn hydrate(storage: &dyn SlotStorage, key: &str) -> Result<Option<T>, StoreError> {
        match storage.read_raw(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Storage key this slot is bound to
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns a copy of the current value
    pub fn get(&self) -> T {
        self.value.lock().clone()
    }

    /// Replaces the value and writes it through to storage
    pub fn set(&self, value: T) {
        let mut current = self.value.lock();
        *current = value;
        self.persist(&current);
    }

    /// Applies `f` to the latest value under the slot lock
    ///
    /// If `f` returns `Some`, that value replaces the current one and is
    /// written through; `None` leaves the slot untouched and skips the write.
    ///
    /// # Returns
    /// * The value held after the call, whether or not `f` changed it
    pub fn update<F>(&self, f: F) -> T
    where
        F: FnOnce(&T) -> Option<T>,
    {
        let mut current = self.value.lock();
        if let Some(next) = f(&current) {
            *current = next;
            self.persist(&current);
        }
        current.clone()
    }

    fn persist(&self, value: &T) {
        let result = serde_json::to_string_pretty(value)
            .map_err(StoreError::from)
            .and_then(|json| self.storage.write_raw(&self.key, &json));

        if let Err(e) = result {
            tracing::warn!(
                key = %self.key,
                error = %e,
                "Failed to persist slot; keeping in-memory value"
            );
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for StoredSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredSlot")
            .field("key", &self.key)
            .field("value", &*self.value.lock())
            .finish()
    }
}
