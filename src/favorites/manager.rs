//! Favorites cache manager
//!
//! Owns the `"favorites"` storage slot and the query cache entry derived from
//! it. Every mutation is applied to the latest stored collection under the
//! slot lock, written through, and followed by an invalidation so readers
//! pick up the new collection on their next `read()`.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;

use super::model::{favorite_id, FavoriteCity, NewFavorite};
use crate::query::QueryCache;
use crate::store::{SlotStorage, StoredSlot};

/// Storage slot and query key for the favorites collection
pub const FAVORITES_KEY: &str = "favorites";

/// Read/write access to the user's favorite locations
pub struct FavoritesManager {
    slot: StoredSlot<Vec<FavoriteCity>>,
    query: QueryCache<Arc<[FavoriteCity]>>,
}

impl FavoritesManager {
    /// Binds the favorites slot in `storage`, starting empty if nothing is stored
    pub fn new(storage: Arc<dyn SlotStorage>) -> Self {
        let slot = StoredSlot::bind(storage, FAVORITES_KEY, Vec::new());
        tracing::debug!(count = slot.get().len(), "Favorites loaded");
        Self {
            slot,
            query: QueryCache::never_stale(),
        }
    }

    /// Current favorites in the order they were added
    pub fn read(&self) -> Arc<[FavoriteCity]> {
        self.query
            .fetch(FAVORITES_KEY, || Arc::from(self.slot.get()))
    }

    /// Looks up a favorite by id
    pub fn get(&self, id: &str) -> Option<FavoriteCity> {
        self.read().iter().find(|city| city.id == id).cloned()
    }

    /// Adds a favorite unless one already exists at the same coordinates
    ///
    /// Adding a location that is already a favorite changes nothing and is
    /// not an error.
    ///
    /// # Arguments
    /// * `attrs` - Name, country, optional state and coordinates of the location
    ///
    /// # Returns
    /// * The resulting collection, with the new favorite last if it was added
    pub fn add(&self, attrs: NewFavorite) -> Vec<FavoriteCity> {
        let id = favorite_id(attrs.lat, attrs.lon);
        let mut added = false;

        let favorites = self.slot.update(|current| {
            if current.iter().any(|city| city.id == id) {
                return None;
            }
            let mut next = current.clone();
            next.push(FavoriteCity::from_new(attrs, Utc::now().timestamp_millis()));
            added = true;
            Some(next)
        });

        if added {
            tracing::info!(id = %id, count = favorites.len(), "Favorite added");
            self.query.invalidate(FAVORITES_KEY);
        } else {
            tracing::debug!(id = %id, "Location is already a favorite");
        }

        favorites
    }

    /// Removes the favorite with `id`, if any
    ///
    /// The collection is written back even when nothing matched.
    ///
    /// # Arguments
    /// * `id` - Favorite id (e.g., "51.5--0.1")
    ///
    /// # Returns
    /// * The resulting collection in its original order
    pub fn remove(&self, id: &str) -> Vec<FavoriteCity> {
        let mut removed = 0;

        let favorites = self.slot.update(|current| {
            let next: Vec<FavoriteCity> = current
                .iter()
                .filter(|city| city.id != id)
                .cloned()
                .collect();
            removed = current.len() - next.len();
            Some(next)
        });

        tracing::info!(id, removed, count = favorites.len(), "Favorite removal applied");
        self.query.invalidate(FAVORITES_KEY);

        favorites
    }

    /// Whether a favorite exists at the given coordinates
    ///
    /// This is not an exact float comparison: both coordinates are rounded to
    /// 4 decimal places (about 11 m) before matching, so `(51.50004, -0.1)`
    /// matches a favorite at `(51.5, -0.1)`. The duplicate check in
    /// [`FavoritesManager::add`] uses the same rounding.
    pub fn is_favorite(&self, lat: f64, lon: f64) -> bool {
        let id = favorite_id(lat, lon);
        self.read().iter().any(|city| city.id == id)
    }

    /// Subscribes to changes of the favorites collection
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.query.subscribe(FAVORITES_KEY)
    }
}

impl std::fmt::Debug for FavoritesManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoritesManager")
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DiskStore, MemoryStore, StoreError};
    use std::io;
    use tempfile::TempDir;

    fn london() -> NewFavorite {
        NewFavorite::new("London", "GB", 51.5, -0.1)
    }

    fn vancouver() -> NewFavorite {
        NewFavorite::new("Vancouver", "CA", 49.2827, -123.1207).with_state("British Columbia")
    }

    fn memory_manager() -> (FavoritesManager, Arc<MemoryStore>) {
        let storage = Arc::new(MemoryStore::new());
        (FavoritesManager::new(storage.clone()), storage)
    }

    fn stored_favorites(storage: &MemoryStore) -> Vec<FavoriteCity> {
        let raw = storage
            .read_raw(FAVORITES_KEY)
            .unwrap()
            .expect("Favorites should be persisted");
        serde_json::from_str(&raw).unwrap()
    }

    struct ReadOnlyStore;

    impl SlotStorage for ReadOnlyStore {
        fn read_raw(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn write_raw(&self, _key: &str, _contents: &str) -> Result<(), StoreError> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only").into())
        }
    }

    #[test]
    fn test_starts_empty() {
        let (manager, _) = memory_manager();
        assert!(manager.read().is_empty());
    }

    #[test]
    fn test_add_remove_scenario() {
        let (manager, _) = memory_manager();

        let favorites = manager.add(london());
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].id, "51.5--0.1");
        assert!(favorites[0].added_at > 0);

        let favorites = manager.add(london());
        assert_eq!(favorites.len(), 1);

        let favorites = manager.remove("51.5--0.1");
        assert!(favorites.is_empty());
        assert!(!manager.is_favorite(51.5, -0.1));
    }

    #[test]
    fn test_add_then_read_contains_exactly_one_entry() {
        let (manager, _) = memory_manager();
        manager.add(vancouver());

        let favorites = manager.read();
        let matching: Vec<_> = favorites
            .iter()
            .filter(|c| c.lat == 49.2827 && c.lon == -123.1207)
            .collect();

        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].state.as_deref(), Some("British Columbia"));
    }

    #[test]
    fn test_duplicate_add_keeps_original_entry() {
        let (manager, _) = memory_manager();
        let first = manager.add(london());

        let mut renamed = london();
        renamed.name = "City of London".to_string();
        let second = manager.add(renamed);

        assert_eq!(second, first, "Duplicate add must not modify the collection");
    }

    #[test]
    fn test_duplicate_add_within_id_precision() {
        let (manager, _) = memory_manager();
        manager.add(london());

        let favorites = manager.add(NewFavorite::new("London", "GB", 51.500001, -0.100004));

        assert_eq!(favorites.len(), 1);
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let (manager, _) = memory_manager();
        manager.add(london());
        manager.add(vancouver());
        manager.add(NewFavorite::new("Tokyo", "JP", 35.6762, 139.6503));

        let names: Vec<_> = manager.read().iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["London", "Vancouver", "Tokyo"]);
    }

    #[test]
    fn test_remove_missing_id_leaves_collection_unchanged() {
        let (manager, storage) = memory_manager();
        let before = manager.add(london());

        let after = manager.remove("0-0");

        assert_eq!(after, before);
        assert_eq!(stored_favorites(&storage), before);
    }

    #[test]
    fn test_remove_on_empty_collection_still_writes() {
        let (manager, storage) = memory_manager();

        manager.remove("0-0");

        assert!(stored_favorites(&storage).is_empty());
    }

    #[test]
    fn test_remove_existing_entry_drops_exactly_one() {
        let (manager, _) = memory_manager();
        manager.add(london());
        let before = manager.add(vancouver());
        let id = before[1].id.clone();

        let after = manager.remove(&id);

        assert_eq!(after.len(), before.len() - 1);
        assert!(after.iter().all(|c| c.id != id));
    }

    #[test]
    fn test_is_favorite_tracks_add_and_remove() {
        let (manager, _) = memory_manager();
        assert!(!manager.is_favorite(49.2827, -123.1207));

        let favorites = manager.add(vancouver());
        assert!(manager.is_favorite(49.2827, -123.1207));

        manager.remove(&favorites[0].id);
        assert!(!manager.is_favorite(49.2827, -123.1207));
    }

    #[test]
    fn test_is_favorite_matches_to_four_decimal_places() {
        let (manager, _) = memory_manager();
        manager.add(london());

        assert!(manager.is_favorite(51.50004, -0.1));
        assert!(manager.is_favorite(51.5, -0.10004));
        assert!(!manager.is_favorite(51.5002, -0.1));
        assert!(!manager.is_favorite(51.5, -0.1002));
    }

    #[test]
    fn test_get_by_id() {
        let (manager, _) = memory_manager();
        manager.add(london());

        assert_eq!(manager.get("51.5--0.1").unwrap().name, "London");
        assert!(manager.get("1-1").is_none());
    }

    #[test]
    fn test_mutations_are_persisted() {
        let (manager, storage) = memory_manager();
        manager.add(london());
        manager.add(vancouver());

        let stored = stored_favorites(&storage);
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].name, "London");
    }

    #[test]
    fn test_duplicate_add_does_not_invalidate() {
        let (manager, _) = memory_manager();
        manager.add(london());
        let rx = manager.subscribe();
        let generation = *rx.borrow();

        manager.add(london());

        assert_eq!(*rx.borrow(), generation);
    }

    #[test]
    fn test_mutations_invalidate_read_cache() {
        let (manager, _) = memory_manager();
        let rx = manager.subscribe();

        let before = manager.read();
        manager.add(london());
        assert_eq!(*rx.borrow(), 1);
        let after_add = manager.read();
        manager.remove("51.5--0.1");
        assert_eq!(*rx.borrow(), 2);

        assert!(before.is_empty());
        assert_eq!(after_add.len(), 1);
        assert!(manager.read().is_empty());
    }

    #[test]
    fn test_back_to_back_mutations_are_not_lost() {
        let (manager, _) = memory_manager();

        // Neither call sees a rendered snapshot; both apply to the latest value
        let _ = manager.read();
        manager.add(london());
        manager.add(vancouver());

        assert_eq!(manager.read().len(), 2);
    }

    #[test]
    fn test_concurrent_adds_from_threads() {
        let storage = Arc::new(MemoryStore::new());
        let manager = Arc::new(FavoritesManager::new(storage.clone()));

        let handles: Vec<_> = (0..10_i32)
            .map(|i| {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || {
                    manager.add(NewFavorite::new(
                        format!("City {}", i),
                        "XX",
                        f64::from(i),
                        f64::from(i),
                    ));
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(manager.read().len(), 10);
        assert_eq!(stored_favorites(&storage).len(), 10);
    }

    #[test]
    fn test_write_failure_keeps_favorites_in_memory() {
        let manager = FavoritesManager::new(Arc::new(ReadOnlyStore));

        let favorites = manager.add(london());

        assert_eq!(favorites.len(), 1);
        assert!(manager.is_favorite(51.5, -0.1));
    }

    #[test]
    fn test_corrupt_slot_starts_empty() {
        let storage = Arc::new(MemoryStore::new().with_slot(FAVORITES_KEY, "{ broken"));
        let manager = FavoritesManager::new(storage);

        assert!(manager.read().is_empty());
        assert_eq!(manager.add(london()).len(), 1);
    }

    #[test]
    fn test_favorites_survive_restart() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let storage = Arc::new(DiskStore::with_dir(temp_dir.path().to_path_buf()));

        {
            let manager = FavoritesManager::new(storage.clone());
            manager.add(london());
            manager.add(vancouver());
        }

        let restarted = FavoritesManager::new(storage);
        let favorites = restarted.read();
        assert_eq!(favorites.len(), 2);
        assert_eq!(favorites[0].id, "51.5--0.1");
        assert_eq!(favorites[1].name, "Vancouver");
        assert!(temp_dir.path().join("favorites.json").exists());
    }
}
