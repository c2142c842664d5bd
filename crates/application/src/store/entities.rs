//! Normalized entity cache.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use riptide_domain::{CollectionName, EntityId, EntityMap, EntityRecord};

/// Thread-safe in-memory entity cache: collection name → (id → record).
///
/// The store owns the canonical copy of every record; everything else refers
/// to entities by id. Writes are whole-record upserts, last-write-wins per
/// id. Memory-resident for the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    collections: Arc<RwLock<HashMap<CollectionName, HashMap<EntityId, EntityRecord>>>>,
}

impl EntityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts every record of a normalization pass. Existing records with
    /// the same id are overwritten, never field-merged.
    pub async fn upsert_all(&self, entities: EntityMap) {
        if entities.is_empty() {
            return;
        }
        let mut collections = self.collections.write().await;
        for (collection, records) in entities {
            collections.entry(collection).or_default().extend(records);
        }
    }

    /// Returns a record by collection and id.
    pub async fn get(&self, collection: &str, id: &str) -> Option<EntityRecord> {
        let collections = self.collections.read().await;
        collections.get(collection)?.get(id).cloned()
    }

    /// Returns the records for `ids` in the given order, skipping ids the
    /// store no longer holds.
    pub async fn get_many(&self, collection: &str, ids: &[EntityId]) -> Vec<EntityRecord> {
        let collections = self.collections.read().await;
        let Some(records) = collections.get(collection) else {
            return Vec::new();
        };
        ids.iter().filter_map(|id| records.get(id).cloned()).collect()
    }

    /// Removes one record.
    pub async fn remove(&self, collection: &str, id: &str) -> Option<EntityRecord> {
        let mut collections = self.collections.write().await;
        collections.get_mut(collection)?.remove(id)
    }

    /// Number of records cached for a collection.
    pub async fn count(&self, collection: &str) -> usize {
        let collections = self.collections.read().await;
        collections.get(collection).map_or(0, HashMap::len)
    }

    /// Drops every cached record.
    pub async fn clear(&self) {
        let mut collections = self.collections.write().await;
        collections.clear();
    }
}
