use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::api::BookingApi;
use crate::error::BookingError;
use crate::model::CatalogId;

use super::availability::AvailabilityIndex;

/// One availability snapshot per unit, fetched on first use.
///
/// A snapshot never changes once cached. New blocks only become visible
/// through [`SnapshotStore::refresh`].
pub struct SnapshotStore {
    api: Arc<dyn BookingApi>,
    snapshots: DashMap<CatalogId, Arc<AvailabilityIndex>>,
}

impl SnapshotStore {
    pub fn new(api: Arc<dyn BookingApi>) -> Self {
        Self {
            api,
            snapshots: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn get(&self, unit_id: &CatalogId) -> Option<Arc<AvailabilityIndex>> {
        self.snapshots.get(unit_id).map(|e| e.value().clone())
    }

    pub async fn get_or_fetch(&self, unit_id: &CatalogId) -> Result<Arc<AvailabilityIndex>, BookingError> {
        if let Some(index) = self.get(unit_id) {
            return Ok(index);
        }
        self.refresh(unit_id).await
    }

    /// Fetch a fresh snapshot and replace the cached one.
    pub async fn refresh(&self, unit_id: &CatalogId) -> Result<Arc<AvailabilityIndex>, BookingError> {
        let blocked = self.api.fetch_availability(unit_id).await?;
        let index = Arc::new(AvailabilityIndex::new(unit_id.clone(), blocked)?);
        debug!(unit = %unit_id, blocked = index.blocked_ranges().len(), "availability snapshot loaded");
        self.snapshots.insert(unit_id.clone(), index.clone());
        Ok(index)
    }

    pub fn evict(&self, unit_id: &CatalogId) {
        self.snapshots.remove(unit_id);
    }
}
