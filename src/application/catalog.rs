// Map and floor metadata, fetched once per process
use crate::domain::model::{ExpandedFloorMap, MapMetadata};
use crate::domain::traits::RemoteSource;
use crate::infrastructure::network::retry::{retry, RetryPolicy};
use crate::infrastructure::storage::{CacheResult, SingleFlightCache};
use std::sync::Arc;
use tracing::warn;

type MapCache = SingleFlightCache<i32, Arc<MapMetadata>>;
type FloorCache = SingleFlightCache<(i32, i32), Arc<ExpandedFloorMap>>;

/// Cache-backed access to map metadata and expanded floor maps.
///
/// Both caches keep successes and failures for the lifetime of the catalog;
/// use [`MapCatalog::forget`] to force a refetch.
pub struct MapCatalog {
    maps: Arc<MapCache>,
    floors: FloorCache,
}

impl MapCatalog {
    pub fn new(remote: Arc<dyn RemoteSource>, policy: RetryPolicy) -> Self {
        let maps = {
            let remote = Arc::clone(&remote);
            Arc::new(MapCache::new(move |map_id: i32| {
                let remote = Arc::clone(&remote);
                async move {
                    let what = format!("Fetching map {}", map_id);
                    let map = retry(policy, &what, || remote.map(map_id)).await?;
                    Ok(Arc::new(map))
                }
            }))
        };

        let floors = {
            let maps = Arc::clone(&maps);
            FloorCache::new(move |(map_id, floor_id): (i32, i32)| {
                let remote = Arc::clone(&remote);
                let maps = Arc::clone(&maps);
                async move {
                    let map = maps.get(map_id).await?;
                    let what = format!("Fetching floor {} of map {}", floor_id, map_id);
                    let floor = retry(policy, &what, || remote.expanded_floor(&map, floor_id)).await?;
                    Ok(Arc::new(floor))
                }
            })
        };

        Self { maps, floors }
    }

    /// Map metadata, or `None` when it could not be fetched.
    pub async fn get_map(&self, map_id: i32) -> Option<Arc<MapMetadata>> {
        match self.try_get_map(map_id).await {
            Ok(map) => Some(map),
            Err(e) => {
                warn!("Map {} is unavailable: {}", map_id, e);
                None
            }
        }
    }

    pub async fn try_get_map(&self, map_id: i32) -> CacheResult<Arc<MapMetadata>> {
        self.maps.get(map_id).await
    }

    /// Sectors and points of interest of `map` on `floor_id`.
    pub async fn get_expanded_floor(
        &self,
        map: &MapMetadata,
        floor_id: i32,
    ) -> Option<Arc<ExpandedFloorMap>> {
        match self.try_get_expanded_floor(map, floor_id).await {
            Ok(floor) => Some(floor),
            Err(e) => {
                warn!("Floor {} of map {} is unavailable: {}", floor_id, map.id, e);
                None
            }
        }
    }

    pub async fn try_get_expanded_floor(
        &self,
        map: &MapMetadata,
        floor_id: i32,
    ) -> CacheResult<Arc<ExpandedFloorMap>> {
        self.floors.get((map.id, floor_id)).await
    }

    /// Drop the metadata and default floor of `map_id` so the next request refetches them.
    pub fn forget(&self, map_id: i32) {
        if let Some(map) = self.maps.remove(&map_id) {
            self.floors.remove(&(map_id, map.default_floor));
        }
    }

    pub fn has_map(&self, map_id: i32) -> bool {
        self.maps.contains_key(&map_id)
    }
}
