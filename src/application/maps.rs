// Background map download worker and the in-memory raster cache
use crate::application::catalog::MapCatalog;
use crate::application::compositor::TileCompositor;
use crate::application::registry::{ObjectiveList, ObjectiveRegistry};
use crate::domain::error::MistwarError;
use crate::domain::model::{ExpandedFloorMap, MapMetadata};
use crate::domain::traits::{Notifier, PlayerContext, Release};
use dashmap::DashMap;
use image::RgbaImage;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

/// A composed map raster held in memory, with the file it was read from.
pub struct MapRaster {
    pub map_id: i32,
    pub path: PathBuf,
    pub image: RgbaImage,
}

impl Release for MapRaster {
    fn release(&self) {
        debug!("Releasing raster of map {} ({})", self.map_id, self.path.display());
    }
}

/// Everything a map overlay needs for the map the player is on.
pub struct MapView {
    pub map: Arc<MapMetadata>,
    pub floor: Option<Arc<ExpandedFloorMap>>,
    pub raster: Option<Arc<MapRaster>>,
    pub objectives: ObjectiveList,
}

struct LoadingGuard(Arc<AtomicBool>);

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct MapService {
    catalog: Arc<MapCatalog>,
    registry: Arc<ObjectiveRegistry>,
    compositor: Arc<TileCompositor>,
    player: Arc<dyn PlayerContext>,
    notifier: Arc<dyn Notifier>,
    clip_to_sectors: bool,
    rasters: DashMap<i32, Arc<MapRaster>>,
    loading: Arc<AtomicBool>,
    worker: Mutex<Option<AbortHandle>>,
}

impl MapService {
    pub fn new(
        catalog: Arc<MapCatalog>,
        registry: Arc<ObjectiveRegistry>,
        compositor: Arc<TileCompositor>,
        player: Arc<dyn PlayerContext>,
        notifier: Arc<dyn Notifier>,
        clip_to_sectors: bool,
    ) -> Self {
        Self {
            catalog,
            registry,
            compositor,
            player,
            notifier,
            clip_to_sectors,
            rasters: DashMap::new(),
            loading: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// Prepare the rasters of `map_ids` on a background worker.
    ///
    /// Rasters already on disk are loaded as they are. Returns `None` when the
    /// list is empty or another worker is still running.
    pub fn download_maps(self: &Arc<Self>, map_ids: Vec<i32>) -> Option<JoinHandle<()>> {
        self.spawn_worker(map_ids, false)
    }

    /// Like [`MapService::download_maps`], but always rebuilds from tiles.
    pub fn rebuild_maps(self: &Arc<Self>, map_ids: Vec<i32>) -> Option<JoinHandle<()>> {
        self.spawn_worker(map_ids, true)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    fn spawn_worker(self: &Arc<Self>, map_ids: Vec<i32>, rebuild: bool) -> Option<JoinHandle<()>> {
        if map_ids.is_empty() || self.loading.swap(true, Ordering::SeqCst) {
            return None;
        }
        let guard = LoadingGuard(Arc::clone(&self.loading));
        let this = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let _guard = guard;
            // 逐个下载, 进度条一次只跟踪一张地图
            for map_id in map_ids {
                if let Err(e) = this.prepare_map(map_id, rebuild).await {
                    warn!("Map {} could not be prepared: {}", map_id, e);
                }
            }
            this.notifier.progress(None);
        });
        *self.worker.lock() = Some(handle.abort_handle());
        Some(handle)
    }

    async fn prepare_map(&self, map_id: i32, rebuild: bool) -> Result<(), MistwarError> {
        let path = self.compositor.store().path_for(map_id);

        if rebuild || !path.is_file() {
            let map = self.catalog.try_get_map(map_id).await?;
            let label = format!("{} ({})", map.name.trim(), map.id);
            let notifier = Arc::clone(&self.notifier);
            let progress = move |percent: u32| {
                notifier.progress(Some(&format!("Downloading {}... {}%", label, percent)));
            };
            let stats = self
                .compositor
                .build(&map, &path, self.clip_to_sectors, &progress)
                .await?;
            info!(
                "Map {} built, {} of {} tiles skipped",
                map_id, stats.skipped, stats.tiles
            );
        }

        if self.load_raster(map_id).await.is_some() {
            Ok(())
        } else {
            Err(MistwarError::NotFound(path.display().to_string()))
        }
    }

    /// Read the raster of `map_id` from disk into memory, replacing any older copy.
    pub async fn load_raster(&self, map_id: i32) -> Option<Arc<MapRaster>> {
        let path = self.compositor.store().path_for(map_id);
        let image = self.compositor.load_cached(&path).await?;
        let raster = Arc::new(MapRaster {
            map_id,
            path,
            image,
        });
        if let Some(old) = self.rasters.insert(map_id, Arc::clone(&raster)) {
            old.release();
        }
        Some(raster)
    }

    pub fn raster(&self, map_id: i32) -> Option<Arc<MapRaster>> {
        self.rasters.get(&map_id).map(|r| Arc::clone(r.value()))
    }

    /// Map, floor, raster and objectives of the player's current map.
    ///
    /// `None` outside of a match or when the map itself is unknown.
    pub async fn reload_map(&self) -> Option<MapView> {
        if !self.player.is_in_match() {
            return None;
        }
        let map_id = self.player.current_map_id()?;
        let map = self.catalog.get_map(map_id).await?;
        let floor = self.catalog.get_expanded_floor(&map, map.default_floor).await;
        let raster = self.raster(map_id);
        let objectives = self.registry.get_objectives(map_id).await;

        Some(MapView {
            map,
            floor,
            raster,
            objectives,
        })
    }

    /// Stop the download worker and drop every cached raster and objective.
    ///
    /// Objective builds still in flight are abandoned, not awaited.
    pub fn shutdown(&self) {
        if let Some(worker) = self.worker.lock().take() {
            worker.abort();
        }
        self.registry.clear_now();

        let ids: Vec<i32> = self.rasters.iter().map(|r| *r.key()).collect();
        for id in ids {
            if let Some((_, raster)) = self.rasters.remove(&id) {
                raster.release();
            }
        }
    }
}
