//! Stitches map tiles into one raster per map.
//!
//! Tiles are fetched one after another, blended onto a canvas covering the
//! map's continent rectangle, optionally clipped to the union of its sector
//! polygons and written as PNG.

use crate::application::catalog::MapCatalog;
use crate::domain::error::MistwarError;
use crate::domain::geometry::{refit, TILE_SIZE};
use crate::domain::model::{MapMetadata, Point, Rect, TileAddress};
use crate::domain::traits::RemoteSource;
use crate::infrastructure::storage::RasterStore;
use image::{imageops, Rgba, RgbaImage};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Zoom level the tiles are requested at.
pub const TILE_ZOOM: u8 = 6;

/// Percent of tiles processed so far.
pub type Progress<'a> = &'a (dyn Fn(u32) + Send + Sync);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildStats {
    pub tiles: usize,
    pub skipped: usize,
}

/// Tiles covering `area`, column by column.
pub fn tile_range(area: &Rect) -> Vec<(i32, i32)> {
    let tile = f64::from(TILE_SIZE);
    let to_tile = |v: f64| (v / tile).floor() as i32;

    let (x0, y0) = (to_tile(area.top_left.x).max(0), to_tile(area.top_left.y).max(0));
    let (x1, y1) = (to_tile(area.bottom_right.x), to_tile(area.bottom_right.y));

    (x0..=x1)
        .flat_map(|x| (y0..=y1).map(move |y| (x, y)))
        .collect()
}

pub struct TileCompositor {
    remote: Arc<dyn RemoteSource>,
    catalog: Arc<MapCatalog>,
    store: RasterStore,
}

impl TileCompositor {
    pub fn new(remote: Arc<dyn RemoteSource>, catalog: Arc<MapCatalog>, store: RasterStore) -> Self {
        Self {
            remote,
            catalog,
            store,
        }
    }

    pub fn store(&self) -> &RasterStore {
        &self.store
    }

    /// Download, stitch and persist the raster of `map` at `output`.
    ///
    /// Tiles that fail to download or decode are skipped. With
    /// `clip_to_sectors` every pixel outside the map's sectors becomes fully
    /// transparent.
    pub async fn build(
        &self,
        map: &MapMetadata,
        output: &Path,
        clip_to_sectors: bool,
        progress: Progress<'_>,
    ) -> Result<BuildStats, MistwarError> {
        let area = map.continent_rect;
        let (width, height) = (area.width() as i64, area.height() as i64);
        if width <= 0 || height <= 0 {
            return Err(MistwarError::NotFound(format!(
                "map {} has an empty continent rect",
                map.id
            )));
        }

        let tiles = tile_range(&area);
        info!("Building map {} ({}) from {} tiles", map.name.trim(), map.id, tiles.len());

        let mut canvas = RgbaImage::new(width as u32, height as u32);
        let mut stats = BuildStats {
            tiles: tiles.len(),
            skipped: 0,
        };

        for (index, &(x, y)) in tiles.iter().enumerate() {
            let address = TileAddress {
                continent_id: map.continent_id,
                floor: map.default_floor,
                zoom: TILE_ZOOM,
                x,
                y,
            };
            match self.fetch_tile(address).await {
                Ok(tile) => {
                    let size = i64::from(TILE_SIZE);
                    let dx = i64::from(x) * size - area.top_left.x as i64;
                    let dy = i64::from(y) * size - area.top_left.y as i64;
                    imageops::overlay(&mut canvas, &tile, dx, dy);
                }
                Err(e) => {
                    warn!("Skipping tile {}/{} of map {}: {}", x, y, map.id, e);
                    stats.skipped += 1;
                }
            }
            progress(((index + 1) * 100 / tiles.len()) as u32);
        }

        if clip_to_sectors {
            let floor = self
                .catalog
                .try_get_expanded_floor(map, map.default_floor)
                .await?;
            let polygons: Vec<Vec<Point>> = floor
                .sectors
                .values()
                .map(|s| s.bounds.iter().map(|c| refit(*c, area.top_left, 0)).collect())
                .collect();
            canvas = tokio::task::spawn_blocking(move || {
                clip_to_polygons(&mut canvas, &polygons);
                canvas
            })
            .await?;
        }

        self.store.save(canvas, output).await?;
        debug!(
            "Saved map {} to {} ({} of {} tiles skipped)",
            map.id,
            output.display(),
            stats.skipped,
            stats.tiles
        );
        Ok(stats)
    }

    /// Previously built raster at `path`, or `None` while it is not readable.
    pub async fn load_cached(&self, path: &Path) -> Option<RgbaImage> {
        self.store.load_cached(path).await
    }

    async fn fetch_tile(&self, address: TileAddress) -> Result<RgbaImage, MistwarError> {
        let bytes = self.remote.tile(address).await?;
        tokio::task::spawn_blocking(move || -> Result<RgbaImage, MistwarError> {
            Ok(image::load_from_memory(&bytes)?.to_rgba8())
        })
        .await?
    }
}

/// Make every pixel outside the even-odd union of `polygons` transparent.
///
/// A pixel is inside when its center is; the polygons are scanned together, so
/// an area covered by two overlapping polygons counts as outside.
pub fn clip_to_polygons(image: &mut RgbaImage, polygons: &[Vec<Point>]) {
    let (width, height) = image.dimensions();
    let transparent = Rgba([0, 0, 0, 0]);
    let mut crossings: Vec<f64> = Vec::new();

    // 第一个像素中心在 cx >= c 处的列
    let column = |c: f64| (c - 0.5).ceil().clamp(0.0, f64::from(width)) as u32;

    for y in 0..height {
        let cy = f64::from(y) + 0.5;
        crossings.clear();
        for polygon in polygons.iter().filter(|p| p.len() >= 3) {
            let mut j = polygon.len() - 1;
            for i in 0..polygon.len() {
                let (a, b) = (polygon[i], polygon[j]);
                let (ay, by) = (f64::from(a.y), f64::from(b.y));
                if (ay > cy) != (by > cy) {
                    let t = (cy - ay) / (by - ay);
                    crossings.push(f64::from(a.x) + t * f64::from(b.x - a.x));
                }
                j = i;
            }
        }
        crossings.sort_by(f64::total_cmp);

        let mut cursor = 0;
        for span in crossings.chunks_exact(2) {
            let (start, end) = (column(span[0]), column(span[1]));
            for x in cursor..start.max(cursor) {
                image.put_pixel(x, y, transparent);
            }
            cursor = cursor.max(end);
        }
        for x in cursor..width {
            image.put_pixel(x, y, transparent);
        }
    }
}
