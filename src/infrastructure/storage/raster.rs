// On-disk cache of composed map images, one PNG per map id
use crate::domain::error::MistwarError;
use image::{ImageFormat, RgbaImage};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RasterStore {
    dir: PathBuf,
    retries: u32,
    retry_delay: Duration,
}

impl RasterStore {
    pub fn new(dir: impl Into<PathBuf>, retries: u32, retry_delay: Duration) -> Self {
        Self {
            dir: dir.into(),
            retries,
            retry_delay,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, map_id: i32) -> PathBuf {
        self.dir.join(format!("{}.png", map_id))
    }

    pub fn exists(&self, map_id: i32) -> bool {
        self.path_for(map_id).is_file()
    }

    /// Reads a persisted raster, retrying while a writer may still be flushing it.
    ///
    /// Returns `None` when every attempt failed; callers treat that as "not ready".
    pub async fn load_cached(&self, path: &Path) -> Option<RgbaImage> {
        let mut remaining = self.retries;
        loop {
            match read_png(path).await {
                Ok(image) => {
                    debug!("Loaded {} ({}x{})", path.display(), image.width(), image.height());
                    return Some(image);
                }
                Err(e) if remaining > 0 => {
                    warn!(
                        "Failed to load map image '{}': {}. Retrying in {}ms (remaining retries: {}).",
                        path.display(),
                        e,
                        self.retry_delay.as_millis(),
                        remaining
                    );
                    remaining -= 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    warn!(
                        "After multiple attempts '{}' could not be loaded: {}",
                        path.display(),
                        e
                    );
                    return None;
                }
            }
        }
    }

    /// Writes `image` as PNG, replacing any existing file in one rename.
    pub async fn save(&self, image: RgbaImage, path: &Path) -> Result<(), MistwarError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let path = path.to_path_buf();
        let tmp = path.with_extension("png.tmp");

        tokio::task::spawn_blocking(move || -> Result<(), MistwarError> {
            image.save_with_format(&tmp, ImageFormat::Png)?;
            std::fs::rename(&tmp, &path)?;
            Ok(())
        })
        .await?
    }
}

async fn read_png(path: &Path) -> Result<RgbaImage, MistwarError> {
    let bytes = tokio::fs::read(path).await?;
    tokio::task::spawn_blocking(move || -> Result<RgbaImage, MistwarError> {
        Ok(image::load_from_memory_with_format(&bytes, ImageFormat::Png)?.to_rgba8())
    })
    .await?
}
