pub mod cache;
pub mod raster;

pub use cache::{CacheResult, SingleFlightCache};
pub use raster::RasterStore;
