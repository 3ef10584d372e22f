pub mod error;
pub mod geometry;
pub mod model;
pub mod objective;
pub mod traits;
