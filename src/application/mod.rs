pub mod catalog;
pub mod compositor;
pub mod maps;
pub mod registry;
pub mod sync;
