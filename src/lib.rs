//! Live World vs. World objective tracking for Guild Wars 2.
//!
//! The crate polls the official API for match state, keeps one entity per
//! capturable objective up to date and composes map rasters from API tiles.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod presentation;
pub mod state;
