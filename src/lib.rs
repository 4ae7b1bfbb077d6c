//! Terrain encoding library
//!
//! Turns photographs, or procedurally drawn islands, into the single-channel
//! terrain rasters the map renderer consumes.

pub mod border;
pub mod classify;
pub mod config;
pub mod elevation;
pub mod error;
pub mod export;
pub mod features;
pub mod filters;
pub mod landmass;
pub mod pipeline;
pub mod quantize;
pub mod terrain;
pub mod tilemap;

pub use error::{Result, TerrainError};
