//! Final corrective passes over a terrain raster.
//!
//! - Edge margin: photographs get a guaranteed ring of open water.
//! - Bleed repair: after smoothing, levels that sank toward the water key are
//!   snapped back to clean water and everything else is clamped into the
//!   land band.
//!
//! Neither pass ever turns water into land.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};
use crate::terrain::{LandValue, TerrainCell, TerrainRaster, WaterSentinel};
use crate::tilemap::Tilemap;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderParams {
    /// Width of the faded border in pixels. 0 disables the pass.
    pub margin: usize,
    /// Pixels with `distance / margin` below this become water
    pub fade_threshold: f32,
}

impl Default for BorderParams {
    fn default() -> Self {
        Self {
            margin: 30,
            fade_threshold: 0.5,
        }
    }
}

impl BorderParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.fade_threshold > 0.0 && self.fade_threshold <= 1.0) {
            return Err(TerrainError::InvalidConfig(format!(
                "fade_threshold must be in (0, 1], got {}",
                self.fade_threshold
            )));
        }
        Ok(())
    }
}

/// Distance from `(x, y)` to the nearest image edge.
pub fn edge_distance(x: usize, y: usize, width: usize, height: usize) -> usize {
    x.min(y).min(width - 1 - x).min(height - 1 - y)
}

/// Overwrite every pixel close to the border with water.
/// Returns the number of land pixels that were drowned.
pub fn apply_edge_margin(raster: &mut TerrainRaster, params: &BorderParams) -> usize {
    if params.margin == 0 {
        return 0;
    }
    let (width, height) = (raster.width(), raster.height());
    let margin = params.margin as f32;
    let mut drowned = 0;

    for (x, y, cell) in raster.cells.iter_mut() {
        let fade = edge_distance(x, y, width, height) as f32 / margin;
        if fade < params.fade_threshold && !cell.is_water() {
            *cell = TerrainCell::Water;
            drowned += 1;
        }
    }

    tracing::debug!(margin = params.margin, drowned, "edge margin applied");
    drowned
}

/// Blue-channel level below which a smoothed pixel counts as water.
pub const DEFAULT_BLEED_CUTOFF: f32 = 120.0;

/// Rebuild a raster from a smoothed level field.
///
/// Levels below `cutoff` become the exact water sentinel. Anything at or
/// above it is land, clamped into the band, so no pixel is left between
/// clean water and valid land.
pub fn repair_bleed(levels: &Tilemap<f32>, cutoff: f32, sentinel: WaterSentinel) -> TerrainRaster {
    let cells = Tilemap::par_from_fn(levels.width, levels.height, |x, y| {
        let level = *levels.get(x, y);
        if level < cutoff {
            TerrainCell::Water
        } else {
            TerrainCell::Land(LandValue::from_level(level))
        }
    });
    TerrainRaster { cells, sentinel }
}
