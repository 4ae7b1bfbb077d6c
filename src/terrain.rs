//! Terrain raster model shared with the downstream map renderer.
//!
//! Every output pixel is either the water sentinel or a land value inside
//! the closed band `LAND_LOW..=LAND_HIGH`, replicated across R, G and B.
//! The band and its sub-bands are a binary contract with the renderer.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};
use crate::tilemap::Tilemap;

// =============================================================================
// BAND CONSTANTS
// =============================================================================

/// Lowest land value (bottom of the plains sub-band).
pub const LAND_LOW: u8 = 140;
/// Highest land value (top of the mountain sub-band).
pub const LAND_HIGH: u8 = 200;

pub const PLAINS_MAX: u8 = 158;
pub const HIGHLANDS_MAX: u8 = 178;

/// The renderer only accepts rasters whose sides are multiples of this.
pub const DIMENSION_MULTIPLE: usize = 4;

/// Round both sides down to a multiple of `DIMENSION_MULTIPLE`.
pub fn snap_dimensions(width: usize, height: usize) -> Result<(usize, usize)> {
    let w = width - width % DIMENSION_MULTIPLE;
    let h = height - height % DIMENSION_MULTIPLE;
    if w == 0 || h == 0 {
        return Err(TerrainError::InvalidDimensions {
            width: width as u32,
            height: height as u32,
        });
    }
    Ok((w, h))
}

/// Accept `width`x`height` only if the renderer can load it as is.
pub fn check_dimensions(width: usize, height: usize) -> Result<()> {
    match snap_dimensions(width, height) {
        Ok(snapped) if snapped == (width, height) => Ok(()),
        _ => Err(TerrainError::InvalidDimensions {
            width: width as u32,
            height: height as u32,
        }),
    }
}

/// Elevation sub-band as interpreted by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TerrainBand {
    Plains,
    Highlands,
    Mountains,
}

impl TerrainBand {
    pub fn all() -> &'static [Self] {
        &[Self::Plains, Self::Highlands, Self::Mountains]
    }

    /// Sub-band containing a land value.
    pub fn of(value: LandValue) -> Self {
        match value.get() {
            v if v <= PLAINS_MAX => Self::Plains,
            v if v <= HIGHLANDS_MAX => Self::Highlands,
            _ => Self::Mountains,
        }
    }

    /// Representative value used when painting a whole polygon in this band.
    pub fn fill_value(&self) -> LandValue {
        match self {
            Self::Plains => LandValue(150),
            Self::Highlands => LandValue(170),
            Self::Mountains => LandValue(190),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Plains => "Plains",
            Self::Highlands => "Highlands",
            Self::Mountains => "Mountains",
        }
    }
}

/// A land elevation guaranteed to lie in `LAND_LOW..=LAND_HIGH`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LandValue(u8);

impl LandValue {
    pub const LOW: LandValue = LandValue(LAND_LOW);
    pub const HIGH: LandValue = LandValue(LAND_HIGH);

    /// Round and clamp an arbitrary level into the land band.
    /// NaN lands on `LOW`.
    pub fn from_level(level: f32) -> Self {
        if level.is_nan() {
            return Self::LOW;
        }
        let clamped = level.round().clamp(LAND_LOW as f32, LAND_HIGH as f32);
        LandValue(clamped as u8)
    }

    pub fn new(value: u8) -> Self {
        LandValue(value.clamp(LAND_LOW, LAND_HIGH))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

// =============================================================================
// WATER SENTINEL
// =============================================================================

/// Fixed pixel value reserved for water.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum WaterSentinel {
    /// Opaque `(106, 106, 106)`, the renderer's water key color.
    #[default]
    Gray,
    /// Fully transparent `(0, 0, 50, 0)`.
    Transparent,
}

impl WaterSentinel {
    pub fn rgba(&self) -> [u8; 4] {
        match self {
            Self::Gray => [106, 106, 106, 255],
            Self::Transparent => [0, 0, 50, 0],
        }
    }

    pub fn blue(&self) -> u8 {
        self.rgba()[2]
    }

    pub fn is_opaque(&self) -> bool {
        self.rgba()[3] == 255
    }
}

impl std::fmt::Display for WaterSentinel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gray => write!(f, "gray"),
            Self::Transparent => write!(f, "transparent"),
        }
    }
}

// =============================================================================
// RASTER
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TerrainCell {
    #[default]
    Water,
    Land(LandValue),
}

impl TerrainCell {
    pub fn is_water(&self) -> bool {
        matches!(self, TerrainCell::Water)
    }

    pub fn land(&self) -> Option<LandValue> {
        match self {
            TerrainCell::Water => None,
            TerrainCell::Land(v) => Some(*v),
        }
    }
}

/// Final per-pixel output of either pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainRaster {
    pub cells: Tilemap<TerrainCell>,
    pub sentinel: WaterSentinel,
}

impl TerrainRaster {
    /// An all-water raster.
    pub fn water(width: usize, height: usize, sentinel: WaterSentinel) -> Self {
        Self {
            cells: Tilemap::new_with(width, height, TerrainCell::Water),
            sentinel,
        }
    }

    pub fn width(&self) -> usize {
        self.cells.width
    }

    pub fn height(&self) -> usize {
        self.cells.height
    }

    pub fn rgba(&self, x: usize, y: usize) -> [u8; 4] {
        match self.cells.get(x, y) {
            TerrainCell::Water => self.sentinel.rgba(),
            TerrainCell::Land(v) => [v.get(), v.get(), v.get(), 255],
        }
    }

    /// Gray level of every cell, water reading as the sentinel's blue channel.
    /// This is the field that smoothing filters operate on.
    pub fn levels(&self) -> Tilemap<f32> {
        let water = self.sentinel.blue() as f32;
        self.cells.map(|cell| match cell {
            TerrainCell::Water => water,
            TerrainCell::Land(v) => v.get() as f32,
        })
    }

    pub fn stats(&self) -> RasterStats {
        let mut stats = RasterStats::default();
        for (_, _, cell) in self.cells.iter() {
            match cell.land().map(TerrainBand::of) {
                None => stats.water += 1,
                Some(TerrainBand::Plains) => stats.plains += 1,
                Some(TerrainBand::Highlands) => stats.highlands += 1,
                Some(TerrainBand::Mountains) => stats.mountains += 1,
            }
        }
        stats
    }
}

/// Pixel counts per class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RasterStats {
    pub water: usize,
    pub plains: usize,
    pub highlands: usize,
    pub mountains: usize,
}

impl RasterStats {
    pub fn total(&self) -> usize {
        self.water + self.land()
    }

    pub fn land(&self) -> usize {
        self.plains + self.highlands + self.mountains
    }

    pub fn water_percent(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        100.0 * self.water as f64 / self.total() as f64
    }

    pub fn count(&self, band: TerrainBand) -> usize {
        match band {
            TerrainBand::Plains => self.plains,
            TerrainBand::Highlands => self.highlands,
            TerrainBand::Mountains => self.mountains,
        }
    }
}
