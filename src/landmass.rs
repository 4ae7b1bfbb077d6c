//! Procedural landmass generation for maps without a source photograph.
//!
//! Each landmass is an irregular polygon: `points` vertices evenly spaced in
//! angle around its centre, every radius perturbed by a uniform factor within
//! `±irregularity`. The polygon is painted as plains, then shrunk toward the
//! centre twice and painted as highlands and mountains, so elevation rises
//! toward the middle. Later landmasses overwrite earlier ones.
//!
//! All randomness comes from an explicitly seeded ChaCha stream, so the same
//! seed, size and specs always give the same raster.

use std::f64::consts::PI;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::border::{self, DEFAULT_BLEED_CUTOFF};
use crate::error::{Result, TerrainError};
use crate::filters;
use crate::terrain::{check_dimensions, LandValue, TerrainBand, TerrainCell, TerrainRaster, WaterSentinel};

/// Vertices on every landmass perimeter
pub const PERIMETER_POINTS: usize = 24;
/// Highland polygon as a fraction of each perturbed radius
pub const HIGHLAND_SCALE: f64 = 0.6;
/// Mountain polygon as a fraction of each perturbed radius
pub const MOUNTAIN_SCALE: f64 = 0.3;

/// Stream used for `sample_layout`, kept apart from the polygon stream.
const LAYOUT_STREAM: u64 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LandmassSpec {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
    /// Maximum relative radius perturbation (0.4 = ±40%)
    pub irregularity: f64,
    #[serde(default = "default_points")]
    pub points: usize,
}

fn default_points() -> usize {
    PERIMETER_POINTS
}

impl LandmassSpec {
    pub fn new(center_x: f64, center_y: f64, radius: f64, irregularity: f64) -> Self {
        Self {
            center_x,
            center_y,
            radius,
            irregularity,
            points: PERIMETER_POINTS,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.points < 3 {
            return Err(TerrainError::InvalidConfig(format!(
                "a landmass needs at least 3 perimeter points, got {}",
                self.points
            )));
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(TerrainError::InvalidConfig(format!("landmass radius must be positive, got {}", self.radius)));
        }
        if !(self.irregularity.is_finite() && self.irregularity >= 0.0) {
            return Err(TerrainError::InvalidConfig(format!(
                "landmass irregularity must be non-negative, got {}",
                self.irregularity
            )));
        }
        if !(self.center_x.is_finite() && self.center_y.is_finite()) {
            return Err(TerrainError::InvalidConfig("landmass centre must be finite".to_string()));
        }
        Ok(())
    }

    /// Sample the perturbed perimeter, consuming one draw per vertex.
    pub fn perimeter(&self, rng: &mut ChaCha8Rng) -> Vec<(f64, f64)> {
        (0..self.points)
            .map(|i| {
                let angle = 2.0 * PI * i as f64 / self.points as f64;
                let r = self.radius * (1.0 + rng.gen_range(-self.irregularity..=self.irregularity));
                (self.center_x + r * angle.cos(), self.center_y + r * angle.sin())
            })
            .collect()
    }

    fn scaled(&self, perimeter: &[(f64, f64)], factor: f64) -> Vec<(f64, f64)> {
        perimeter
            .iter()
            .map(|&(x, y)| {
                (
                    self.center_x + (x - self.center_x) * factor,
                    self.center_y + (y - self.center_y) * factor,
                )
            })
            .collect()
    }
}

/// Smoothing and repair settings applied after all landmasses are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorParams {
    pub blur_radius: f32,
    pub bleed_cutoff: f32,
    pub sentinel: WaterSentinel,
}

impl Default for GeneratorParams {
    fn default() -> Self {
        Self {
            blur_radius: 2.0,
            bleed_cutoff: DEFAULT_BLEED_CUTOFF,
            sentinel: WaterSentinel::Gray,
        }
    }
}

/// Ray-casting point-in-polygon test.
fn point_in_polygon(x: f64, y: f64, polygon: &[(f64, f64)]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];
        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Paint every pixel inside `polygon` with `value`, clipped to the raster.
fn fill_polygon(raster: &mut TerrainRaster, polygon: &[(f64, f64)], value: LandValue) {
    let (width, height) = (raster.width(), raster.height());
    if width == 0 || height == 0 || polygon.is_empty() {
        return;
    }

    let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
    let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
    for &(x, y) in polygon {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    if max_x < 0.0 || max_y < 0.0 || min_x > (width - 1) as f64 || min_y > (height - 1) as f64 {
        return;
    }

    let x0 = min_x.floor().max(0.0) as usize;
    let y0 = min_y.floor().max(0.0) as usize;
    let x1 = (max_x.ceil() as usize).min(width - 1);
    let y1 = (max_y.ceil() as usize).min(height - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            if point_in_polygon(x as f64, y as f64, polygon) {
                raster.cells.set(x, y, TerrainCell::Land(value));
            }
        }
    }
}

/// Paint the landmasses without smoothing. Both sides must already be
/// multiples of 4.
pub fn draw(
    seed: u64,
    width: usize,
    height: usize,
    specs: &[LandmassSpec],
    sentinel: WaterSentinel,
) -> Result<TerrainRaster> {
    check_dimensions(width, height)?;
    for spec in specs {
        spec.validate()?;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut raster = TerrainRaster::water(width, height, sentinel);

    for spec in specs {
        let perimeter = spec.perimeter(&mut rng);
        fill_polygon(&mut raster, &perimeter, TerrainBand::Plains.fill_value());
        fill_polygon(&mut raster, &spec.scaled(&perimeter, HIGHLAND_SCALE), TerrainBand::Highlands.fill_value());
        fill_polygon(&mut raster, &spec.scaled(&perimeter, MOUNTAIN_SCALE), TerrainBand::Mountains.fill_value());
    }

    Ok(raster)
}

/// Draw the landmasses, smooth the whole raster, then repair blur bleed.
pub fn generate(
    seed: u64,
    width: usize,
    height: usize,
    specs: &[LandmassSpec],
    params: &GeneratorParams,
) -> Result<TerrainRaster> {
    tracing::info!(seed, width, height, landmasses = specs.len(), "drawing landmasses");
    let raster = draw(seed, width, height, specs, params.sentinel)?;

    let smoothed = filters::gaussian_blur(&raster.levels(), params.blur_radius);
    let repaired = border::repair_bleed(&smoothed, params.bleed_cutoff, params.sentinel);

    let stats = repaired.stats();
    tracing::debug!(
        water = stats.water,
        plains = stats.plains,
        highlands = stats.highlands,
        mountains = stats.mountains,
        "landmasses smoothed"
    );
    Ok(repaired)
}

/// Generator for `sample_layout`, derived from the map seed but on its own
/// stream so layout draws never shift the polygon draws.
pub fn layout_rng(seed: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(LAYOUT_STREAM);
    rng
}

/// Inclusive range `inset` pixels inside `0..extent`, collapsing to the
/// middle on maps too small to hold it.
fn inset_range(extent: usize, inset: usize) -> (usize, usize) {
    if extent > inset * 2 {
        (inset, extent - inset)
    } else {
        (extent / 2, extent / 2)
    }
}

/// The default archipelago: a central continent, four large islands at
/// fixed relative positions and eight small islands scattered at random.
pub fn sample_layout(width: usize, height: usize, rng: &mut ChaCha8Rng) -> Vec<LandmassSpec> {
    let w = width as f64;
    let h = height as f64;

    let mut specs = vec![
        LandmassSpec::new(w * 0.5, h * 0.5, w.min(h) * 0.35, 0.4),
        LandmassSpec::new(w * 0.15, h * 0.3, 120.0, 0.5),
        LandmassSpec::new(w * 0.85, h * 0.35, 140.0, 0.45),
        LandmassSpec::new(w * 0.2, h * 0.75, 100.0, 0.5),
        LandmassSpec::new(w * 0.8, h * 0.7, 130.0, 0.4),
    ];

    let (x_lo, x_hi) = inset_range(width, 50);
    let (y_lo, y_hi) = inset_range(height, 50);
    for _ in 0..8 {
        let x = rng.gen_range(x_lo..=x_hi);
        let y = rng.gen_range(y_lo..=y_hi);
        let radius = rng.gen_range(40..=80);
        specs.push(LandmassSpec::new(x as f64, y as f64, radius as f64, 0.6));
    }

    specs
}
