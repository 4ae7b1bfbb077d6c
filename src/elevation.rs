//! Elevation synthesis: feature field to normalized elevation in `[0, 1]`.
//!
//! 1. Optional Gaussian smoothing of the feature field
//! 2. Optional inversion (`255 - v`), so darker source reads as higher ground
//! 3. Empirical stretch against the land-pixel min/max
//! 4. Gamma re-curve
//!
//! Water pixels never take part in the stretch and read as 0.0 in the output.

use serde::{Deserialize, Serialize};

use crate::classify::Classification;
use crate::error::{Result, TerrainError};
use crate::filters;
use crate::tilemap::Tilemap;

/// Normalized value given to every land pixel when the land population is
/// perfectly flat.
pub const DEGENERATE_LEVEL: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevationParams {
    /// Darker source pixels become higher terrain
    pub invert: bool,
    /// Rescale so the lowest land value maps to 0 and the highest to 1
    pub stretch: bool,
    /// Exponent applied after normalization. Below 1 lifts mid-tones.
    pub gamma: f32,
    /// Gaussian sigma applied to the feature field first. 0 disables it.
    pub smoothing: f32,
}

impl Default for ElevationParams {
    fn default() -> Self {
        Self {
            invert: true,
            stretch: true,
            gamma: 0.9,
            smoothing: 0.0,
        }
    }
}

impl ElevationParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(TerrainError::InvalidConfig(format!(
                "gamma must be a positive number, got {}",
                self.gamma
            )));
        }
        if !(self.smoothing.is_finite() && self.smoothing >= 0.0) {
            return Err(TerrainError::InvalidConfig(format!(
                "smoothing must be non-negative, got {}",
                self.smoothing
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElevationStats {
    pub land_pixels: usize,
    /// Land minimum after inversion, before stretching
    pub min: f32,
    pub max: f32,
    /// The land population was flat and got the midpoint level
    pub degenerate: bool,
}

#[derive(Clone, Debug)]
pub struct NormalizedElevation {
    pub values: Tilemap<f32>,
    pub stats: ElevationStats,
}

/// Turn a feature field into normalized elevation over the land pixels of
/// `classification`.
pub fn synthesize(
    field: &Tilemap<f32>,
    classification: &Classification,
    params: &ElevationParams,
) -> Result<NormalizedElevation> {
    field.assert_same_size(&classification.mask, "elevation synthesis");

    if classification.land_pixels == 0 {
        return Err(TerrainError::EmptyLandSet {
            water_pixels: classification.water_pixels,
        });
    }

    let smoothed = filters::gaussian_blur(field, params.smoothing);
    let adjusted = if params.invert {
        smoothed.map(|&v| 255.0 - v)
    } else {
        smoothed
    };

    let (min, max) = adjusted
        .range_where(|idx| classification.is_land_index(idx))
        .ok_or(TerrainError::EmptyLandSet {
            water_pixels: classification.water_pixels,
        })?;
    let range = max - min;
    let degenerate = params.stretch && range <= f32::EPSILON;

    if degenerate {
        tracing::warn!(value = min, "land feature range is flat, using midpoint elevation");
    }

    let gamma = params.gamma;
    let values = Tilemap::par_from_fn(field.width, field.height, |x, y| {
        if !classification.is_land(x, y) {
            return 0.0;
        }
        let v = *adjusted.get(x, y);
        let normalized = if !params.stretch {
            v / 255.0
        } else if degenerate {
            DEGENERATE_LEVEL
        } else {
            (v - min) / range
        };
        normalized.clamp(0.0, 1.0).powf(gamma)
    });

    let stats = ElevationStats {
        land_pixels: classification.land_pixels,
        min,
        max,
        degenerate,
    };
    tracing::debug!(min, max, degenerate, land_pixels = stats.land_pixels, "elevation synthesized");

    Ok(NormalizedElevation { values, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::PixelClass;

    fn all_land(width: usize, height: usize) -> Classification {
        Classification {
            mask: Tilemap::new_with(width, height, PixelClass::Land),
            land_pixels: width * height,
            water_pixels: 0,
        }
    }

    fn no_invert() -> ElevationParams {
        ElevationParams {
            invert: false,
            gamma: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_stretch_hits_both_ends() {
        let field = Tilemap::from_fn(5, 1, |x, _| 100.0 + x as f32 * 5.0);
        let elevation = synthesize(&field, &all_land(5, 1), &no_invert()).unwrap();
        assert_eq!(*elevation.values.get(0, 0), 0.0);
        assert_eq!(*elevation.values.get(4, 0), 1.0);
        assert!((elevation.values.get(2, 0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_water_is_excluded_from_stretch() {
        let field = Tilemap::from_fn(4, 1, |x, _| [0.0, 100.0, 200.0, 255.0][x]);
        let mut classification = all_land(4, 1);
        classification.mask.set(0, 0, PixelClass::Water);
        classification.mask.set(3, 0, PixelClass::Water);
        classification.land_pixels = 2;
        classification.water_pixels = 2;

        let elevation = synthesize(&field, &classification, &no_invert()).unwrap();
        assert_eq!(elevation.stats.min, 100.0);
        assert_eq!(elevation.stats.max, 200.0);
        assert_eq!(*elevation.values.get(1, 0), 0.0);
        assert_eq!(*elevation.values.get(2, 0), 1.0);
        assert_eq!(*elevation.values.get(3, 0), 0.0);
    }

    #[test]
    fn test_inversion_reverses_order() {
        let field = Tilemap::from_fn(3, 1, |x, _| x as f32 * 50.0);
        let elevation = synthesize(&field, &all_land(3, 1), &ElevationParams::default()).unwrap();
        assert_eq!(*elevation.values.get(0, 0), 1.0);
        assert_eq!(*elevation.values.get(2, 0), 0.0);
        assert!(elevation.values.get(1, 0) > &0.5);
    }

    #[test]
    fn test_gamma_is_monotonic() {
        let field = Tilemap::from_fn(32, 1, |x, _| (x * 8) as f32);
        let params = ElevationParams {
            invert: false,
            gamma: 0.9,
            ..Default::default()
        };
        let elevation = synthesize(&field, &all_land(32, 1), &params).unwrap();
        let values = elevation.values.values();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_flat_field_uses_midpoint() {
        let field = Tilemap::new_with(4, 4, 108.8f32);
        let elevation = synthesize(&field, &all_land(4, 4), &ElevationParams::default()).unwrap();
        assert!(elevation.stats.degenerate);
        let expected = DEGENERATE_LEVEL.powf(0.9);
        assert!(elevation.values.values().iter().all(|v| (v - expected).abs() < 1e-6));
    }

    #[test]
    fn test_without_stretch_uses_absolute_scale() {
        let field = Tilemap::from_fn(2, 1, |x, _| if x == 0 { 51.0 } else { 102.0 });
        let params = ElevationParams {
            stretch: false,
            ..no_invert()
        };
        let elevation = synthesize(&field, &all_land(2, 1), &params).unwrap();
        assert!((elevation.values.get(0, 0) - 0.2).abs() < 1e-6);
        assert!((elevation.values.get(1, 0) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_empty_land_is_an_error() {
        let field = Tilemap::new_with(3, 3, 10.0f32);
        let classification = Classification {
            mask: Tilemap::new_with(3, 3, PixelClass::Water),
            land_pixels: 0,
            water_pixels: 9,
        };
        let result = synthesize(&field, &classification, &ElevationParams::default());
        assert!(matches!(result, Err(TerrainError::EmptyLandSet { water_pixels: 9 })));
    }

    #[test]
    fn test_smoothing_softens_a_spike() {
        let mut field = Tilemap::new_with(9, 9, 0.0f32);
        field.set(4, 4, 255.0);
        field.set(0, 0, 100.0);
        let sharp = synthesize(&field, &all_land(9, 9), &no_invert()).unwrap();
        let params = ElevationParams {
            smoothing: 1.0,
            ..no_invert()
        };
        let smooth = synthesize(&field, &all_land(9, 9), &params).unwrap();

        // Both stretch to the full range, but the blurred spike has shoulders
        assert_eq!(*sharp.values.get(5, 4), 0.0);
        assert!(*smooth.values.get(5, 4) > 0.0);
        assert_eq!(*smooth.values.get(4, 4), 1.0);
        assert!(smooth.stats.max < 255.0);

        let negative = ElevationParams {
            smoothing: -1.0,
            ..Default::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_gamma_must_be_positive() {
        let params = ElevationParams {
            gamma: 0.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
        assert!(ElevationParams::default().validate().is_ok());
    }
}
