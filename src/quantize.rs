//! Quantization of normalized elevation into the renderer's land band.

use serde::{Deserialize, Serialize};

use crate::classify::Classification;
use crate::error::{Result, TerrainError};
use crate::terrain::{LandValue, TerrainCell, TerrainRaster, WaterSentinel, LAND_HIGH, LAND_LOW};
use crate::tilemap::Tilemap;

/// Bounded lift for strong edges, pushing structure toward the mountains.
///
/// An edge response `e` above `threshold` adds
/// `(e - threshold) / (255 - threshold) * max_boost`, truncated.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeBoost {
    pub threshold: f32,
    pub max_boost: f32,
}

impl Default for EdgeBoost {
    fn default() -> Self {
        Self {
            threshold: 100.0,
            max_boost: 40.0,
        }
    }
}

impl EdgeBoost {
    pub fn boost(&self, edge: f32) -> f32 {
        if edge <= self.threshold {
            return 0.0;
        }
        let strength = ((edge - self.threshold) / (255.0 - self.threshold)).min(1.0);
        (strength * self.max_boost).trunc()
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..255.0).contains(&self.threshold) || !(self.max_boost >= 0.0) {
            return Err(TerrainError::InvalidConfig(format!(
                "edge boost needs 0 <= threshold < 255 and max_boost >= 0, got {} / {}",
                self.threshold, self.max_boost
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizeParams {
    pub sentinel: WaterSentinel,
    pub edge_boost: Option<EdgeBoost>,
}

/// Level of one land pixel before clamping.
fn land_level(elevation: f32) -> f32 {
    LAND_LOW as f32 + (elevation * (LAND_HIGH - LAND_LOW) as f32).round()
}

/// Map classification plus elevation to the final raster.
///
/// `edges` is only read when `params.edge_boost` is set; clamping into the
/// band is always the last step for every land pixel.
pub fn quantize(
    classification: &Classification,
    elevation: &Tilemap<f32>,
    edges: Option<&Tilemap<f32>>,
    params: &QuantizeParams,
) -> TerrainRaster {
    let mask = &classification.mask;
    mask.assert_same_size(elevation, "quantization");
    if let Some(edges) = edges {
        mask.assert_same_size(edges, "edge boost");
    }
    let boost = params.edge_boost.zip(edges);

    let cells = Tilemap::par_from_fn(mask.width, mask.height, |x, y| {
        if !mask.get(x, y).is_land() {
            return TerrainCell::Water;
        }
        let mut level = land_level(*elevation.get(x, y));
        if let Some((rule, edges)) = boost {
            level += rule.boost(*edges.get(x, y));
        }
        TerrainCell::Land(LandValue::from_level(level))
    });

    TerrainRaster {
        cells,
        sentinel: params.sentinel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::PixelClass;

    fn classification(mask: Tilemap<PixelClass>) -> Classification {
        let land_pixels = mask.values().iter().filter(|c| c.is_land()).count();
        let water_pixels = mask.len() - land_pixels;
        Classification {
            mask,
            land_pixels,
            water_pixels,
        }
    }

    #[test]
    fn test_endpoints_and_water() {
        let mask = Tilemap::from_fn(3, 1, |x, _| if x == 1 { PixelClass::Water } else { PixelClass::Land });
        let elevation = Tilemap::from_fn(3, 1, |x, _| if x == 0 { 0.0 } else { 1.0 });
        let raster = quantize(&classification(mask), &elevation, None, &QuantizeParams::default());
        assert_eq!(raster.rgba(0, 0), [140, 140, 140, 255]);
        assert_eq!(raster.rgba(1, 0), [106, 106, 106, 255]);
        assert_eq!(raster.rgba(2, 0), [200, 200, 200, 255]);
    }

    #[test]
    fn test_overshoot_is_clamped() {
        let mask = Tilemap::new_with(4, 1, PixelClass::Land);
        let elevation = Tilemap::from_fn(4, 1, |x, _| [-0.5, 1.7, f32::NAN, 0.5][x]);
        let raster = quantize(&classification(mask), &elevation, None, &QuantizeParams::default());
        let values: Vec<u8> = raster.cells.values().iter().map(|c| c.land().unwrap().get()).collect();
        assert_eq!(values, vec![140, 200, 140, 170]);
    }

    #[test]
    fn test_edge_boost_is_bounded() {
        let mask = Tilemap::new_with(3, 1, PixelClass::Land);
        let elevation = Tilemap::new_with(3, 1, 0.9f32);
        let edges = Tilemap::from_fn(3, 1, |x, _| [50.0, 177.5, 255.0][x]);
        let params = QuantizeParams {
            edge_boost: Some(EdgeBoost::default()),
            ..Default::default()
        };
        let raster = quantize(&classification(mask), &elevation, Some(&edges), &params);
        assert_eq!(raster.cells.get(0, 0).land().unwrap().get(), 194);
        assert_eq!(raster.cells.get(1, 0).land().unwrap().get(), 200);
        assert_eq!(raster.cells.get(2, 0).land().unwrap().get(), 200);
    }

    #[test]
    fn test_boost_formula() {
        let rule = EdgeBoost::default();
        assert_eq!(rule.boost(100.0), 0.0);
        assert_eq!(rule.boost(177.5), 20.0);
        assert_eq!(rule.boost(255.0), 40.0);
        assert!(EdgeBoost { threshold: 255.0, max_boost: 1.0 }.validate().is_err());
    }

    #[test]
    fn test_every_pixel_is_sentinel_or_in_band() {
        let mask = Tilemap::from_fn(32, 32, |x, y| {
            if (x * 7 + y * 3) % 5 == 0 { PixelClass::Water } else { PixelClass::Land }
        });
        let elevation = Tilemap::from_fn(32, 32, |x, y| (x as f32 - 8.0) / 16.0 + y as f32 * 0.01);
        let edges = Tilemap::from_fn(32, 32, |x, y| ((x * y) % 256) as f32);
        let params = QuantizeParams {
            sentinel: WaterSentinel::Transparent,
            edge_boost: Some(EdgeBoost::default()),
        };
        let raster = quantize(&classification(mask), &elevation, Some(&edges), &params);
        for y in 0..32 {
            for x in 0..32 {
                let pixel = raster.rgba(x, y);
                let in_band = pixel[3] == 255
                    && pixel[0] == pixel[1]
                    && pixel[1] == pixel[2]
                    && (LAND_LOW..=LAND_HIGH).contains(&pixel[0]);
                assert!(pixel == WaterSentinel::Transparent.rgba() || in_band);
            }
        }
    }
}
