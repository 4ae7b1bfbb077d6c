//! Feature extraction: turning a source image into one scalar field.
//!
//! A `FeatureConfig` is a weighted list of strategies. Each strategy is a
//! pure transform from the grayscale field to values in `[0, 255]`; the
//! composite is their weighted sum, clamped back into that range.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};
use crate::filters;
use crate::tilemap::Tilemap;

/// Tolerance when checking that weights sum to one.
const WEIGHT_TOLERANCE: f32 = 1e-3;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureStrategy {
    /// Grayscale luma, optionally contrast-enhanced around its mean.
    Luminance {
        #[serde(default = "default_contrast")]
        contrast: f32,
    },
    /// Laplacian edge response, autocontrasted to fill `[0, 255]`.
    EdgeMagnitude,
    /// Unsharp mask emphasizing local detail.
    LocalContrast { radius: f32, percent: f32, threshold: f32 },
    /// Difference of two blurs offset by `bias`, isolating mid-frequency texture.
    MultiScaleDetail { fine_radius: f32, coarse_radius: f32, bias: f32 },
    /// Luma remapped through its cumulative histogram.
    HistogramEqualized,
}

fn default_contrast() -> f32 {
    1.0
}

impl FeatureStrategy {
    pub fn local_contrast() -> Self {
        Self::LocalContrast {
            radius: 2.0,
            percent: 150.0,
            threshold: 3.0,
        }
    }

    pub fn multi_scale_detail() -> Self {
        Self::MultiScaleDetail {
            fine_radius: 1.0,
            coarse_radius: 4.0,
            bias: 128.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Luminance { .. } => "luminance",
            Self::EdgeMagnitude => "edge_magnitude",
            Self::LocalContrast { .. } => "local_contrast",
            Self::MultiScaleDetail { .. } => "multi_scale_detail",
            Self::HistogramEqualized => "histogram_equalized",
        }
    }

    /// Apply the strategy to a grayscale field.
    pub fn apply(&self, gray: &Tilemap<f32>) -> Tilemap<f32> {
        match *self {
            Self::Luminance { contrast } => filters::enhance_contrast(gray, contrast),
            Self::EdgeMagnitude => filters::autocontrast(&filters::find_edges(gray)),
            Self::LocalContrast { radius, percent, threshold } => {
                filters::unsharp_mask(gray, radius, percent, threshold)
            }
            Self::MultiScaleDetail { fine_radius, coarse_radius, bias } => {
                filters::difference_of_gaussians(gray, fine_radius, coarse_radius, bias)
            }
            Self::HistogramEqualized => filters::equalize(gray),
        }
    }

    fn validate(&self) -> Result<()> {
        let bad = |msg: String| -> Result<()> { Err(TerrainError::InvalidConfig(msg)) };
        match *self {
            Self::Luminance { contrast } if !(contrast.is_finite() && contrast >= 0.0) => {
                bad(format!("luminance contrast must be a non-negative number, got {}", contrast))
            }
            Self::LocalContrast { radius, percent, threshold }
                if !(radius >= 0.0 && percent >= 0.0 && threshold >= 0.0) =>
            {
                bad("local_contrast radius, percent and threshold must be non-negative".to_string())
            }
            Self::MultiScaleDetail { fine_radius, coarse_radius, .. }
                if !(fine_radius >= 0.0 && coarse_radius >= 0.0) =>
            {
                bad("multi_scale_detail radii must be non-negative".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightedStrategy {
    pub weight: f32,
    pub strategy: FeatureStrategy,
}

impl WeightedStrategy {
    pub fn new(weight: f32, strategy: FeatureStrategy) -> Self {
        Self { weight, strategy }
    }
}

/// Named starting points for the strategy mix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FeaturePreset {
    /// Local contrast, mid-frequency detail and edges blended together
    #[default]
    Composite,
    /// Contrast-enhanced luma
    Luminance,
    /// Unsharp mask alone, preserving fine texture
    Detail,
    /// Histogram-flattened luma
    Equalized,
}

impl FeaturePreset {
    pub fn all() -> &'static [Self] {
        &[Self::Composite, Self::Luminance, Self::Detail, Self::Equalized]
    }

    pub fn strategies(&self) -> Vec<WeightedStrategy> {
        match self {
            Self::Composite => vec![
                WeightedStrategy::new(0.6, FeatureStrategy::local_contrast()),
                WeightedStrategy::new(0.25, FeatureStrategy::multi_scale_detail()),
                WeightedStrategy::new(0.15, FeatureStrategy::EdgeMagnitude),
            ],
            Self::Luminance => vec![WeightedStrategy::new(1.0, FeatureStrategy::Luminance { contrast: 1.5 })],
            Self::Detail => vec![WeightedStrategy::new(1.0, FeatureStrategy::local_contrast())],
            Self::Equalized => vec![WeightedStrategy::new(1.0, FeatureStrategy::HistogramEqualized)],
        }
    }
}

impl std::fmt::Display for FeaturePreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Composite => write!(f, "composite"),
            Self::Luminance => write!(f, "luminance"),
            Self::Detail => write!(f, "detail"),
            Self::Equalized => write!(f, "equalized"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub strategies: Vec<WeightedStrategy>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self::from_preset(FeaturePreset::default())
    }
}

impl FeatureConfig {
    pub fn from_preset(preset: FeaturePreset) -> Self {
        Self {
            strategies: preset.strategies(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.strategies.is_empty() {
            return Err(TerrainError::InvalidConfig("no feature strategies configured".to_string()));
        }
        let mut total = 0.0f32;
        for entry in &self.strategies {
            if !(entry.weight.is_finite() && entry.weight >= 0.0) {
                return Err(TerrainError::InvalidConfig(format!(
                    "weight for {} must be non-negative, got {}",
                    entry.strategy.name(),
                    entry.weight
                )));
            }
            entry.strategy.validate()?;
            total += entry.weight;
        }
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(TerrainError::InvalidConfig(format!(
                "feature weights must sum to 1, got {:.4}",
                total
            )));
        }
        Ok(())
    }

    /// Composite feature field for an already-grayscaled image.
    pub fn extract_from_gray(&self, gray: &Tilemap<f32>) -> Tilemap<f32> {
        let mut composite = Tilemap::new_with(gray.width, gray.height, 0.0f32);

        for entry in self.strategies.iter().filter(|e| e.weight > 0.0) {
            let field = entry.strategy.apply(gray);
            gray.assert_same_size(&field, entry.strategy.name());
            for (x, y, acc) in composite.iter_mut() {
                *acc += entry.weight * *field.get(x, y);
            }
            tracing::debug!(strategy = entry.strategy.name(), weight = entry.weight, "feature applied");
        }

        composite.map(|&v| v.clamp(0.0, 255.0))
    }

    pub fn extract(&self, image: &RgbaImage) -> Tilemap<f32> {
        self.extract_from_gray(&filters::grayscale(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_presets_validate() {
        for preset in FeaturePreset::all() {
            FeatureConfig::from_preset(*preset).validate().unwrap();
        }
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let config = FeatureConfig {
            strategies: vec![
                WeightedStrategy::new(0.5, FeatureStrategy::EdgeMagnitude),
                WeightedStrategy::new(0.2, FeatureStrategy::HistogramEqualized),
            ],
        };
        assert!(matches!(config.validate(), Err(TerrainError::InvalidConfig(_))));

        let negative = FeatureConfig {
            strategies: vec![
                WeightedStrategy::new(1.5, FeatureStrategy::EdgeMagnitude),
                WeightedStrategy::new(-0.5, FeatureStrategy::HistogramEqualized),
            ],
        };
        assert!(negative.validate().is_err());
        assert!(FeatureConfig { strategies: vec![] }.validate().is_err());
    }

    #[test]
    fn test_single_luminance_matches_grayscale() {
        let image = RgbaImage::from_fn(6, 3, |x, y| {
            let v = (x * 40 + y * 5) as u8;
            Rgba([v, v, v, 255])
        });
        let config = FeatureConfig {
            strategies: vec![WeightedStrategy::new(1.0, FeatureStrategy::Luminance { contrast: 1.0 })],
        };
        let field = config.extract(&image);
        for (x, y, &v) in field.iter() {
            assert!((v - (x * 40 + y * 5) as f32).abs() < 1e-3);
        }
    }

    #[test]
    fn test_composite_stays_in_channel_range() {
        let image = RgbaImage::from_fn(24, 24, |x, y| {
            let v = if (x / 4 + y / 4) % 2 == 0 { 10 } else { 245 };
            Rgba([v, v, v, 255])
        });
        let field = FeatureConfig::default().extract(&image);
        assert!(field.values().iter().all(|v| (0.0..=255.0).contains(v)));
    }

    #[test]
    fn test_flat_image_gives_flat_composite() {
        let image = RgbaImage::from_pixel(8, 8, Rgba([128, 128, 128, 255]));
        let field = FeatureConfig::default().extract(&image);
        let (lo, hi) = field.range().unwrap();
        assert!(hi - lo < 1e-3);
    }

    #[test]
    fn test_strategy_json_is_tagged() {
        let json = r#"{"kind": "luminance"}"#;
        let strategy: FeatureStrategy = serde_json::from_str(json).unwrap();
        assert_eq!(strategy, FeatureStrategy::Luminance { contrast: 1.0 });
        let round = serde_json::to_string(&FeatureStrategy::EdgeMagnitude).unwrap();
        assert_eq!(round, r#"{"kind":"edge_magnitude"}"#);
    }
}
