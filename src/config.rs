//! Pipeline configuration, loadable from JSON.
//!
//! Every section uses `#[serde(default)]`, so a file only needs the keys it
//! wants to change:
//!
//! ```json
//! { "elevation": { "gamma": 0.8 }, "border": { "margin": 0 } }
//! ```

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::border::BorderParams;
use crate::classify::{ClassificationRule, LuminanceWaterRule};
use crate::elevation::ElevationParams;
use crate::error::{Result, TerrainError};
use crate::features::{FeatureConfig, FeaturePreset};
use crate::landmass::{GeneratorParams, LandmassSpec};
use crate::quantize::{EdgeBoost, QuantizeParams};

/// Default output width for photographs, in pixels.
pub const DEFAULT_TARGET_WIDTH: u32 = 1600;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Resize photographs to this width before processing. `None` keeps the
    /// source size (still cropped to multiples of 4).
    pub target_width: Option<u32>,
    pub classification: ClassificationRule,
    pub features: FeatureConfig,
    pub elevation: ElevationParams,
    pub quantize: QuantizeParams,
    pub border: BorderParams,
    /// Smoothing and repair for procedurally generated maps
    pub landmass: GeneratorParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_width: Some(DEFAULT_TARGET_WIDTH),
            classification: ClassificationRule::default(),
            features: FeatureConfig::default(),
            elevation: ElevationParams::default(),
            quantize: QuantizeParams::default(),
            border: BorderParams::default(),
            landmass: GeneratorParams::default(),
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|source| TerrainError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| TerrainError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a JSON array of landmass specs.
pub fn load_landmass_specs(path: &Path) -> Result<Vec<LandmassSpec>> {
    let specs: Vec<LandmassSpec> = read_json(path)?;
    for spec in &specs {
        spec.validate()?;
    }
    tracing::info!(path = %path.display(), count = specs.len(), "landmass specs loaded");
    Ok(specs)
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let config: PipelineConfig = read_json(path)?;
        tracing::info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Switch the feature mix to `preset`, together with the edge boost,
    /// brightness water rule and smoothing that preset is tuned for.
    pub fn apply_preset(&mut self, preset: FeaturePreset) {
        self.features = FeatureConfig::from_preset(preset);
        let luminance = preset == FeaturePreset::Luminance;
        self.classification.luminance = luminance.then(LuminanceWaterRule::default);
        self.elevation.smoothing = if luminance { 1.0 } else { 0.0 };
        self.quantize.edge_boost = match preset {
            FeaturePreset::Composite | FeaturePreset::Equalized => None,
            FeaturePreset::Luminance => Some(EdgeBoost::default()),
            FeaturePreset::Detail => Some(EdgeBoost {
                threshold: 80.0,
                max_boost: 25.0,
            }),
        };
    }

    /// Load `path` when given, otherwise fall back to the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(width) = self.target_width {
            if width < 4 {
                return Err(TerrainError::InvalidConfig(format!(
                    "target_width must be at least 4, got {}",
                    width
                )));
            }
        }
        if let Some(rule) = &self.classification.luminance {
            if !(rule.contrast >= 0.0 && rule.blur_radius >= 0.0 && rule.threshold.is_finite()) {
                return Err(TerrainError::InvalidConfig(format!(
                    "luminance water rule needs non-negative contrast and blur_radius, got {} / {}",
                    rule.contrast, rule.blur_radius
                )));
            }
        }
        self.features.validate()?;
        self.elevation.validate()?;
        self.border.validate()?;
        if let Some(boost) = &self.quantize.edge_boost {
            boost.validate()?;
        }
        if !(self.landmass.blur_radius.is_finite() && self.landmass.blur_radius >= 0.0) {
            return Err(TerrainError::InvalidConfig(format!(
                "landmass blur_radius must be non-negative, got {}",
                self.landmass.blur_radius
            )));
        }
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
