//! Photograph pipeline: source image to terrain raster.
//!
//! Stages, in order:
//! 1. Classify every pixel as water or land (single pass, cached mask)
//! 2. Extract the composite feature field from the grayscale image
//! 3. Synthesize normalized elevation over the land pixels
//! 4. Quantize into the land band, water pixels get the sentinel
//! 5. Force an ocean ring along the image border

use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::border;
use crate::classify::{classify_image, Classification};
use crate::config::PipelineConfig;
use crate::elevation::{self, ElevationStats};
use crate::error::{Result, TerrainError};
use crate::filters;
use crate::quantize;
use crate::terrain::{snap_dimensions, RasterStats, TerrainRaster};

/// Read and decode a source image. RGB sources gain an opaque alpha channel.
pub fn load_source(path: &Path) -> Result<RgbaImage> {
    if !path.exists() {
        return Err(TerrainError::InputNotFound(path.to_path_buf()));
    }
    let image = image::open(path).map_err(|source| TerrainError::InputUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgba8())
}

/// Output size for a source of `width`x`height`.
///
/// With a target width the height follows the aspect ratio. Both sides are
/// then rounded down to a multiple of 4.
pub fn target_dimensions(width: u32, height: u32, target_width: Option<u32>) -> Result<(u32, u32)> {
    if width == 0 || height == 0 {
        return Err(TerrainError::InvalidDimensions { width, height });
    }
    let (w, h) = match target_width {
        Some(target) => (target, (target as f64 * height as f64 / width as f64) as u32),
        None => (width, height),
    };
    let (w, h) = snap_dimensions(w as usize, h as usize)?;
    Ok((w as u32, h as u32))
}

/// Resize (Lanczos3) or crop the source to its pipeline dimensions.
pub fn prepare_source(image: &RgbaImage, target_width: Option<u32>) -> Result<RgbaImage> {
    let (w, h) = target_dimensions(image.width(), image.height(), target_width)?;
    if target_width.is_some() && (w, h) != image.dimensions() {
        tracing::info!(from = ?image.dimensions(), to = ?(w, h), "resizing source");
        Ok(imageops::resize(image, w, h, FilterType::Lanczos3))
    } else if (w, h) != image.dimensions() {
        Ok(imageops::crop_imm(image, 0, 0, w, h).to_image())
    } else {
        Ok(image.clone())
    }
}

#[derive(Clone, Debug)]
pub struct PhotoOutput {
    pub raster: TerrainRaster,
    pub elevation: ElevationStats,
    pub stats: RasterStats,
    /// Land pixels turned to water by the border ring
    pub drowned: usize,
}

pub struct PhotoPipeline {
    config: PipelineConfig,
}

impl PhotoPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Load, size and encode the image at `path`.
    pub fn run_file(&self, path: &Path) -> Result<PhotoOutput> {
        tracing::info!(path = %path.display(), "loading source image");
        let source = load_source(path)?;
        let prepared = prepare_source(&source, self.config.target_width)?;
        self.run(&prepared)
    }

    /// Encode an image that already has its final dimensions.
    pub fn run(&self, source: &RgbaImage) -> Result<PhotoOutput> {
        let config = &self.config;

        let classification = classify_image(source, &config.classification);
        tracing::info!(
            land = classification.land_pixels,
            water = classification.water_pixels,
            land_percent = %format!("{:.1}", classification.land_fraction() * 100.0),
            "classified pixels"
        );
        ensure_land(&classification)?;

        let gray = filters::grayscale(source);
        let field = config.features.extract_from_gray(&gray);
        let elevation = elevation::synthesize(&field, &classification, &config.elevation)?;

        let edges = config
            .quantize
            .edge_boost
            .map(|_| filters::autocontrast(&filters::find_edges(&gray)));
        let mut raster = quantize::quantize(&classification, &elevation.values, edges.as_ref(), &config.quantize);

        let drowned = border::apply_edge_margin(&mut raster, &config.border);

        let stats = raster.stats();
        tracing::info!(
            water_percent = %format!("{:.1}", stats.water_percent()),
            plains = stats.plains,
            highlands = stats.highlands,
            mountains = stats.mountains,
            drowned,
            "terrain encoded"
        );

        Ok(PhotoOutput {
            raster,
            elevation: elevation.stats,
            stats,
            drowned,
        })
    }
}

fn ensure_land(classification: &Classification) -> Result<()> {
    if classification.land_pixels == 0 {
        return Err(TerrainError::EmptyLandSet {
            water_pixels: classification.water_pixels,
        });
    }
    Ok(())
}
