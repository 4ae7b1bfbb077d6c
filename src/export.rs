//! Writing terrain rasters and their map directory.
//!
//! A map lives in `<root>/<slug>/` as `image.png` plus an `info.json`
//! sidecar carrying the same width and height as the image.

use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageBuffer, Rgb, RgbImage, Rgba, RgbaImage};
use serde::Serialize;

use crate::error::{Result, TerrainError};
use crate::terrain::TerrainRaster;

/// Encode a raster as an image.
///
/// The gray sentinel gives an RGB image; the transparent sentinel needs the
/// alpha channel and gives RGBA.
pub fn to_image(raster: &TerrainRaster) -> DynamicImage {
    let (width, height) = (raster.width() as u32, raster.height() as u32);
    if raster.sentinel.is_opaque() {
        let img: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
            let [r, g, b, _] = raster.rgba(x as usize, y as usize);
            Rgb([r, g, b])
        });
        DynamicImage::ImageRgb8(img)
    } else {
        let img: RgbaImage = ImageBuffer::from_fn(width, height, |x, y| Rgba(raster.rgba(x as usize, y as usize)));
        DynamicImage::ImageRgba8(img)
    }
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| TerrainError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Save a raster as a lossless PNG, creating parent directories.
pub fn save_png(raster: &TerrainRaster, path: &Path) -> Result<()> {
    create_parent(path)?;
    to_image(raster)
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|source| TerrainError::Encode {
            path: path.to_path_buf(),
            source,
        })
}

/// Normalize a user-supplied map name: lowercase, spaces and hyphens to
/// underscores.
pub fn map_slug(name: &str) -> String {
    name.to_lowercase().replace([' ', '-'], "_")
}

/// Display name for a slug: every letter run title-cased, underscores dropped.
/// `"julie_land"` becomes `"JulieLand"`.
pub fn display_name(slug: &str) -> String {
    let mut out = String::with_capacity(slug.len());
    let mut prev_letter = false;
    for c in slug.chars() {
        if c.is_alphabetic() {
            if prev_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_letter = true;
        } else {
            prev_letter = false;
            if c != '_' {
                out.push(c);
            }
        }
    }
    out
}

/// Sidecar descriptor written next to the image. Spawn placement is left to
/// the map author, so `nations` starts empty.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MapInfo {
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub nations: Vec<serde_json::Value>,
}

impl MapInfo {
    pub fn for_raster(slug: &str, raster: &TerrainRaster) -> Self {
        Self {
            name: display_name(slug),
            width: raster.width(),
            height: raster.height(),
            nations: Vec::new(),
        }
    }
}

/// Paths of a written map directory.
#[derive(Clone, Debug)]
pub struct MapFiles {
    pub dir: PathBuf,
    pub image: PathBuf,
    pub info: PathBuf,
}

/// Write `image.png` and `info.json` for `raster` under `root/<slug>/`.
///
/// The sidecar is serialized before anything touches the disk, and the image
/// is removed again if the sidecar cannot be written.
pub fn write_map(root: &Path, slug: &str, raster: &TerrainRaster) -> Result<MapFiles> {
    let dir = root.join(slug);
    let image = dir.join("image.png");
    let info = dir.join("info.json");

    let json = serde_json::to_string_pretty(&MapInfo::for_raster(slug, raster))?;
    save_png(raster, &image)?;

    if let Err(source) = fs::write(&info, json) {
        fs::remove_file(&image).ok();
        return Err(TerrainError::Io { path: info, source });
    }

    tracing::info!(dir = %dir.display(), "map written");
    Ok(MapFiles { dir, image, info })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{LandValue, TerrainCell, WaterSentinel};

    fn sample_raster(sentinel: WaterSentinel) -> TerrainRaster {
        let mut raster = TerrainRaster::water(8, 4, sentinel);
        raster.cells.set(3, 2, TerrainCell::Land(LandValue::new(155)));
        raster.cells.set(4, 2, TerrainCell::Land(LandValue::HIGH));
        raster
    }

    #[test]
    fn test_names() {
        assert_eq!(map_slug("Julie Land-2"), "julie_land_2");
        assert_eq!(display_name("julie_land"), "JulieLand");
        assert_eq!(display_name("map2go"), "Map2Go");
    }

    #[test]
    fn test_png_round_trip_gray() {
        let raster = sample_raster(WaterSentinel::Gray);
        let path = std::env::temp_dir().join("terrain_encoder_test_gray.png");
        save_png(&raster, &path).unwrap();

        let decoded = image::open(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(matches!(decoded, DynamicImage::ImageRgb8(_)));
        let rgb = decoded.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0, [106, 106, 106]);
        assert_eq!(rgb.get_pixel(3, 2).0, [155, 155, 155]);
        assert_eq!(rgb.get_pixel(4, 2).0, [200, 200, 200]);
    }

    #[test]
    fn test_png_round_trip_transparent() {
        let raster = sample_raster(WaterSentinel::Transparent);
        let path = std::env::temp_dir().join("terrain_encoder_test_transparent.png");
        save_png(&raster, &path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        std::fs::remove_file(&path).ok();
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 50, 0]);
        assert_eq!(decoded.get_pixel(3, 2).0, [155, 155, 155, 255]);
    }

    #[test]
    fn test_write_map_directory() {
        let root = std::env::temp_dir().join("terrain_encoder_test_maps");
        let raster = sample_raster(WaterSentinel::Gray);
        let files = write_map(&root, "test_island", &raster).unwrap();

        assert!(files.image.exists());
        let info: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&files.info).unwrap()).unwrap();
        std::fs::remove_dir_all(&root).ok();

        assert_eq!(info["name"], "TestIsland");
        assert_eq!(info["width"], 8);
        assert_eq!(info["height"], 4);
        assert_eq!(info["nations"].as_array().map(|a| a.len()), Some(0));
    }

    #[test]
    fn test_failed_sidecar_leaves_no_image() {
        let root = std::env::temp_dir().join("terrain_encoder_test_maps_blocked");
        // A directory where the sidecar should go makes the write fail
        std::fs::create_dir_all(root.join("blocked").join("info.json")).unwrap();

        let result = write_map(&root, "blocked", &sample_raster(WaterSentinel::Gray));
        let image_left = root.join("blocked").join("image.png").exists();
        std::fs::remove_dir_all(&root).ok();

        assert!(matches!(result, Err(TerrainError::Io { .. })));
        assert!(!image_left);
    }
}
