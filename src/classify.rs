//! Water/land classification of source pixels.
//!
//! A pixel is water when it is mostly transparent or when its color matches
//! one of the blue-background predicates. Those decisions depend on that one
//! pixel's channels only.
//!
//! The optional luminance rule is the exception: it thresholds a smoothed
//! brightness field, so it looks at a small neighbourhood. It exists for
//! portraits shot against white or gray backdrops, where no color test helps.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::filters;
use crate::tilemap::Tilemap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PixelClass {
    #[default]
    Water,
    Land,
}

impl PixelClass {
    pub fn is_land(&self) -> bool {
        matches!(self, PixelClass::Land)
    }
}

/// Saturated blue backdrop (studio backgrounds, sky, sea).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlueBackgroundRule {
    /// Blue must exceed this
    pub min_blue: u8,
    /// Blue must exceed red by more than this
    pub blue_over_red: u8,
    /// Blue may sit at most this far below green (exclusive)
    pub green_over_blue: u8,
    /// Red must stay below this
    pub max_red: u8,
    /// Green must stay below this
    pub max_green: u8,
}

impl Default for BlueBackgroundRule {
    fn default() -> Self {
        Self {
            min_blue: 140,
            blue_over_red: 15,
            green_over_blue: 10,
            max_red: 180,
            max_green: 200,
        }
    }
}

impl BlueBackgroundRule {
    pub fn matches(&self, r: u8, g: u8, b: u8) -> bool {
        let (r, g, b) = (r as i32, g as i32, b as i32);
        b > self.min_blue as i32
            && b > r + self.blue_over_red as i32
            && b > g - self.green_over_blue as i32
            && r < self.max_red as i32
            && g < self.max_green as i32
    }
}

/// Pale, blue-dominant tones.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightBlueRule {
    pub min_blue: u8,
    pub min_red: u8,
    pub min_green: u8,
}

impl Default for LightBlueRule {
    fn default() -> Self {
        Self {
            min_blue: 180,
            min_red: 140,
            min_green: 160,
        }
    }
}

impl LightBlueRule {
    pub fn matches(&self, r: u8, g: u8, b: u8) -> bool {
        b > self.min_blue && r > self.min_red && g > self.min_green && b > r && b > g
    }
}

/// Brightness threshold over a prepared luma field.
///
/// The field is the grayscale image with its contrast enhanced, optionally
/// inverted, then blurred. Values strictly below `threshold` are water.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LuminanceWaterRule {
    pub threshold: f32,
    pub contrast: f32,
    /// Invert before thresholding, so bright backdrops read as low ground
    pub invert: bool,
    pub blur_radius: f32,
}

impl Default for LuminanceWaterRule {
    fn default() -> Self {
        Self {
            threshold: 80.0,
            contrast: 1.5,
            invert: true,
            blur_radius: 1.0,
        }
    }
}

impl LuminanceWaterRule {
    /// The field the threshold is compared against.
    pub fn prepare(&self, gray: &Tilemap<f32>) -> Tilemap<f32> {
        let enhanced = filters::enhance_contrast(gray, self.contrast);
        let oriented = if self.invert {
            enhanced.map(|&v| 255.0 - v)
        } else {
            enhanced
        };
        filters::gaussian_blur(&oriented, self.blur_radius)
    }
}

/// Named thresholds for the water heuristic. `None` disables a predicate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationRule {
    /// Alpha strictly below this is water
    pub min_opacity: u8,
    pub blue_background: Option<BlueBackgroundRule>,
    pub light_blue: Option<LightBlueRule>,
    /// Off by default
    pub luminance: Option<LuminanceWaterRule>,
}

impl Default for ClassificationRule {
    fn default() -> Self {
        Self {
            min_opacity: 50,
            blue_background: Some(BlueBackgroundRule::default()),
            light_blue: Some(LightBlueRule::default()),
            luminance: None,
        }
    }
}

impl ClassificationRule {
    pub fn classify(&self, pixel: Rgba<u8>) -> PixelClass {
        let [r, g, b, a] = pixel.0;

        let transparent = a < self.min_opacity;
        let blue_bg = self.blue_background.is_some_and(|rule| rule.matches(r, g, b));
        let light_blue = self.light_blue.is_some_and(|rule| rule.matches(r, g, b));

        if transparent || blue_bg || light_blue {
            PixelClass::Water
        } else {
            PixelClass::Land
        }
    }
}

/// Classification of a whole image, with the population counts gathered in
/// the same pass.
#[derive(Clone, Debug)]
pub struct Classification {
    pub mask: Tilemap<PixelClass>,
    pub land_pixels: usize,
    pub water_pixels: usize,
}

impl Classification {
    pub fn is_land(&self, x: usize, y: usize) -> bool {
        self.mask.get(x, y).is_land()
    }

    pub fn is_land_index(&self, idx: usize) -> bool {
        self.mask.values()[idx].is_land()
    }

    pub fn land_fraction(&self) -> f64 {
        let total = self.land_pixels + self.water_pixels;
        if total == 0 {
            return 0.0;
        }
        self.land_pixels as f64 / total as f64
    }
}

/// Classify every pixel once; later stages read the cached mask.
pub fn classify_image(image: &RgbaImage, rule: &ClassificationRule) -> Classification {
    let width = image.width() as usize;
    let height = image.height() as usize;

    let brightness = rule
        .luminance
        .map(|lum| (lum.threshold, lum.prepare(&filters::grayscale(image))));

    let mask = Tilemap::par_from_fn(width, height, |x, y| {
        if let Some((threshold, field)) = &brightness {
            if *field.get(x, y) < *threshold {
                return PixelClass::Water;
            }
        }
        rule.classify(*image.get_pixel(x as u32, y as u32))
    });
    let land_pixels = mask.values().iter().filter(|c| c.is_land()).count();
    let water_pixels = mask.len() - land_pixels;

    tracing::debug!(land_pixels, water_pixels, "classification complete");

    Classification {
        mask,
        land_pixels,
        water_pixels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(r: u8, g: u8, b: u8, a: u8) -> Rgba<u8> {
        Rgba([r, g, b, a])
    }

    #[test]
    fn test_opacity_threshold() {
        let rule = ClassificationRule::default();
        assert_eq!(rule.classify(px(128, 128, 128, 49)), PixelClass::Water);
        assert_eq!(rule.classify(px(128, 128, 128, 50)), PixelClass::Land);
    }

    #[test]
    fn test_blue_background_boundaries() {
        let rule = ClassificationRule::default();
        assert_eq!(rule.classify(px(0, 0, 255, 255)), PixelClass::Water);
        // Blue must strictly exceed 140
        assert_eq!(rule.classify(px(100, 100, 140, 255)), PixelClass::Land);
        assert_eq!(rule.classify(px(100, 100, 141, 255)), PixelClass::Water);
        // Blue must beat red by more than 15
        assert_eq!(rule.classify(px(135, 100, 150, 255)), PixelClass::Land);
        assert_eq!(rule.classify(px(134, 100, 150, 255)), PixelClass::Water);
        // Blue may trail green by less than 10
        assert_eq!(rule.classify(px(50, 160, 150, 255)), PixelClass::Land);
        assert_eq!(rule.classify(px(50, 159, 150, 255)), PixelClass::Water);
    }

    #[test]
    fn test_light_blue() {
        let rule = ClassificationRule::default();
        assert_eq!(rule.classify(px(190, 200, 230, 255)), PixelClass::Water);
        // Not blue dominant
        assert_eq!(rule.classify(px(190, 235, 230, 255)), PixelClass::Land);
    }

    #[test]
    fn test_disabled_predicates() {
        let rule = ClassificationRule {
            blue_background: None,
            light_blue: None,
            ..Default::default()
        };
        assert_eq!(rule.classify(px(0, 0, 255, 255)), PixelClass::Land);
        assert_eq!(rule.classify(px(0, 0, 255, 0)), PixelClass::Water);
    }

    fn dark_disc_on_white() -> RgbaImage {
        RgbaImage::from_fn(200, 200, |x, y| {
            let (dx, dy) = (x as i32 - 100, y as i32 - 100);
            if dx * dx + dy * dy < 60 * 60 {
                Rgba([30, 30, 30, 255])
            } else {
                Rgba([250, 250, 250, 255])
            }
        })
    }

    #[test]
    fn test_white_backdrop_needs_luminance_rule() {
        let image = dark_disc_on_white();
        let colour_only = classify_image(&image, &ClassificationRule::default());
        assert_eq!(colour_only.water_pixels, 0);

        let rule = ClassificationRule {
            luminance: Some(LuminanceWaterRule::default()),
            ..Default::default()
        };
        let classification = classify_image(&image, &rule);
        assert!(classification.is_land(100, 100));
        assert!(!classification.is_land(0, 0));
        assert!(!classification.is_land(199, 100));
        assert!(classification.water_pixels > 40000 / 2);
        assert!(classification.land_pixels > 0);
    }

    #[test]
    fn test_luminance_field_is_inverted() {
        let gray = Tilemap::from_fn(2, 1, |x, _| if x == 0 { 20.0 } else { 240.0 });
        let rule = LuminanceWaterRule {
            contrast: 1.0,
            blur_radius: 0.0,
            ..Default::default()
        };
        assert_eq!(rule.prepare(&gray).values(), &[235.0, 15.0]);

        let upright = LuminanceWaterRule { invert: false, ..rule };
        assert_eq!(upright.prepare(&gray).values(), &[20.0, 240.0]);
    }

    #[test]
    fn test_classification_is_position_independent() {
        let rule = ClassificationRule::default();
        let image = RgbaImage::from_fn(16, 16, |x, y| {
            let v = ((x * 16 + y) % 256) as u8;
            Rgba([v, v.wrapping_mul(3), 255 - v, 255])
        });
        let first = classify_image(&image, &rule);
        let second = classify_image(&image, &rule);
        assert_eq!(first.mask, second.mask);
        for (x, y, class) in first.mask.iter() {
            assert_eq!(*class, rule.classify(*image.get_pixel(x as u32, y as u32)));
        }
        assert_eq!(first.land_pixels + first.water_pixels, 256);
    }
}
