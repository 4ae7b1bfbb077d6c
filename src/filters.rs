//! Image-space filters over scalar fields in `[0, 255]`.
//!
//! Each filter reads its input as read-only and writes a fresh grid, so every
//! output cell can be computed independently on the rayon pool. Reads past the
//! image border are clamped to the edge.

use image::RgbaImage;

use crate::tilemap::Tilemap;

/// ITU-R 601-2 luma, the usual `L` conversion. Alpha is ignored.
pub fn grayscale(image: &RgbaImage) -> Tilemap<f32> {
    Tilemap::par_from_fn(image.width() as usize, image.height() as usize, |x, y| {
        let [r, g, b, _] = image.get_pixel(x as u32, y as u32).0;
        (r as f32 * 299.0 + g as f32 * 587.0 + b as f32 * 114.0) / 1000.0
    })
}

fn clamp_channel(v: f32) -> f32 {
    v.clamp(0.0, 255.0)
}

/// Normalized 1D Gaussian weights covering three standard deviations.
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as isize;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for w in kernel.iter_mut() {
        *w /= sum;
    }
    kernel
}

/// Separable Gaussian blur with standard deviation `sigma` pixels.
/// A non-positive sigma returns the field unchanged.
pub fn gaussian_blur(field: &Tilemap<f32>, sigma: f32) -> Tilemap<f32> {
    if sigma <= 0.0 || field.is_empty() {
        return field.clone();
    }

    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;

    let horizontal = Tilemap::par_from_fn(field.width, field.height, |x, y| {
        kernel
            .iter()
            .enumerate()
            .map(|(k, w)| w * field.get_clamped(x as isize + k as isize - radius, y as isize))
            .sum::<f32>()
    });

    Tilemap::par_from_fn(field.width, field.height, |x, y| {
        kernel
            .iter()
            .enumerate()
            .map(|(k, w)| w * horizontal.get_clamped(x as isize, y as isize + k as isize - radius))
            .sum::<f32>()
    })
}

/// 3x3 Laplacian edge response (`8` at the centre, `-1` around it), with
/// negative responses cut to zero.
pub fn find_edges(field: &Tilemap<f32>) -> Tilemap<f32> {
    Tilemap::par_from_fn(field.width, field.height, |x, y| {
        let (cx, cy) = (x as isize, y as isize);
        let mut sum = 0.0f32;
        for dy in -1..=1 {
            for dx in -1..=1 {
                let v = *field.get_clamped(cx + dx, cy + dy);
                sum += if dx == 0 && dy == 0 { 8.0 * v } else { -v };
            }
        }
        clamp_channel(sum)
    })
}

/// Stretch the field so its minimum becomes 0 and its maximum 255.
/// A flat field is returned unchanged.
pub fn autocontrast(field: &Tilemap<f32>) -> Tilemap<f32> {
    let Some((lo, hi)) = field.range() else {
        return field.clone();
    };
    let range = hi - lo;
    if range <= f32::EPSILON {
        return field.clone();
    }
    field.map(|&v| (v - lo) * 255.0 / range)
}

/// Blend every value with the field mean: `factor > 1` widens contrast,
/// `factor < 1` flattens it.
pub fn enhance_contrast(field: &Tilemap<f32>, factor: f32) -> Tilemap<f32> {
    if (factor - 1.0).abs() <= f32::EPSILON {
        return field.clone();
    }
    let mean = field.mean();
    field.map(|&v| clamp_channel(mean + (v - mean) * factor))
}

/// Unsharp mask: add back `percent`% of the difference between the field
/// and its blur, wherever that difference exceeds `threshold`.
pub fn unsharp_mask(field: &Tilemap<f32>, radius: f32, percent: f32, threshold: f32) -> Tilemap<f32> {
    let blurred = gaussian_blur(field, radius);
    let amount = percent / 100.0;
    Tilemap::par_from_fn(field.width, field.height, |x, y| {
        let v = *field.get(x, y);
        let diff = v - *blurred.get(x, y);
        if diff.abs() > threshold {
            clamp_channel(v + diff * amount)
        } else {
            v
        }
    })
}

/// Difference of two Gaussian blurs re-centred on `bias`, isolating the band
/// of detail between the two radii.
pub fn difference_of_gaussians(field: &Tilemap<f32>, fine: f32, coarse: f32, bias: f32) -> Tilemap<f32> {
    let fine_blur = gaussian_blur(field, fine);
    let coarse_blur = gaussian_blur(field, coarse);
    Tilemap::par_from_fn(field.width, field.height, |x, y| {
        clamp_channel(*fine_blur.get(x, y) - *coarse_blur.get(x, y) + bias)
    })
}

/// Histogram equalization over 256 bins.
pub fn equalize(field: &Tilemap<f32>) -> Tilemap<f32> {
    let bin = |v: f32| clamp_channel(v).round() as usize;

    let mut histogram = [0usize; 256];
    for &v in field.values() {
        histogram[bin(v)] += 1;
    }

    let mut cdf = [0usize; 256];
    let mut running = 0;
    for (i, count) in histogram.iter().enumerate() {
        running += count;
        cdf[i] = running;
    }

    let total = field.len();
    let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0);
    if total <= cdf_min {
        // Single populated bin, nothing to spread.
        return field.clone();
    }
    let span = (total - cdf_min) as f32;

    field.map(|&v| (cdf[bin(v)] - cdf_min) as f32 * 255.0 / span)
}
