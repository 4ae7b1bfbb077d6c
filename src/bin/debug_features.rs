//! Debug tool for comparing feature strategies visually
//! Renders every strategy, each preset's blend and the encoded terrain side by side

use std::path::PathBuf;

use clap::Parser;
use image::{ImageBuffer, Rgb, RgbImage};
use terrain_encoder::config::PipelineConfig;
use terrain_encoder::features::{FeatureConfig, FeaturePreset, FeatureStrategy};
use terrain_encoder::pipeline::{self, PhotoPipeline};
use terrain_encoder::terrain::TerrainCell;
use terrain_encoder::tilemap::Tilemap;
use terrain_encoder::{filters, TerrainError};

#[derive(Parser, Debug)]
#[command(about = "Render a comparison grid of elevation feature strategies")]
struct Args {
    /// Source image
    input: PathBuf,

    /// Output grid image
    #[arg(short, long, default_value = "feature_comparison.png")]
    output: PathBuf,

    /// Width each tile is resized to
    #[arg(short = 'W', long, default_value = "400")]
    width: u32,
}

const COLS: usize = 4;

fn main() {
    let args = Args::parse();

    println!("Loading {}...", args.input.display());
    let source = pipeline::load_source(&args.input).expect("Failed to load source image");
    let source = pipeline::prepare_source(&source, Some(args.width)).expect("Failed to resize source image");
    let gray = filters::grayscale(&source);

    let strategies = [
        FeatureStrategy::Luminance { contrast: 1.0 },
        FeatureStrategy::EdgeMagnitude,
        FeatureStrategy::local_contrast(),
        FeatureStrategy::multi_scale_detail(),
        FeatureStrategy::HistogramEqualized,
    ];

    let mut tiles: Vec<(String, RgbImage)> = Vec::new();
    for strategy in &strategies {
        println!("  Processing: {}", strategy.name());
        tiles.push((strategy.name().to_string(), field_to_image(&strategy.apply(&gray))));
    }
    for preset in FeaturePreset::all() {
        println!("  Processing: {} blend", preset);
        let field = FeatureConfig::from_preset(*preset).extract_from_gray(&gray);
        tiles.push((format!("{} blend", preset), field_to_image(&field)));
    }

    println!("  Processing: terrain");
    let config = PipelineConfig {
        target_width: None,
        ..Default::default()
    };
    let encoder = PhotoPipeline::new(config).expect("Default config is valid");
    match encoder.run(&source) {
        Ok(output) => tiles.push(("terrain".to_string(), terrain_to_image(&output.raster.cells))),
        Err(TerrainError::EmptyLandSet { water_pixels }) => {
            println!("  Skipping terrain: all {} pixels classified as water", water_pixels)
        }
        Err(err) => panic!("Failed to encode terrain: {}", err),
    }

    let rows = tiles.len().div_ceil(COLS);
    let grid = create_grid(&tiles, COLS, rows);
    grid.save(&args.output).expect("Failed to save grid");

    println!("Saved {}", args.output.display());
    println!("Tile order (left to right, top to bottom):");
    for (idx, (name, _)) in tiles.iter().enumerate() {
        println!("  {}. {}", idx + 1, name);
    }
}

fn field_to_image(field: &Tilemap<f32>) -> RgbImage {
    ImageBuffer::from_fn(field.width as u32, field.height as u32, |x, y| {
        let v = field.get(x as usize, y as usize).clamp(0.0, 255.0) as u8;
        Rgb([v, v, v])
    })
}

// Water drawn dark blue so coastlines stand out against the band
fn terrain_to_image(cells: &Tilemap<TerrainCell>) -> RgbImage {
    ImageBuffer::from_fn(cells.width as u32, cells.height as u32, |x, y| {
        match cells.get(x as usize, y as usize).land() {
            Some(v) => Rgb([v.get(), v.get(), v.get()]),
            None => Rgb([20, 40, 90]),
        }
    })
}

fn create_grid(images: &[(String, RgbImage)], cols: usize, rows: usize) -> RgbImage {
    if images.is_empty() {
        return ImageBuffer::new(1, 1);
    }

    let cell_width = images[0].1.width();
    let cell_height = images[0].1.height();
    let gap = 4u32;

    let grid_width = (cell_width + gap) * cols as u32 + gap;
    let grid_height = (cell_height + gap) * rows as u32 + gap;

    let mut grid: RgbImage = ImageBuffer::from_pixel(grid_width, grid_height, Rgb([40, 40, 40]));

    for (idx, (_, img)) in images.iter().enumerate() {
        let col = idx % cols;
        let row = idx / cols;
        if row >= rows {
            break;
        }

        let x_offset = gap + col as u32 * (cell_width + gap);
        let y_offset = gap + row as u32 * (cell_height + gap);

        for (x, y, pixel) in img.enumerate_pixels() {
            if x < cell_width && y < cell_height {
                grid.put_pixel(x_offset + x, y_offset + y, *pixel);
            }
        }
    }

    grid
}
