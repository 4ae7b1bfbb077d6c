use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use terrain_encoder::config::{self, PipelineConfig};
use terrain_encoder::export;
use terrain_encoder::features::FeaturePreset;
use terrain_encoder::landmass;
use terrain_encoder::pipeline::PhotoPipeline;
use terrain_encoder::quantize::EdgeBoost;
use terrain_encoder::terrain::{self, RasterStats, TerrainBand, WaterSentinel};
use terrain_encoder::Result;

#[derive(Parser, Debug)]
#[command(name = "terrain_encoder")]
#[command(about = "Encode photographs or procedural islands as terrain maps")]
struct Args {
    /// Pipeline configuration file (JSON); flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory that holds one sub-directory per map
    #[arg(long, global = true, default_value = "assets/maps")]
    maps_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a photograph into a terrain map
    Photo {
        /// Source image (jpg, png, ...)
        input: PathBuf,

        /// Map name (lowercased, spaces become underscores)
        name: String,

        /// Keep bright areas high instead of dark ones
        #[arg(long)]
        no_invert: bool,

        /// Output width in pixels (height follows the aspect ratio)
        #[arg(short = 'W', long)]
        width: Option<u32>,

        /// Keep the source resolution instead of resizing
        #[arg(long, conflicts_with = "width")]
        native_size: bool,

        /// Feature mix to derive elevation from
        #[arg(long, value_enum)]
        preset: Option<FeaturePreset>,

        /// Pixel value written for water
        #[arg(long, value_enum)]
        water: Option<WaterSentinel>,

        /// Lift land pixels whose edge response exceeds this threshold
        #[arg(long)]
        edge_boost: Option<f32>,

        /// Width of the forced ocean border (0 disables it)
        #[arg(long)]
        margin: Option<usize>,

        /// Gamma applied to normalized elevation
        #[arg(long)]
        gamma: Option<f32>,
    },

    /// Generate a procedural archipelago
    Sample {
        /// Map name
        #[arg(default_value = "rationalistrealm")]
        name: String,

        /// Width of the map in pixels (rounded down to a multiple of 4)
        #[arg(short = 'W', long, default_value = "1600")]
        width: usize,

        /// Height of the map in pixels (rounded down to a multiple of 4)
        #[arg(short = 'H', long, default_value = "1200")]
        height: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// JSON array of landmass specs to draw instead of the sample layout
        #[arg(long)]
        specs: Option<PathBuf>,
    },

    /// Print the active configuration (defaults merged with --config) as JSON
    Config,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "map generation failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = PipelineConfig::load_or_default(args.config.as_deref())?;

    match args.command {
        Command::Photo {
            input,
            name,
            no_invert,
            width,
            native_size,
            preset,
            water,
            edge_boost,
            margin,
            gamma,
        } => {
            if let Some(preset) = preset {
                config.apply_preset(preset);
            }
            if no_invert {
                config.elevation.invert = false;
                if let Some(rule) = config.classification.luminance.as_mut() {
                    rule.invert = false;
                }
            }
            if native_size {
                config.target_width = None;
            } else if width.is_some() {
                config.target_width = width;
            }
            if let Some(water) = water {
                config.quantize.sentinel = water;
            }
            if let Some(threshold) = edge_boost {
                let boost = config.quantize.edge_boost.unwrap_or_default();
                config.quantize.edge_boost = Some(EdgeBoost { threshold, ..boost });
            }
            if let Some(margin) = margin {
                config.border.margin = margin;
            }
            if let Some(gamma) = gamma {
                config.elevation.gamma = gamma;
            }
            run_photo(config, &input, &name, &args.maps_dir)
        }
        Command::Sample {
            name,
            width,
            height,
            seed,
            specs,
        } => run_sample(&config, &name, width, height, seed, specs.as_deref(), &args.maps_dir),
        Command::Config => {
            println!("{}", config.to_json_pretty()?);
            Ok(())
        }
    }
}

fn run_photo(config: PipelineConfig, input: &Path, name: &str, maps_dir: &Path) -> Result<()> {
    let slug = export::map_slug(name);
    println!("Converting {} into map '{}'", input.display(), slug);
    if config.elevation.invert {
        println!("Inverting luminance (dark -> mountains, light -> valleys)");
    }

    let pipeline = PhotoPipeline::new(config)?;
    let output = pipeline.run_file(input)?;
    let files = export::write_map(maps_dir, &slug, &output.raster)?;

    print_summary(&output.stats);
    println!("Saved terrain image to {}", files.image.display());
    println!("Saved map info to {}", files.info.display());
    print_next_steps(&slug);
    Ok(())
}

fn run_sample(
    config: &PipelineConfig,
    name: &str,
    width: usize,
    height: usize,
    seed: u64,
    specs_path: Option<&Path>,
    maps_dir: &Path,
) -> Result<()> {
    config.validate()?;
    let (width, height) = terrain::snap_dimensions(width, height)?;
    let slug = export::map_slug(name);
    println!("Generating sample map '{}' with seed: {}", slug, seed);
    println!("Map size: {}x{}", width, height);

    let specs = match specs_path {
        Some(path) => config::load_landmass_specs(path)?,
        None => landmass::sample_layout(width, height, &mut landmass::layout_rng(seed)),
    };
    let raster = landmass::generate(seed, width, height, &specs, &config.landmass)?;
    let files = export::write_map(maps_dir, &slug, &raster)?;

    print_summary(&raster.stats());
    println!("Saved to {}", files.image.display());
    print_next_steps(&slug);
    Ok(())
}

fn print_summary(stats: &RasterStats) {
    println!("Water pixels: {} ({:.1}%)", stats.water, stats.water_percent());
    for band in TerrainBand::all() {
        println!("{} pixels: {}", band.display_name(), stats.count(*band));
    }
}

fn print_next_steps(slug: &str) {
    println!("\nNext steps:");
    println!("1. Edit the image in an image editor if desired");
    println!("2. Run the map generator with --maps={}", slug);
}
