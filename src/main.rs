use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;

use hexmap_generator::ascii::{self, AsciiMode};
use hexmap_generator::export;
use hexmap_generator::{GenerationConfig, HexGrid, MapGenerator, Outcome};

#[derive(Parser, Debug)]
#[command(name = "hexmap_generator")]
#[command(about = "Generate procedural hexagonal world maps")]
struct Args {
    /// Map width in cells
    #[arg(short = 'W', long, default_value = "64")]
    width: usize,

    /// Map height in cells
    #[arg(short = 'H', long, default_value = "48")]
    height: usize,

    /// Random seed (uses a random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Fraction of cells that should become land
    #[arg(short, long)]
    land_percentage: Option<f32>,

    /// JSON config file overriding default tunables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// ASCII rendering mode printed to stdout (terrain, elevation,
    /// moisture, overlay)
    #[arg(long, default_value = "overlay")]
    ascii: AsciiMode,

    /// Suppress the ASCII preview
    #[arg(long)]
    no_preview: bool,

    /// Export the ASCII rendering to a text file
    #[arg(long)]
    export_ascii: Option<PathBuf>,

    /// Export a PNG map
    #[arg(long)]
    export_png: Option<PathBuf>,

    /// Export the full per-cell state as JSON
    #[arg(long)]
    export_json: Option<PathBuf>,

    /// Run the pipeline on a background worker and poll for completion
    #[arg(long)]
    background: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => GenerationConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => GenerationConfig::default(),
    };
    if let Some(land_percentage) = args.land_percentage {
        config.land_percentage = land_percentage;
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    info!(
        "generating {}x{} map with seed {}",
        args.width, args.height, seed
    );

    let mut grid = HexGrid::new(
        args.width,
        args.height,
        config.min_elevation,
        config.water_level,
    );
    let mut generator = MapGenerator::new(config.clone());

    let outcome = if args.background {
        generator.start(args.width, args.height, seed)?;
        while !generator.is_finished() {
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        generator.finish(&mut grid)?
    } else {
        generator.generate(&mut grid, seed)?
    };

    for progress in generator.drain_progress() {
        log::debug!("{} {:.0}%", progress.stage.name(), progress.fraction * 100.0);
    }

    match outcome {
        Outcome::Complete => {}
        Outcome::Cancelled => {
            info!("generation cancelled, nothing to export");
            return Ok(());
        }
    }

    info!(
        "{} land cells of {} ({}%)",
        grid.land_cell_count(),
        grid.len(),
        grid.land_cell_count() * 100 / grid.len().max(1)
    );

    if !args.no_preview {
        print!("{}", ascii::render(&grid, args.ascii, config.max_elevation));
    }
    if let Some(path) = &args.export_ascii {
        ascii::export_to_file(&grid, args.ascii, config.max_elevation, path)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &args.export_png {
        export::export_png(&grid, &config, path)?;
    }
    if let Some(path) = &args.export_json {
        export::export_json(&grid, seed, path)?;
    }

    Ok(())
}
