//! PNG and JSON export of generated maps.
//!
//! The PNG export paints each hex as a scaled block colored by terrain
//! and shaded by elevation, with rivers, roads, and special features
//! drawn on top. The JSON export dumps the full per-cell state for
//! downstream consumers.

use std::path::Path;

use image::{Rgb, RgbImage};
use log::info;
use serde::{Deserialize, Serialize};

use crate::cell::{CellData, SpecialFeature, TerrainType};
use crate::config::GenerationConfig;
use crate::error::GenerateError;
use crate::world::HexGrid;

/// Pixels per hex cell in the PNG export.
const CELL_PIXELS: u32 = 8;

/// Base color for a terrain type.
fn terrain_color(terrain: TerrainType) -> (u8, u8, u8) {
    match terrain {
        TerrainType::Sand => (212, 192, 140),
        TerrainType::Grass => (110, 162, 80),
        TerrainType::Mud => (92, 118, 60),
        TerrainType::Stone => (138, 132, 126),
        TerrainType::Snow => (238, 240, 245),
    }
}

/// Shade a color by elevation: higher cells render brighter.
fn shade(color: (u8, u8, u8), elevation: i32, config: &GenerationConfig) -> Rgb<u8> {
    let span = (config.max_elevation - config.water_level).max(1) as f32;
    let lift = ((elevation - config.water_level) as f32 / span).clamp(0.0, 1.0);
    let factor = 0.75 + 0.25 * lift;
    Rgb([
        (color.0 as f32 * factor) as u8,
        (color.1 as f32 * factor) as u8,
        (color.2 as f32 * factor) as u8,
    ])
}

fn water_color(elevation: i32, config: &GenerationConfig) -> Rgb<u8> {
    let depth_span = (config.water_level - config.min_elevation).max(1) as f32;
    let depth = ((config.water_level - elevation) as f32 / depth_span).clamp(0.0, 1.0);
    Rgb([
        (70.0 * (1.0 - depth * 0.5)) as u8,
        (110.0 * (1.0 - depth * 0.4)) as u8,
        (170.0 * (1.0 - depth * 0.2)) as u8,
    ])
}

fn cell_color(cell: &CellData, underwater: bool, config: &GenerationConfig) -> Rgb<u8> {
    match cell.special {
        SpecialFeature::Castle => Rgb([90, 90, 100]),
        SpecialFeature::Ziggurat => Rgb([180, 150, 90]),
        SpecialFeature::Megaflora => Rgb([60, 140, 60]),
        SpecialFeature::None => {
            if underwater {
                water_color(cell.elevation, config)
            } else if cell.has_river() {
                Rgb([80, 130, 200])
            } else if cell.roads.any() {
                Rgb([150, 120, 90])
            } else {
                shade(terrain_color(cell.terrain), cell.elevation, config)
            }
        }
    }
}

/// Export the grid as a PNG. Odd rows are shifted half a cell east to
/// match the hex layout.
pub fn export_png(grid: &HexGrid, config: &GenerationConfig, path: &Path) -> Result<(), GenerateError> {
    let image_width = grid.width as u32 * CELL_PIXELS + CELL_PIXELS / 2;
    let image_height = grid.height as u32 * CELL_PIXELS;
    let mut image = RgbImage::new(image_width, image_height);

    for row in 0..grid.height {
        let x_offset = if row % 2 == 1 { CELL_PIXELS / 2 } else { 0 };
        for col in 0..grid.width {
            let index = row * grid.width + col;
            let color = cell_color(grid.cell_at(index), !grid.is_land(index), config);
            let x0 = col as u32 * CELL_PIXELS + x_offset;
            let y0 = row as u32 * CELL_PIXELS;
            for dy in 0..CELL_PIXELS {
                for dx in 0..CELL_PIXELS {
                    image.put_pixel(x0 + dx, y0 + dy, color);
                }
            }
        }
    }

    image
        .save(path)
        .map_err(|e| GenerateError::Export(format!("{}: {}", path.display(), e)))?;
    info!("wrote PNG map to {}", path.display());
    Ok(())
}

/// Serializable dump of a generated world.
#[derive(Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub width: usize,
    pub height: usize,
    pub water_level: i32,
    pub seed: u64,
    pub cells: Vec<CellData>,
}

impl WorldSnapshot {
    pub fn from_grid(grid: &HexGrid, seed: u64) -> Self {
        Self {
            width: grid.width,
            height: grid.height,
            water_level: grid.water_level,
            seed,
            cells: grid.iter().map(|(_, cell)| *cell).collect(),
        }
    }
}

/// Export the full per-cell state as JSON.
pub fn export_json(grid: &HexGrid, seed: u64, path: &Path) -> Result<(), GenerateError> {
    let snapshot = WorldSnapshot::from_grid(grid, seed);
    let file = std::fs::File::create(path)
        .map_err(|e| GenerateError::Export(format!("{}: {}", path.display(), e)))?;
    serde_json::to_writer(std::io::BufWriter::new(file), &snapshot)
        .map_err(|e| GenerateError::Export(format!("{}: {}", path.display(), e)))?;
    info!("wrote JSON snapshot to {}", path.display());
    Ok(())
}
