//! ASCII rendering and export for generated maps.
//!
//! Renders the live grid as text, offsetting odd rows by one column so
//! the hex layout reads correctly in a terminal.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::cell::{SpecialFeature, TerrainType};
use crate::world::HexGrid;

/// ASCII rendering modes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AsciiMode {
    /// Terrain type characters
    Terrain,
    /// Elevation gradient
    Elevation,
    /// Moisture gradient
    Moisture,
    /// Terrain with rivers, roads, and features drawn on top
    Overlay,
}

impl AsciiMode {
    pub fn name(&self) -> &'static str {
        match self {
            AsciiMode::Terrain => "Terrain",
            AsciiMode::Elevation => "Elevation",
            AsciiMode::Moisture => "Moisture",
            AsciiMode::Overlay => "Overlay",
        }
    }

    pub fn all() -> &'static [AsciiMode] {
        &[
            AsciiMode::Terrain,
            AsciiMode::Elevation,
            AsciiMode::Moisture,
            AsciiMode::Overlay,
        ]
    }
}

impl std::str::FromStr for AsciiMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "terrain" => Ok(AsciiMode::Terrain),
            "elevation" => Ok(AsciiMode::Elevation),
            "moisture" => Ok(AsciiMode::Moisture),
            "overlay" => Ok(AsciiMode::Overlay),
            other => Err(format!("unknown ascii mode '{}'", other)),
        }
    }
}

/// Get ASCII character for a terrain type
pub fn terrain_char(terrain: TerrainType, underwater: bool) -> char {
    if underwater {
        return '~';
    }
    match terrain {
        TerrainType::Sand => '.',
        TerrainType::Grass => '"',
        TerrainType::Mud => 'm',
        TerrainType::Stone => '^',
        TerrainType::Snow => '#',
    }
}

/// Get ASCII character for an elevation gradient position
fn elevation_char(elevation: i32, water_level: i32, max_elevation: i32) -> char {
    if elevation < water_level {
        return '~';
    }
    const RAMP: &[u8] = b".:-=+*%@";
    let span = (max_elevation - water_level).max(1);
    let step = ((elevation - water_level) * (RAMP.len() as i32 - 1) / span)
        .clamp(0, RAMP.len() as i32 - 1);
    RAMP[step as usize] as char
}

/// Get ASCII character for a moisture gradient position
fn moisture_char(moisture: f32) -> char {
    const RAMP: &[u8] = b" .:!|#";
    let step = ((moisture * RAMP.len() as f32) as usize).min(RAMP.len() - 1);
    RAMP[step] as char
}

/// Character for a cell in overlay mode: features and water routes win
/// over base terrain.
fn overlay_char(grid: &HexGrid, index: usize) -> char {
    let cell = grid.cell_at(index);
    match cell.special {
        SpecialFeature::Castle => 'C',
        SpecialFeature::Ziggurat => 'Z',
        SpecialFeature::Megaflora => 'M',
        SpecialFeature::None => {
            if cell.has_river() {
                '~'
            } else if cell.roads.any() {
                '+'
            } else if cell.urban_level > 0 {
                char::from_digit(cell.urban_level as u32, 10).unwrap_or('?')
            } else {
                terrain_char(cell.terrain, !grid.is_land(index))
            }
        }
    }
}

/// Render the grid as ASCII in the given mode.
pub fn render(grid: &HexGrid, mode: AsciiMode, max_elevation: i32) -> String {
    let mut out = String::with_capacity((grid.width * 2 + 2) * grid.height);
    for row in 0..grid.height {
        // Odd rows sit half a cell east.
        if row % 2 == 1 {
            out.push(' ');
        }
        for col in 0..grid.width {
            let index = row * grid.width + col;
            let cell = grid.cell_at(index);
            let c = match mode {
                AsciiMode::Terrain => terrain_char(cell.terrain, !grid.is_land(index)),
                AsciiMode::Elevation => {
                    elevation_char(cell.elevation, grid.water_level, max_elevation)
                }
                AsciiMode::Moisture => moisture_char(cell.moisture),
                AsciiMode::Overlay => overlay_char(grid, index),
            };
            out.push(c);
            out.push(' ');
        }
        out.push('\n');
    }
    out
}

/// Write an ASCII rendering to a file, with a small legend header.
pub fn export_to_file(
    grid: &HexGrid,
    mode: AsciiMode,
    max_elevation: i32,
    path: &Path,
) -> io::Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "# {} map, {}x{}", mode.name(), grid.width, grid.height)?;
    if mode == AsciiMode::Overlay {
        writeln!(file, "# C castle, Z ziggurat, M megaflora, ~ river/water, + road")?;
    }
    write!(file, "{}", render(grid, mode, max_elevation))?;
    Ok(())
}
