//! Per-cell generation state and the flat cell buffer.
//!
//! `CellBuffer` is the working surface the pipeline stages mutate in
//! sequence. It is allocated once per run, owned by exactly one writer
//! at a time, and read once by the apply-to-grid step.

use serde::{Deserialize, Serialize};

use crate::grid::{neighbor_index, HexDirection};

/// Biome of a cell, derived from elevation and moisture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainType {
    #[default]
    Sand,
    Grass,
    Mud,
    Stone,
    Snow,
}

impl TerrainType {
    pub fn all() -> &'static [TerrainType] {
        &[
            TerrainType::Sand,
            TerrainType::Grass,
            TerrainType::Mud,
            TerrainType::Stone,
            TerrainType::Snow,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            TerrainType::Sand => "Sand",
            TerrainType::Grass => "Grass",
            TerrainType::Mud => "Mud",
            TerrainType::Stone => "Stone",
            TerrainType::Snow => "Snow",
        }
    }
}

/// Landmark feature occupying a whole cell. Mutually exclusive with the
/// urban/farm/plant density levels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialFeature {
    #[default]
    None,
    Castle,
    Ziggurat,
    Megaflora,
}

impl SpecialFeature {
    pub fn is_some(&self) -> bool {
        *self != SpecialFeature::None
    }
}

/// Six road-edge flags packed into one byte, indexed by `HexDirection`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadFlags(u8);

impl RoadFlags {
    pub const NONE: RoadFlags = RoadFlags(0);

    pub fn has(&self, direction: HexDirection) -> bool {
        self.0 & (1 << direction.index()) != 0
    }

    pub fn set(&mut self, direction: HexDirection) {
        self.0 |= 1 << direction.index();
    }

    pub fn clear(&mut self, direction: HexDirection) {
        self.0 &= !(1 << direction.index());
    }

    pub fn any(&self) -> bool {
        self.0 != 0
    }

    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }
}

/// Generation state for one hex cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CellData {
    /// Height level, bounded by the configured [min, max] range.
    pub elevation: i32,
    /// Biome, assigned by the climate stage.
    pub terrain: TerrainType,
    /// Moisture, 0..1, assigned by the climate stage.
    pub moisture: f32,
    /// Settlement density, 0..3.
    pub urban_level: u8,
    /// Farmland density, 0..3.
    pub farm_level: u8,
    /// Vegetation density, 0..3.
    pub plant_level: u8,
    /// Landmark feature; clears the density levels when placed.
    pub special: SpecialFeature,
    /// Whether the cell is ringed by walls.
    pub walled: bool,
    /// Direction a river enters from, if any. At most one.
    pub incoming_river: Option<HexDirection>,
    /// Direction a river leaves toward, if any. At most one.
    pub outgoing_river: Option<HexDirection>,
    /// Road flags, one per edge.
    pub roads: RoadFlags,
}

impl CellData {
    pub fn has_river(&self) -> bool {
        self.incoming_river.is_some() || self.outgoing_river.is_some()
    }

    /// Whether a river runs exactly along the given edge.
    pub fn has_river_through_edge(&self, direction: HexDirection) -> bool {
        self.incoming_river == Some(direction) || self.outgoing_river == Some(direction)
    }
}

/// Flat, index-addressed store of per-cell generation state.
///
/// Linear index = row * width + col. The water level is a constant
/// baseline shared by every cell, so it lives here rather than per cell.
#[derive(Clone)]
pub struct CellBuffer {
    pub width: usize,
    pub height: usize,
    pub water_level: i32,
    cells: Vec<CellData>,
}

impl CellBuffer {
    /// Allocate a buffer with every cell at the minimum elevation and no
    /// features.
    pub fn new(width: usize, height: usize, min_elevation: i32, water_level: i32) -> Self {
        let blank = CellData {
            elevation: min_elevation,
            ..CellData::default()
        };
        Self {
            width,
            height,
            water_level,
            cells: vec![blank; width * height],
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, index: usize) -> &CellData {
        &self.cells[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut CellData {
        &mut self.cells[index]
    }

    /// Land test: elevation at or above the water baseline.
    pub fn is_land(&self, index: usize) -> bool {
        self.cells[index].elevation >= self.water_level
    }

    pub fn is_underwater(&self, index: usize) -> bool {
        !self.is_land(index)
    }

    /// Neighbor index in a direction, `None` at the map edge.
    pub fn neighbor(&self, index: usize, direction: HexDirection) -> Option<usize> {
        neighbor_index(index, direction, self.width, self.height)
    }

    /// All existing neighbors of a cell with the direction leading to them.
    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = (HexDirection, usize)> + '_ {
        HexDirection::all()
            .into_iter()
            .filter_map(move |d| self.neighbor(index, d).map(|n| (d, n)))
    }

    /// Count of cells at or above the water level.
    pub fn land_cell_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_land(i)).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &CellData)> {
        self.cells.iter().enumerate()
    }
}
