//! Generation configuration: the tunable constant surface for every stage.
//!
//! Every knob is a plain named field so stages can be tuned independently
//! of the algorithms. The whole struct round-trips through serde, so a
//! JSON file can override any subset of the defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::GenerateError;

/// All tunables for one generation run, grouped by stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    // -------------------------------------------------------------------
    // Elevation scale
    // -------------------------------------------------------------------
    /// Lowest elevation level; fresh buffers start here (deep water).
    pub min_elevation: i32,
    /// Highest elevation level a cell can be raised to.
    pub max_elevation: i32,
    /// Land/water threshold: a cell is land iff elevation >= water_level.
    pub water_level: i32,

    // -------------------------------------------------------------------
    // Land growth
    // -------------------------------------------------------------------
    /// Fraction of all cells that should end up as land (target, not a
    /// guarantee: overlapping chunks can over- or undershoot).
    pub land_percentage: f32,
    /// Smallest chunk (connected region) grown per iteration.
    pub min_chunk_size: usize,
    /// Largest chunk grown per iteration.
    pub max_chunk_size: usize,
    /// Probability a frontier neighbor joins the chunk; lower values make
    /// more irregular blobs.
    pub chunk_expansion_chance: f32,
    /// Probability an already-land cell gains +1 elevation when visited,
    /// and per-cell probability during elevation passes.
    pub elevation_raise_chance: f32,
    /// Full +1-elevation sweeps after the chunk loop (hills/mountains).
    pub elevation_passes: u32,
    /// Hard cap on chunk iterations, in case the budget never empties.
    pub max_chunk_iterations: u32,
    /// Land cells with a land-neighbor fraction below this sink to the
    /// minimum elevation.
    pub erosion_land_threshold: f32,
    /// Water cells with a land-neighbor fraction above this rise to the
    /// water level.
    pub erosion_water_threshold: f32,

    // -------------------------------------------------------------------
    // Climate
    // -------------------------------------------------------------------
    /// Base lattice frequency of the moisture noise; doubled per octave.
    pub moisture_noise_scale: f32,
    /// Moisture added to land cells adjacent to any water cell.
    pub coastal_moisture_boost: f32,
    /// Below this moisture, low land is desert (Sand).
    pub desert_moisture_max: f32,
    /// At or above this moisture, low land is forest (Mud); hills above it
    /// carry snow instead of bare stone.
    pub forest_moisture_max: f32,
    /// Elevation at or above which land counts as hills.
    pub hill_elevation: i32,
    /// Elevation at or above which land counts as mountains (always Snow).
    pub mountain_elevation: i32,

    // -------------------------------------------------------------------
    // Rivers
    // -------------------------------------------------------------------
    /// Target river cells as a fraction of land cells.
    pub river_percentage: f32,
    /// Minimum source fitness for a cell to qualify as a headwater.
    pub river_source_min_fitness: f32,
    /// Weight multiplier per unit of elevation drop when choosing among
    /// downhill neighbors.
    pub river_steepness_weight: f32,
    /// Probability a river keeps flowing across flat ground instead of
    /// stopping.
    pub river_flat_flow_chance: f32,
    /// Hard cap on steps per trace.
    pub max_river_trace_steps: u32,
    /// Traces shorter than this (in cells) are discarded wholesale.
    pub min_river_length: usize,

    // -------------------------------------------------------------------
    // Features
    // -------------------------------------------------------------------
    /// Per-cell probability of running the density table.
    pub feature_placement_chance: f32,
    /// Per-cell probability of attempting a special feature.
    pub special_feature_chance: f32,
    /// Minimum elevation for a castle on Grass or Stone.
    pub castle_min_elevation: i32,
    /// Minimum moisture for megaflora on Mud.
    pub megaflora_moisture_min: f32,
    /// Urban level at or above which a cell gets walls.
    pub wall_min_urban_level: u8,

    // -------------------------------------------------------------------
    // Roads
    // -------------------------------------------------------------------
    /// Urban level at or above which a cell counts as a settlement.
    pub min_urban_level_for_settlement: u8,
    /// Settlement pairs farther apart than this (hex distance) are not
    /// considered for connection.
    pub max_settlement_connection_distance: u32,
    /// Hard cap on road path length in edges.
    pub max_road_path_length: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            // Elevation scale
            min_elevation: 0,
            max_elevation: 8,
            water_level: 2,

            // Land growth
            land_percentage: 0.5,
            min_chunk_size: 8,
            max_chunk_size: 24,
            chunk_expansion_chance: 0.75,
            elevation_raise_chance: 0.25,
            elevation_passes: 2,
            max_chunk_iterations: 10_000,
            erosion_land_threshold: 0.3,
            erosion_water_threshold: 0.6,

            // Climate
            moisture_noise_scale: 0.08,
            coastal_moisture_boost: 0.15,
            desert_moisture_max: 0.25,
            forest_moisture_max: 0.6,
            hill_elevation: 5,
            mountain_elevation: 7,

            // Rivers
            river_percentage: 0.1,
            river_source_min_fitness: 0.25,
            river_steepness_weight: 4.0,
            river_flat_flow_chance: 0.4,
            max_river_trace_steps: 128,
            min_river_length: 3,

            // Features
            feature_placement_chance: 0.4,
            special_feature_chance: 0.02,
            castle_min_elevation: 3,
            megaflora_moisture_min: 0.75,
            wall_min_urban_level: 3,

            // Roads
            min_urban_level_for_settlement: 2,
            max_settlement_connection_distance: 16,
            max_road_path_length: 24,
        }
    }
}

impl GenerationConfig {
    /// Load a config from a JSON file. Missing fields fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, GenerateError> {
        let text = fs::read_to_string(path)
            .map_err(|e| GenerateError::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| GenerateError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Sanity-check the knobs that algorithms divide by or iterate on.
    pub fn validate(&self) -> Result<(), GenerateError> {
        if self.max_elevation <= self.min_elevation {
            return Err(GenerateError::Config(
                "max_elevation must exceed min_elevation".into(),
            ));
        }
        if self.water_level < self.min_elevation || self.water_level > self.max_elevation {
            return Err(GenerateError::Config(
                "water_level must lie within the elevation range".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.land_percentage) {
            return Err(GenerateError::Config(
                "land_percentage must be within 0..=1".into(),
            ));
        }
        if self.min_chunk_size == 0 || self.max_chunk_size < self.min_chunk_size {
            return Err(GenerateError::Config(
                "chunk size range must be non-empty".into(),
            ));
        }
        if self.min_river_length == 0 {
            return Err(GenerateError::Config(
                "min_river_length must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
