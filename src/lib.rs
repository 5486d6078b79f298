//! Hexagonal world map generation library
//!
//! Generates land, climate, rivers, features, and roads for a hex grid
//! from a single integer seed, reproducibly. Re-exports modules for use
//! by binaries and tools.

pub mod ascii;
pub mod cell;
pub mod climate;
pub mod config;
pub mod error;
pub mod export;
pub mod features;
pub mod grid;
pub mod land;
pub mod pipeline;
pub mod rivers;
pub mod roads;
pub mod seeds;
pub mod world;

#[cfg(test)]
pub(crate) mod test_support;

pub use cell::{CellBuffer, CellData, RoadFlags, SpecialFeature, TerrainType};
pub use config::GenerationConfig;
pub use error::GenerateError;
pub use grid::HexDirection;
pub use pipeline::{MapGenerator, Outcome, Progress, Stage};
pub use seeds::WorldSeeds;
pub use world::{CellSnapshot, HexGrid};
