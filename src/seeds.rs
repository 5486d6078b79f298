//! Seed management for map generation
//!
//! Provides separate seeds for each generation stage, allowing fine-grained
//! control over which aspects of the map to vary or keep constant.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Seeds for every generation stage.
///
/// Each stage gets its own seed, derived from a master seed by default.
/// Individual seeds can be overridden for experimentation.
#[derive(Clone, Copy, Debug)]
pub struct WorldSeeds {
    /// Master seed (used for display/reference)
    pub master: u64,
    /// Land growth (chunk placement, elevation raising, erosion)
    pub land: u64,
    /// Climate (moisture noise lattice)
    pub climate: u64,
    /// River sources and trace decisions
    pub rivers: u64,
    /// Feature density and special feature placement
    pub features: u64,
    /// Road network tie-breaking
    pub roads: u64,
}

impl WorldSeeds {
    /// Create seeds from a master seed, deriving all sub-seeds deterministically.
    pub fn from_master(master: u64) -> Self {
        Self {
            master,
            land: derive_seed(master, "land"),
            climate: derive_seed(master, "climate"),
            rivers: derive_seed(master, "rivers"),
            features: derive_seed(master, "features"),
            roads: derive_seed(master, "roads"),
        }
    }

    /// Create a builder for customizing individual seeds.
    pub fn builder(master: u64) -> WorldSeedsBuilder {
        WorldSeedsBuilder::new(master)
    }
}

impl Default for WorldSeeds {
    fn default() -> Self {
        Self::from_master(rand::random())
    }
}

/// Builder for customizing individual seeds while deriving others from master.
pub struct WorldSeedsBuilder {
    seeds: WorldSeeds,
}

impl WorldSeedsBuilder {
    pub fn new(master: u64) -> Self {
        Self {
            seeds: WorldSeeds::from_master(master),
        }
    }

    /// Override the land seed
    pub fn land(mut self, seed: u64) -> Self {
        self.seeds.land = seed;
        self
    }

    /// Override the climate seed
    pub fn climate(mut self, seed: u64) -> Self {
        self.seeds.climate = seed;
        self
    }

    /// Override the rivers seed
    pub fn rivers(mut self, seed: u64) -> Self {
        self.seeds.rivers = seed;
        self
    }

    /// Override the features seed
    pub fn features(mut self, seed: u64) -> Self {
        self.seeds.features = seed;
        self
    }

    /// Override the roads seed
    pub fn roads(mut self, seed: u64) -> Self {
        self.seeds.roads = seed;
        self
    }

    /// Build the final WorldSeeds
    pub fn build(self) -> WorldSeeds {
        self.seeds
    }
}

/// Derive a sub-seed from a master seed and a stage name.
/// Uses hashing to ensure different stages get different but deterministic seeds.
fn derive_seed(master: u64, stage: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    master.hash(&mut hasher);
    stage.hash(&mut hasher);
    hasher.finish()
}

impl std::fmt::Display for WorldSeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "WorldSeeds {{ master: {}, land: {}, climate: {}, rivers: {}, features: {}, roads: {} }}",
            self.master, self.land, self.climate, self.rivers, self.features, self.roads,
        )
    }
}
