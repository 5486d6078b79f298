//! Shared fixtures for stage tests.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::cell::CellBuffer;
use crate::config::GenerationConfig;
use crate::pipeline::{Stage, StageContext};
use crate::seeds::WorldSeeds;
use crate::{climate, land};

/// A buffer with land and climate already generated, for stages that need
/// realistic elevation and moisture fields.
pub(crate) fn generated_buffer(
    width: usize,
    height: usize,
    seed: u64,
    config: &GenerationConfig,
) -> CellBuffer {
    let seeds = WorldSeeds::from_master(seed);
    let mut cells = CellBuffer::new(width, height, config.min_elevation, config.water_level);

    let mut rng = ChaCha8Rng::seed_from_u64(seeds.land);
    let ctx = StageContext::detached(Stage::Land);
    land::generate(&mut cells, config, &mut rng, &ctx).unwrap();

    let ctx = StageContext::detached(Stage::Climate);
    climate::generate(&mut cells, config, seeds.climate, &ctx).unwrap();

    cells
}
