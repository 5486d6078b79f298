//! Feature generator: biome-driven density levels and special features.
//!
//! Two independent stochastic passes over eligible cells (above water, no
//! river). The density pass fills plant/farm/urban levels from per-biome
//! tables keyed on moisture; the rarer special pass drops landmark
//! features and clears any density the cell had, since the two are
//! mutually exclusive.

use log::debug;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::cell::{CellBuffer, CellData, SpecialFeature, TerrainType};
use crate::config::GenerationConfig;
use crate::error::GenerateError;
use crate::pipeline::StageContext;

/// Populate density and special features across the buffer.
pub fn generate(
    cells: &mut CellBuffer,
    config: &GenerationConfig,
    rng: &mut ChaCha8Rng,
    ctx: &StageContext<'_>,
) -> Result<(), GenerateError> {
    let total = cells.len();
    let mut placed = 0usize;
    let mut specials = 0usize;

    for index in 0..total {
        ctx.check_cancelled(index)?;
        if index % 1024 == 0 {
            ctx.report(index as f32 / total.max(1) as f32);
        }

        // Both passes consume their roll even on ineligible cells so the
        // RNG stream stays aligned regardless of layout.
        let density_roll = rng.gen::<f32>() < config.feature_placement_chance;
        let special_roll = rng.gen::<f32>() < config.special_feature_chance;

        if cells.is_underwater(index) || cells.get(index).has_river() {
            continue;
        }

        if density_roll {
            let cell = *cells.get(index);
            let (plant, farm, urban) = density_levels(&cell, rng);
            let cell = cells.get_mut(index);
            cell.plant_level = plant;
            cell.farm_level = farm;
            cell.urban_level = urban;
            placed += 1;
        }

        if special_roll {
            let cell = *cells.get(index);
            if let Some(special) = special_for(&cell, config) {
                let cell = cells.get_mut(index);
                cell.special = special;
                // A landmark occupies the whole cell.
                cell.plant_level = 0;
                cell.farm_level = 0;
                cell.urban_level = 0;
                specials += 1;
            }
        }

        let cell = cells.get_mut(index);
        if cell.urban_level >= config.wall_min_urban_level {
            cell.walled = true;
        }
    }

    ctx.report(1.0);
    debug!(
        "feature stage: {} density cells, {} special features",
        placed, specials
    );
    Ok(())
}

/// Per-biome density table: (plant, farm, urban) levels keyed on moisture.
fn density_levels(cell: &CellData, rng: &mut ChaCha8Rng) -> (u8, u8, u8) {
    let m = cell.moisture;
    match cell.terrain {
        // Sparse oasis farming; settlements only where water gathers.
        TerrainType::Sand => {
            let farm = if m >= 0.3 { 1 } else { 0 };
            let urban = if m >= 0.4 { rng.gen_range(0..=1) } else { 0 };
            (0, farm, urban)
        }
        // The breadbasket biome: the full range of everything.
        TerrainType::Grass => {
            let plant = if m >= 0.45 { 2 } else { 1 };
            let farm = if m >= 0.35 { rng.gen_range(1..=2) } else { 0 };
            let urban = if m >= 0.5 {
                rng.gen_range(1..=3)
            } else {
                rng.gen_range(0..=1)
            };
            (plant, farm, urban)
        }
        // Dense vegetation, marginal farms, small stilt villages.
        TerrainType::Mud => {
            let plant = if m >= 0.7 { 3 } else { 2 };
            let farm = if m >= 0.5 { 1 } else { 0 };
            (plant, farm, rng.gen_range(0..=1))
        }
        // Hardy scrub and quarry towns.
        TerrainType::Stone => {
            let plant = if m >= 0.5 { 1 } else { 0 };
            let urban = if m >= 0.3 { rng.gen_range(0..=2) } else { 0 };
            (plant, 0, urban)
        }
        // Nothing grows or settles on snow.
        TerrainType::Snow => (0, 0, 0),
    }
}

/// Special feature rules per biome, or `None` when nothing qualifies.
fn special_for(cell: &CellData, config: &GenerationConfig) -> Option<SpecialFeature> {
    match cell.terrain {
        TerrainType::Sand => Some(SpecialFeature::Ziggurat),
        TerrainType::Grass | TerrainType::Stone => {
            (cell.elevation >= config.castle_min_elevation).then_some(SpecialFeature::Castle)
        }
        TerrainType::Mud => {
            (cell.moisture > config.megaflora_moisture_min).then_some(SpecialFeature::Megaflora)
        }
        TerrainType::Snow => None,
    }
}
