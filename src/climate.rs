//! Climate generator: moisture field and biome classification.
//!
//! Moisture is four octaves of seeded value noise sampled on the cell
//! lattice, plus a coastal boost for land touching water. Biomes then
//! follow a fixed precedence over elevation and moisture. The whole stage
//! is a pure function of the elevation field and the climate seed: no RNG
//! stream is consumed, so identical inputs give identical output.

use log::debug;

use crate::cell::{CellBuffer, TerrainType};
use crate::config::GenerationConfig;
use crate::error::GenerateError;
use crate::pipeline::StageContext;

/// Octaves accumulated for the moisture field.
const MOISTURE_OCTAVES: u32 = 4;

/// Assign moisture and terrain to every cell.
pub fn generate(
    cells: &mut CellBuffer,
    config: &GenerationConfig,
    seed: u64,
    ctx: &StageContext<'_>,
) -> Result<(), GenerateError> {
    let total = cells.len();
    if total == 0 {
        return Ok(());
    }

    // Moisture from noise.
    for index in 0..total {
        ctx.check_cancelled(index)?;
        let x = (index % cells.width) as f32;
        let y = (index / cells.width) as f32;
        cells.get_mut(index).moisture = fractal_moisture(seed, x, y, config.moisture_noise_scale);
        if index % 1024 == 0 {
            ctx.report(index as f32 / total as f32 * 0.6);
        }
    }

    // Coastal boost: land adjacent to any water picks up extra moisture.
    let coastal: Vec<usize> = (0..total)
        .filter(|&i| {
            cells.is_land(i) && cells.neighbors(i).any(|(_, n)| cells.is_underwater(n))
        })
        .collect();
    for index in coastal {
        let cell = cells.get_mut(index);
        cell.moisture = (cell.moisture + config.coastal_moisture_boost).min(1.0);
    }
    ctx.report(0.8);

    // Biomes.
    let water_level = cells.water_level;
    for index in 0..total {
        let cell = cells.get_mut(index);
        cell.terrain = classify(cell.elevation, cell.moisture, water_level, config);
    }
    ctx.report(1.0);

    debug!("climate stage: {} cells classified", total);
    Ok(())
}

/// Biome precedence: water, then elevation bands, then moisture bands.
pub fn classify(
    elevation: i32,
    moisture: f32,
    water_level: i32,
    config: &GenerationConfig,
) -> TerrainType {
    if elevation < water_level {
        TerrainType::Sand
    } else if elevation >= config.mountain_elevation {
        TerrainType::Snow
    } else if elevation >= config.hill_elevation {
        if moisture > config.forest_moisture_max {
            TerrainType::Snow
        } else {
            TerrainType::Stone
        }
    } else if moisture < config.desert_moisture_max {
        TerrainType::Sand
    } else if moisture >= config.forest_moisture_max {
        TerrainType::Mud
    } else {
        TerrainType::Grass
    }
}

/// Four octaves of value noise, each at double the frequency and half the
/// weight of the last, normalized into [0, 1].
fn fractal_moisture(seed: u64, x: f32, y: f32, scale: f32) -> f32 {
    let mut sum = 0.0f32;
    let mut weight_total = 0.0f32;
    for octave in 0..MOISTURE_OCTAVES {
        let frequency = scale * (1 << octave) as f32;
        let weight = 0.5f32.powi(octave as i32);
        sum += value_noise(seed, x * frequency, y * frequency) * weight;
        weight_total += weight;
    }
    (sum / weight_total) * 0.5 + 0.5
}

/// Lattice value noise in [-1, 1]: the four surrounding integer corners
/// are hashed into gradients-free values and blended bilinearly with
/// smoothstep-eased fractional offsets.
fn value_noise(seed: u64, x: f32, y: f32) -> f32 {
    let x0 = x.floor();
    let y0 = y.floor();
    let tx = smoothstep(x - x0);
    let ty = smoothstep(y - y0);
    let (xi, yi) = (x0 as i64, y0 as i64);

    let c00 = corner_hash(seed, xi, yi);
    let c10 = corner_hash(seed, xi + 1, yi);
    let c01 = corner_hash(seed, xi, yi + 1);
    let c11 = corner_hash(seed, xi + 1, yi + 1);

    let top = c00 + (c10 - c00) * tx;
    let bottom = c01 + (c11 - c01) * tx;
    top + (bottom - top) * ty
}

/// Smoothstep easing 3t^2 - 2t^3.
fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// Hash one lattice corner into [-1, 1] with a seeded 64-bit mix
/// (splitmix-style finalizer).
fn corner_hash(seed: u64, x: i64, y: i64) -> f32 {
    let mut h = seed
        ^ (x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (y as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    h ^= h >> 33;
    h = h.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    h ^= h >> 33;
    h = h.wrapping_mul(0xC4CE_B9FE_1A85_EC53);
    h ^= h >> 33;
    // Top 24 bits -> [0, 1) -> [-1, 1]
    (h >> 40) as f32 / (1u64 << 24) as f32 * 2.0 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Stage;

    #[test]
    fn test_moisture_stays_in_unit_range() {
        for seed in [0u64, 1, 42, u64::MAX] {
            for i in 0..200 {
                let x = (i % 20) as f32;
                let y = (i / 20) as f32;
                let m = fractal_moisture(seed, x, y, 0.08);
                assert!((0.0..=1.0).contains(&m), "moisture {} out of range", m);
            }
        }
    }

    #[test]
    fn test_noise_is_deterministic_per_seed() {
        let a = fractal_moisture(42, 3.0, 7.0, 0.08);
        let b = fractal_moisture(42, 3.0, 7.0, 0.08);
        assert_eq!(a, b);
        let c = fractal_moisture(43, 3.0, 7.0, 0.08);
        assert_ne!(a, c, "different seeds should shift the lattice");
    }

    #[test]
    fn test_value_noise_interpolates_corners() {
        // At integer lattice points the noise must equal the corner hash.
        let seed = 7;
        assert_eq!(value_noise(seed, 2.0, 5.0), corner_hash(seed, 2, 5));
        // And stay within the corner hull in between.
        let v = value_noise(seed, 2.5, 5.5);
        assert!((-1.0..=1.0).contains(&v));
    }

    #[test]
    fn test_biome_precedence() {
        let config = GenerationConfig::default();
        let wl = config.water_level;

        // Underwater is always Sand, whatever the moisture.
        assert_eq!(classify(wl - 1, 0.9, wl, &config), TerrainType::Sand);
        // Mountains are always Snow.
        assert_eq!(
            classify(config.mountain_elevation, 0.0, wl, &config),
            TerrainType::Snow
        );
        // Hills split on moisture: wet hills snowcap, dry hills are stone.
        assert_eq!(
            classify(config.hill_elevation, config.forest_moisture_max + 0.1, wl, &config),
            TerrainType::Snow
        );
        assert_eq!(
            classify(config.hill_elevation, 0.3, wl, &config),
            TerrainType::Stone
        );
        // Low land splits on moisture bands.
        assert_eq!(classify(wl, 0.1, wl, &config), TerrainType::Sand);
        assert_eq!(classify(wl, 0.4, wl, &config), TerrainType::Grass);
        assert_eq!(classify(wl, 0.8, wl, &config), TerrainType::Mud);
    }

    #[test]
    fn test_stage_is_pure_in_elevation_and_seed() {
        let config = GenerationConfig::default();
        let mut make = || {
            let mut cells = CellBuffer::new(12, 12, config.min_elevation, config.water_level);
            for index in 0..cells.len() {
                cells.get_mut(index).elevation = (index % 7) as i32;
            }
            let ctx = StageContext::detached(Stage::Climate);
            generate(&mut cells, &config, 314, &ctx).unwrap();
            cells
        };
        let a = make();
        let b = make();
        for index in 0..a.len() {
            assert_eq!(a.get(index).moisture, b.get(index).moisture);
            assert_eq!(a.get(index).terrain, b.get(index).terrain);
        }
    }

    #[test]
    fn test_coastal_land_is_wetter() {
        let config = GenerationConfig {
            coastal_moisture_boost: 0.2,
            ..GenerationConfig::default()
        };
        // A single land cell surrounded by water: must receive the boost.
        let mut coastal = CellBuffer::new(5, 5, config.min_elevation, config.water_level);
        coastal.get_mut(12).elevation = config.water_level;
        let ctx = StageContext::detached(Stage::Climate);
        generate(&mut coastal, &config, 5, &ctx).unwrap();

        // Same seed, same cell, but fully landlocked: no boost.
        let mut inland = CellBuffer::new(5, 5, config.min_elevation, config.water_level);
        for index in 0..inland.len() {
            inland.get_mut(index).elevation = config.water_level;
        }
        generate(&mut inland, &config, 5, &ctx).unwrap();

        let boosted = coastal.get(12).moisture;
        let plain = inland.get(12).moisture;
        assert!(
            (boosted - plain - 0.2).abs() < 1e-6 || boosted == 1.0,
            "coastal {} vs inland {}",
            boosted,
            plain
        );
    }
}
