//! River generator: fitness-ranked sources and weighted downhill tracing.
//!
//! Headwater candidates are scored by moisture and elevation, drawn in a
//! tier-weighted order, and traced downhill one cell at a time. A trace
//! prefers the steepest drops, may wander across flat ground, never climbs,
//! and stops on reaching water. Short traces are discarded wholesale so no
//! partial river ever lands in the buffer.
//!
//! Earlier traces consume candidates and block later ones (a cell carrying
//! a river is never entered again), so results are order-dependent by
//! design; the order itself is deterministic for a given seed.

use std::collections::HashSet;

use log::debug;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::cell::CellBuffer;
use crate::config::GenerationConfig;
use crate::error::GenerateError;
use crate::grid::direction_between;
use crate::pipeline::StageContext;

/// A candidate headwater with its fitness score.
struct SourceCandidate {
    index: usize,
    fitness: f32,
}

impl SourceCandidate {
    /// Draw weight by fitness tier.
    fn weight(&self) -> u32 {
        if self.fitness >= 0.75 {
            4
        } else if self.fitness >= 0.5 {
            2
        } else {
            1
        }
    }
}

/// Trace rivers until the land-fraction target is met or candidates run out.
pub fn generate(
    cells: &mut CellBuffer,
    config: &GenerationConfig,
    rng: &mut ChaCha8Rng,
    ctx: &StageContext<'_>,
) -> Result<(), GenerateError> {
    let land_cells = cells.land_cell_count();
    let target = (land_cells as f32 * config.river_percentage).ceil() as usize;
    if target == 0 {
        ctx.report(1.0);
        return Ok(());
    }

    let mut candidates = collect_candidates(cells, config);
    let attempt_cap = candidates.len() * 2;
    debug!(
        "river stage: {} candidates, target {} river cells",
        candidates.len(),
        target
    );

    let mut river_cells = 0usize;
    let mut attempts = 0usize;
    while river_cells < target && !candidates.is_empty() && attempts < attempt_cap {
        attempts += 1;
        ctx.check_cancelled(attempts)?;

        let source = draw_candidate(&mut candidates, rng);
        // An earlier trace may have flowed through this candidate; a
        // second river out of it would branch.
        if cells.get(source).has_river() {
            continue;
        }
        let path = trace(cells, config, rng, source);
        if path.len() >= config.min_river_length {
            apply_river(cells, &path);
            river_cells += path.len();
            ctx.report((river_cells as f32 / target as f32).min(1.0));
        }
    }

    debug!(
        "river stage: {} river cells after {} attempts",
        river_cells, attempts
    );
    ctx.report(1.0);
    Ok(())
}

/// Source fitness: moisture scaled by how high the cell sits above the
/// water line. Only land cells qualify.
fn source_fitness(cells: &CellBuffer, config: &GenerationConfig, index: usize) -> f32 {
    let cell = cells.get(index);
    if cell.elevation < cells.water_level {
        return 0.0;
    }
    let span = (config.max_elevation - cells.water_level) as f32;
    let elevation_bonus = if span > 0.0 {
        (((cell.elevation - cells.water_level) as f32) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    0.5 * cell.moisture + 0.5 * cell.moisture * elevation_bonus
}

fn collect_candidates(cells: &CellBuffer, config: &GenerationConfig) -> Vec<SourceCandidate> {
    (0..cells.len())
        .filter_map(|index| {
            let fitness = source_fitness(cells, config, index);
            (fitness >= config.river_source_min_fitness)
                .then_some(SourceCandidate { index, fitness })
        })
        .collect()
}

/// Remove and return one candidate, weighted by fitness tier.
fn draw_candidate(candidates: &mut Vec<SourceCandidate>, rng: &mut ChaCha8Rng) -> usize {
    let total: u32 = candidates.iter().map(SourceCandidate::weight).sum();
    let mut pick = rng.gen_range(0..total);
    let mut chosen = candidates.len() - 1;
    for (i, candidate) in candidates.iter().enumerate() {
        let w = candidate.weight();
        if pick < w {
            chosen = i;
            break;
        }
        pick -= w;
    }
    candidates.swap_remove(chosen).index
}

/// Walk downhill from a source. Returns the visited path including the
/// terminal cell; the caller decides whether it is long enough to keep.
fn trace(
    cells: &CellBuffer,
    config: &GenerationConfig,
    rng: &mut ChaCha8Rng,
    source: usize,
) -> Vec<usize> {
    let mut path = vec![source];
    let mut visited: HashSet<usize> = HashSet::from([source]);
    let mut current = source;

    for _ in 0..config.max_river_trace_steps {
        let elevation = cells.get(current).elevation;

        // Candidate next cells: unvisited this trace, not already a river.
        let mut downhill: Vec<(usize, i32)> = Vec::new();
        let mut flat: Vec<usize> = Vec::new();
        for (_, neighbor) in cells.neighbors(current) {
            if visited.contains(&neighbor) || cells.get(neighbor).has_river() {
                continue;
            }
            let drop = elevation - cells.get(neighbor).elevation;
            if drop > 0 {
                downhill.push((neighbor, drop));
            } else if drop == 0 {
                flat.push(neighbor);
            }
            // Uphill is never valid.
        }

        let next = if !downhill.is_empty() {
            weighted_downhill_choice(&downhill, config.river_steepness_weight, rng)
        } else if !flat.is_empty() && rng.gen::<f32>() < config.river_flat_flow_chance {
            flat[rng.gen_range(0..flat.len())]
        } else {
            break;
        };

        path.push(next);
        visited.insert(next);
        if cells.is_underwater(next) {
            break;
        }
        current = next;
    }

    path
}

/// Choose among downhill neighbors, weighted by steepness of the drop.
fn weighted_downhill_choice(
    downhill: &[(usize, i32)],
    steepness_weight: f32,
    rng: &mut ChaCha8Rng,
) -> usize {
    let total: f32 = downhill
        .iter()
        .map(|&(_, drop)| steepness_weight * drop as f32)
        .sum();
    let mut pick = rng.gen::<f32>() * total;
    for &(neighbor, drop) in downhill {
        let w = steepness_weight * drop as f32;
        if pick < w {
            return neighbor;
        }
        pick -= w;
    }
    downhill[downhill.len() - 1].0
}

/// Mark outgoing on each path cell and incoming on its successor.
fn apply_river(cells: &mut CellBuffer, path: &[usize]) {
    for pair in path.windows(2) {
        let direction = direction_between(pair[0], pair[1], cells.width, cells.height)
            .expect("river path steps between adjacent cells");
        cells.get_mut(pair[0]).outgoing_river = Some(direction);
        cells.get_mut(pair[1]).incoming_river = Some(direction.opposite());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{neighbor_index, HexDirection};
    use crate::pipeline::{Stage, StageContext};
    use rand::SeedableRng;

    /// Straight 7x1 strip: a 5-cell downhill ramp ending in water, with
    /// only the ramp top wet enough to qualify as a source.
    fn ramp_buffer(config: &GenerationConfig) -> CellBuffer {
        let mut cells = CellBuffer::new(7, 1, config.min_elevation, config.water_level);
        let elevations = [6, 5, 4, 3, 2, 0, 0];
        for (index, &e) in elevations.iter().enumerate() {
            cells.get_mut(index).elevation = e;
            cells.get_mut(index).moisture = 0.05;
        }
        cells.get_mut(0).moisture = 1.0;
        cells
    }

    #[test]
    fn test_ramp_produces_strictly_downhill_river() {
        let config = GenerationConfig::default();
        let mut cells = ramp_buffer(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let ctx = StageContext::detached(Stage::Rivers);
        generate(&mut cells, &config, &mut rng, &ctx).unwrap();

        // Five cells carry an outgoing river, each pointing east.
        for index in 0..5 {
            assert_eq!(
                cells.get(index).outgoing_river,
                Some(HexDirection::East),
                "cell {} outgoing",
                index
            );
        }
        // The water terminal has an incoming river but no outgoing.
        assert_eq!(cells.get(5).incoming_river, Some(HexDirection::West));
        assert_eq!(cells.get(5).outgoing_river, None);

        // Strict descent along every river edge.
        for index in 0..5 {
            let next = index + 1;
            assert!(cells.get(index).elevation >= cells.get(next).elevation);
        }
    }

    #[test]
    fn test_short_traces_are_discarded_wholesale() {
        let config = GenerationConfig {
            min_river_length: 5,
            ..GenerationConfig::default()
        };
        // A 2-cell ledge straight into water: trace length 3 < 5.
        let mut cells = CellBuffer::new(3, 1, config.min_elevation, config.water_level);
        cells.get_mut(0).elevation = 4;
        cells.get_mut(0).moisture = 1.0;
        cells.get_mut(1).elevation = 3;
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let ctx = StageContext::detached(Stage::Rivers);
        generate(&mut cells, &config, &mut rng, &ctx).unwrap();

        for (_, cell) in cells.iter() {
            assert!(!cell.has_river(), "short trace must leave no partial river");
        }
    }

    #[test]
    fn test_rivers_never_flow_uphill() {
        let config = GenerationConfig::default();
        let mut cells = crate::test_support::generated_buffer(32, 32, 77, &config);
        let mut rng = ChaCha8Rng::seed_from_u64(77);
        let ctx = StageContext::detached(Stage::Rivers);
        generate(&mut cells, &config, &mut rng, &ctx).unwrap();

        for (index, cell) in cells.iter() {
            if let Some(direction) = cell.outgoing_river {
                let next = neighbor_index(index, direction, cells.width, cells.height)
                    .expect("outgoing river points at a real neighbor");
                assert!(
                    cells.get(next).elevation <= cell.elevation,
                    "river edge {} -> {} climbs",
                    index,
                    next
                );
                assert_eq!(
                    cells.get(next).incoming_river,
                    Some(direction.opposite()),
                    "incoming/outgoing must pair across edge"
                );
            }
        }
    }

    #[test]
    fn test_no_branching_or_merging() {
        let config = GenerationConfig::default();
        let mut cells = crate::test_support::generated_buffer(32, 32, 13, &config);
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let ctx = StageContext::detached(Stage::Rivers);
        generate(&mut cells, &config, &mut rng, &ctx).unwrap();

        // Each cell's Option fields already enforce <=1 in/out; verify no
        // two distinct cells send their outgoing river into the same
        // neighbor edge slot.
        let mut incoming_seen: std::collections::HashSet<usize> = std::collections::HashSet::new();
        for (index, cell) in cells.iter() {
            if let Some(direction) = cell.outgoing_river {
                let next = neighbor_index(index, direction, cells.width, cells.height).unwrap();
                assert!(
                    incoming_seen.insert(next),
                    "cell {} receives two rivers",
                    next
                );
            }
        }
    }

    #[test]
    fn test_applied_rivers_meet_minimum_length() {
        let config = GenerationConfig::default();
        let mut cells = crate::test_support::generated_buffer(32, 32, 5, &config);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let ctx = StageContext::detached(Stage::Rivers);
        generate(&mut cells, &config, &mut rng, &ctx).unwrap();

        // Walk each river from its head; every chain must reach the
        // minimum applied length.
        for (index, cell) in cells.iter() {
            if cell.outgoing_river.is_some() && cell.incoming_river.is_none() {
                let mut length = 1;
                let mut current = index;
                while let Some(direction) = cells.get(current).outgoing_river {
                    current = neighbor_index(current, direction, cells.width, cells.height).unwrap();
                    length += 1;
                }
                assert!(
                    length >= config.min_river_length,
                    "river from {} has length {}",
                    index,
                    length
                );
            }
        }
    }
}
