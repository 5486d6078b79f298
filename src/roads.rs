//! Road generator: settlement detection, A* pathfinding, network growth.
//!
//! Settlements (urban cells and qualifying landmarks) are connected into a
//! network one at a time: starting from the most important settlement, the
//! closest unconnected settlement by actual path cost is attached next.
//! Edges through water, steep cliffs, megaflora, or along a river are
//! never traversed, which makes river crossings implicit bridges: the
//! pathfinder detours through the cell's non-river edges.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use log::debug;

use crate::cell::{CellBuffer, SpecialFeature};
use crate::config::GenerationConfig;
use crate::error::GenerateError;
use crate::grid::{direction_between, hex_distance, HexDirection};
use crate::pipeline::StageContext;

/// A road-network endpoint.
#[derive(Clone, Copy, Debug)]
struct Settlement {
    index: usize,
    importance: u32,
}

/// Connect all settlements with roads.
pub fn generate(
    cells: &mut CellBuffer,
    config: &GenerationConfig,
    ctx: &StageContext<'_>,
) -> Result<(), GenerateError> {
    let mut settlements = find_settlements(cells, config);
    if settlements.len() < 2 {
        ctx.report(1.0);
        return Ok(());
    }
    let settlement_count = settlements.len();
    debug!("road stage: {} settlements", settlement_count);

    // Seed the network with the most important settlement. Ties break on
    // index so the build order is deterministic.
    settlements.sort_by(|a, b| b.importance.cmp(&a.importance).then(a.index.cmp(&b.index)));
    let mut connected = vec![settlements.remove(0)];
    let mut unconnected = settlements;

    let mut work = 0usize;
    while !unconnected.is_empty() {
        ctx.check_cancelled(work)?;
        work += 1;

        // Among all (connected, unconnected) pairs in range, take the one
        // with the cheapest A* path.
        let mut best: Option<(usize, Vec<usize>)> = None;
        for from in &connected {
            for (target_pos, to) in unconnected.iter().enumerate() {
                if hex_distance(from.index, to.index, cells.width)
                    > config.max_settlement_connection_distance
                {
                    continue;
                }
                if let Some(path) = find_path(cells, config, from.index, to.index) {
                    let better = match &best {
                        Some((_, current)) => path.len() < current.len(),
                        None => true,
                    };
                    if better {
                        best = Some((target_pos, path));
                    }
                }
            }
        }

        match best {
            Some((target_pos, path)) => {
                apply_path(cells, &path);
                connected.push(unconnected.remove(target_pos));
            }
            None => {
                // Nothing reachable: concede one settlement as a
                // disconnected island so the loop always terminates.
                connected.push(unconnected.remove(0));
            }
        }

        ctx.report(connected.len() as f32 / settlement_count as f32);
    }

    ctx.report(1.0);
    Ok(())
}

/// A settlement is a sufficiently urban cell, or a castle or ziggurat.
/// Megaflora never anchors a road.
fn find_settlements(cells: &CellBuffer, config: &GenerationConfig) -> Vec<Settlement> {
    cells
        .iter()
        .filter_map(|(index, cell)| {
            let special_anchor =
                matches!(cell.special, SpecialFeature::Castle | SpecialFeature::Ziggurat);
            if cell.urban_level >= config.min_urban_level_for_settlement || special_anchor {
                Some(Settlement {
                    index,
                    importance: cell.urban_level as u32 + if special_anchor { 5 } else { 0 },
                })
            } else {
                None
            }
        })
        .collect()
}

/// Whether a road may run along the edge from `from` toward `direction`.
fn edge_passable(
    cells: &CellBuffer,
    from: usize,
    direction: HexDirection,
    to: usize,
) -> bool {
    if cells.is_underwater(from) || cells.is_underwater(to) {
        return false;
    }
    if cells.get(from).special == SpecialFeature::Megaflora
        || cells.get(to).special == SpecialFeature::Megaflora
    {
        return false;
    }
    let elevation_diff = (cells.get(from).elevation - cells.get(to).elevation).abs();
    if elevation_diff > 1 {
        return false;
    }
    // A river along this exact edge blocks it; crossing happens by
    // detouring through the cell's other edges.
    if cells.get(from).has_river_through_edge(direction) {
        return false;
    }
    true
}

/// Traversal cost of a passable edge. Existing roads are nearly free;
/// climbs and riverbanks cost extra.
fn edge_cost(cells: &CellBuffer, from: usize, direction: HexDirection, to: usize) -> u32 {
    if cells.get(from).roads.has(direction) {
        return 1;
    }
    let elevation_diff = (cells.get(from).elevation - cells.get(to).elevation).unsigned_abs();
    let river_penalty = if cells.get(from).has_river() || cells.get(to).has_river() {
        1
    } else {
        0
    };
    1 + 2 * elevation_diff + river_penalty
}

/// Node in the A* open set.
#[derive(Clone, Copy, Eq, PartialEq)]
struct PathNode {
    index: usize,
    cost: u32,
    estimated_total: u32,
}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimated_total
            .cmp(&self.estimated_total)
            .then_with(|| other.cost.cmp(&self.cost))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* between two cells. The hex cube distance is admissible because
/// every edge costs at least 1. Returns the cell path including both
/// endpoints, or `None` when unreachable within the length cap.
fn find_path(
    cells: &CellBuffer,
    config: &GenerationConfig,
    from: usize,
    to: usize,
) -> Option<Vec<usize>> {
    let mut open_set = BinaryHeap::new();
    let mut came_from: HashMap<usize, usize> = HashMap::new();
    let mut g_score: HashMap<usize, u32> = HashMap::new();
    let mut depth: HashMap<usize, u32> = HashMap::new();

    let h = |index: usize| hex_distance(index, to, cells.width);

    g_score.insert(from, 0);
    depth.insert(from, 0);
    open_set.push(PathNode {
        index: from,
        cost: 0,
        estimated_total: h(from),
    });

    while let Some(current) = open_set.pop() {
        if current.index == to {
            let mut path = vec![to];
            let mut cursor = to;
            while let Some(&previous) = came_from.get(&cursor) {
                path.push(previous);
                cursor = previous;
            }
            path.reverse();
            return Some(path);
        }
        if current.cost > *g_score.get(&current.index).unwrap_or(&u32::MAX) {
            continue; // Stale heap entry.
        }

        let current_depth = depth[&current.index];
        if current_depth >= config.max_road_path_length {
            continue;
        }

        for (direction, neighbor) in cells.neighbors(current.index) {
            if !edge_passable(cells, current.index, direction, neighbor) {
                continue;
            }
            let tentative_g =
                current.cost.saturating_add(edge_cost(cells, current.index, direction, neighbor));
            if tentative_g < *g_score.get(&neighbor).unwrap_or(&u32::MAX) {
                came_from.insert(neighbor, current.index);
                g_score.insert(neighbor, tentative_g);
                depth.insert(neighbor, current_depth + 1);
                open_set.push(PathNode {
                    index: neighbor,
                    cost: tentative_g,
                    estimated_total: tentative_g + h(neighbor),
                });
            }
        }
    }

    None
}

/// Set the road flag on both sides of every traversed edge.
fn apply_path(cells: &mut CellBuffer, path: &[usize]) {
    for pair in path.windows(2) {
        let direction = direction_between(pair[0], pair[1], cells.width, cells.height)
            .expect("road path steps between adjacent cells");
        cells.get_mut(pair[0]).roads.set(direction);
        cells.get_mut(pair[1]).roads.set(direction.opposite());
    }
}
