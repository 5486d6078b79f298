//! Hex grid geometry: directions, offset-coordinate neighbors, distances.
//!
//! The map uses odd-row offset coordinates on a pointy-top hex grid:
//! odd rows are shifted half a cell east. Nothing here stores state;
//! every function is pure in (index, direction, width, height).

use serde::{Deserialize, Serialize};

/// The six edge directions of a pointy-top hex, indexed 0-5.
///
/// Ordered so that `opposite()` is `(d + 3) % 6`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HexDirection {
    East = 0,
    NorthEast = 1,
    NorthWest = 2,
    West = 3,
    SouthWest = 4,
    SouthEast = 5,
}

impl HexDirection {
    pub const COUNT: usize = 6;

    /// All six directions in index order.
    pub fn all() -> [HexDirection; 6] {
        [
            HexDirection::East,
            HexDirection::NorthEast,
            HexDirection::NorthWest,
            HexDirection::West,
            HexDirection::SouthWest,
            HexDirection::SouthEast,
        ]
    }

    /// The direction across the shared edge: `(d + 3) % 6`.
    pub fn opposite(self) -> HexDirection {
        HexDirection::from_index((self as usize + 3) % 6)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> HexDirection {
        match index % 6 {
            0 => HexDirection::East,
            1 => HexDirection::NorthEast,
            2 => HexDirection::NorthWest,
            3 => HexDirection::West,
            4 => HexDirection::SouthWest,
            _ => HexDirection::SouthEast,
        }
    }

    /// Column/row deltas for this direction from a cell on the given row.
    ///
    /// Row parity matters for the four diagonal directions: odd rows sit
    /// half a cell east, so their diagonal neighbors skew east as well.
    /// North is row - 1.
    fn offsets(self, row: usize) -> (i32, i32) {
        let odd = row % 2 == 1;
        match self {
            HexDirection::East => (1, 0),
            HexDirection::West => (-1, 0),
            HexDirection::NorthEast => (if odd { 1 } else { 0 }, -1),
            HexDirection::NorthWest => (if odd { 0 } else { -1 }, -1),
            HexDirection::SouthEast => (if odd { 1 } else { 0 }, 1),
            HexDirection::SouthWest => (if odd { 0 } else { -1 }, 1),
        }
    }
}

/// Linear index of the neighbor of `index` in `direction`, or `None` at
/// the map edge. Index layout is `row * width + col`.
pub fn neighbor_index(
    index: usize,
    direction: HexDirection,
    width: usize,
    height: usize,
) -> Option<usize> {
    if width == 0 || height == 0 {
        return None;
    }
    let col = (index % width) as i32;
    let row = index / width;
    let (dc, dr) = direction.offsets(row);
    let nc = col + dc;
    let nr = row as i32 + dr;
    if nc < 0 || nc >= width as i32 || nr < 0 || nr >= height as i32 {
        return None;
    }
    Some(nr as usize * width + nc as usize)
}

/// The direction that leads from `from` to `to`, if they are adjacent.
pub fn direction_between(from: usize, to: usize, width: usize, height: usize) -> Option<HexDirection> {
    HexDirection::all()
        .into_iter()
        .find(|&d| neighbor_index(from, d, width, height) == Some(to))
}

/// Cube coordinates for a cell, for distance computation.
/// Odd-row offset conversion: q = col - (row - (row & 1)) / 2.
fn cube_coords(index: usize, width: usize) -> (i32, i32, i32) {
    let col = (index % width) as i32;
    let row = (index / width) as i32;
    let q = col - (row - (row & 1)) / 2;
    let r = row;
    (q, -q - r, r)
}

/// Hex distance between two cells (number of steps on the grid).
pub fn hex_distance(a: usize, b: usize, width: usize) -> u32 {
    let (ax, ay, az) = cube_coords(a, width);
    let (bx, by, bz) = cube_coords(b, width);
    (((ax - bx).abs() + (ay - by).abs() + (az - bz).abs()) / 2) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_pairs() {
        assert_eq!(HexDirection::East.opposite(), HexDirection::West);
        assert_eq!(HexDirection::NorthEast.opposite(), HexDirection::SouthWest);
        assert_eq!(HexDirection::NorthWest.opposite(), HexDirection::SouthEast);
        for d in HexDirection::all() {
            assert_eq!(d.opposite().opposite(), d);
        }
    }

    #[test]
    fn test_neighbor_reciprocity() {
        // Stepping to a neighbor and back through the opposite edge
        // must return to the starting cell, for every cell and direction.
        let (width, height) = (7, 6);
        for index in 0..width * height {
            for d in HexDirection::all() {
                if let Some(n) = neighbor_index(index, d, width, height) {
                    assert_eq!(
                        neighbor_index(n, d.opposite(), width, height),
                        Some(index),
                        "cell {} dir {:?}",
                        index,
                        d
                    );
                }
            }
        }
    }

    #[test]
    fn test_edge_cells_have_no_outside_neighbors() {
        let (width, height) = (4, 4);
        // Top-left corner on an even row: no West, no north neighbors.
        assert_eq!(neighbor_index(0, HexDirection::West, width, height), None);
        assert_eq!(neighbor_index(0, HexDirection::NorthWest, width, height), None);
        assert_eq!(neighbor_index(0, HexDirection::NorthEast, width, height), None);
        assert_eq!(neighbor_index(0, HexDirection::East, width, height), Some(1));
    }

    #[test]
    fn test_hex_distance_adjacent_is_one() {
        let (width, height) = (8, 8);
        for index in 0..width * height {
            for d in HexDirection::all() {
                if let Some(n) = neighbor_index(index, d, width, height) {
                    assert_eq!(hex_distance(index, n, width), 1);
                }
            }
        }
    }

    #[test]
    fn test_hex_distance_straight_row() {
        let width = 10;
        // Cells 0 and 5 on the same row are 5 steps apart.
        assert_eq!(hex_distance(0, 5, width), 5);
        assert_eq!(hex_distance(0, 0, width), 0);
    }

    #[test]
    fn test_direction_between_adjacent() {
        let (width, height) = (5, 5);
        for index in 0..width * height {
            for d in HexDirection::all() {
                if let Some(n) = neighbor_index(index, d, width, height) {
                    assert_eq!(direction_between(index, n, width, height), Some(d));
                }
            }
        }
        // Non-adjacent cells have no connecting direction.
        assert_eq!(direction_between(0, 3, width, height), None);
    }
}
