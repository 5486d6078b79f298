//! Live world grid: the collaborator the finished buffer is applied to.
//!
//! The grid is only ever mutated from the thread that owns it; the
//! pipeline computes into a separate buffer and hands results over in one
//! explicit apply step. Rendering collaborators read `CellSnapshot`s and
//! react to batched refresh notifications, which bulk edits coalesce into
//! a single refresh.

use crate::cell::{CellData, RoadFlags, SpecialFeature, TerrainType};
use crate::grid::{neighbor_index, HexDirection};

/// The live hex grid.
pub struct HexGrid {
    pub width: usize,
    pub height: usize,
    pub water_level: i32,
    cells: Vec<CellData>,
    bulk_edit_depth: u32,
    refresh_pending: bool,
    refresh_count: u64,
}

impl HexGrid {
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
            bulk_edit_depth: 0,
            refresh_pending: false,
            refresh_count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell lookup by offset coordinates.
    pub fn cell(&self, col: usize, row: usize) -> &CellData {
        &self.cells[row * self.width + col]
    }

    /// Cell lookup by linear index.
    pub fn cell_at(&self, index: usize) -> &CellData {
        &self.cells[index]
    }

    pub(crate) fn cell_at_mut(&mut self, index: usize) -> &mut CellData {
        &mut self.cells[index]
    }

    /// Neighbor lookup by direction, `None` at the map edge.
    pub fn neighbor(&self, index: usize, direction: HexDirection) -> Option<usize> {
        neighbor_index(index, direction, self.width, self.height)
    }

    pub fn is_land(&self, index: usize) -> bool {
        self.cells[index].elevation >= self.water_level
    }

    pub fn land_cell_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_land(i)).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &CellData)> {
        self.cells.iter().enumerate()
    }

    // -------------------------------------------------------------------
    // Batched visual refresh
    // -------------------------------------------------------------------

    /// Suppress refresh notifications until the matching `end_bulk_edit`.
    /// Nests; only the outermost end flushes.
    pub fn begin_bulk_edit(&mut self) {
        self.bulk_edit_depth += 1;
    }

    pub fn end_bulk_edit(&mut self) {
        debug_assert!(self.bulk_edit_depth > 0, "unbalanced end_bulk_edit");
        self.bulk_edit_depth = self.bulk_edit_depth.saturating_sub(1);
        if self.bulk_edit_depth == 0 && self.refresh_pending {
            self.refresh_pending = false;
            self.refresh_count += 1;
        }
    }

    /// Mark the grid visually dirty. Fires immediately outside a bulk
    /// edit, otherwise coalesces into one refresh at the outermost end.
    pub fn request_refresh(&mut self) {
        if self.bulk_edit_depth > 0 {
            self.refresh_pending = true;
        } else {
            self.refresh_count += 1;
        }
    }

    /// How many refresh notifications have fired. Rendering collaborators
    /// compare this against their last-seen value.
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }

    /// Read-only per-cell view for rendering/UI collaborators.
    pub fn snapshot(&self, index: usize) -> CellSnapshot {
        let cell = &self.cells[index];
        CellSnapshot {
            col: index % self.width,
            row: index / self.width,
            elevation: cell.elevation,
            water_level: self.water_level,
            terrain: cell.terrain,
            moisture: cell.moisture,
            urban_level: cell.urban_level,
            farm_level: cell.farm_level,
            plant_level: cell.plant_level,
            special: cell.special,
            walled: cell.walled,
            incoming_river: cell.incoming_river,
            outgoing_river: cell.outgoing_river,
            roads: cell.roads,
        }
    }
}

/// Read-only state of a single cell after apply.
#[derive(Clone, Copy, Debug)]
pub struct CellSnapshot {
    pub col: usize,
    pub row: usize,
    pub elevation: i32,
    pub water_level: i32,
    pub terrain: TerrainType,
    pub moisture: f32,
    pub urban_level: u8,
    pub farm_level: u8,
    pub plant_level: u8,
    pub special: SpecialFeature,
    pub walled: bool,
    pub incoming_river: Option<HexDirection>,
    pub outgoing_river: Option<HexDirection>,
    pub roads: RoadFlags,
}

impl CellSnapshot {
    pub fn is_underwater(&self) -> bool {
        self.elevation < self.water_level
    }

    /// Format elevation as string
    pub fn elevation_str(&self) -> String {
        if self.is_underwater() {
            format!("{} (underwater)", self.elevation)
        } else {
            format!("{}", self.elevation)
        }
    }

    /// Format moisture as string
    pub fn moisture_str(&self) -> String {
        let desc = if self.moisture < 0.2 {
            "arid"
        } else if self.moisture < 0.4 {
            "dry"
        } else if self.moisture < 0.6 {
            "moderate"
        } else if self.moisture < 0.8 {
            "wet"
        } else {
            "saturated"
        };
        format!("{:.2} ({})", self.moisture, desc)
    }

    /// Format river state as string
    pub fn river_str(&self) -> String {
        match (self.incoming_river, self.outgoing_river) {
            (None, None) => "none".to_string(),
            (Some(d), None) => format!("mouth (from {:?})", d),
            (None, Some(d)) => format!("source (to {:?})", d),
            (Some(from), Some(to)) => format!("through ({:?} -> {:?})", from, to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_edit_coalesces_refreshes() {
        let mut grid = HexGrid::new(4, 4, 0, 2);
        grid.begin_bulk_edit();
        grid.request_refresh();
        grid.request_refresh();
        grid.request_refresh();
        assert_eq!(grid.refresh_count(), 0, "suppressed during bulk edit");
        grid.end_bulk_edit();
        assert_eq!(grid.refresh_count(), 1, "one batched refresh");
    }

    #[test]
    fn test_refresh_fires_immediately_outside_bulk_edit() {
        let mut grid = HexGrid::new(4, 4, 0, 2);
        grid.request_refresh();
        assert_eq!(grid.refresh_count(), 1);
    }

    #[test]
    fn test_nested_bulk_edits_flush_once() {
        let mut grid = HexGrid::new(4, 4, 0, 2);
        grid.begin_bulk_edit();
        grid.begin_bulk_edit();
        grid.request_refresh();
        grid.end_bulk_edit();
        assert_eq!(grid.refresh_count(), 0, "inner end must not flush");
        grid.end_bulk_edit();
        assert_eq!(grid.refresh_count(), 1);
    }

    #[test]
    fn test_snapshot_reflects_cell_state() {
        let mut grid = HexGrid::new(4, 4, 0, 2);
        grid.cell_at_mut(5).elevation = 3;
        grid.cell_at_mut(5).urban_level = 2;
        let snapshot = grid.snapshot(5);
        assert_eq!(snapshot.col, 1);
        assert_eq!(snapshot.row, 1);
        assert_eq!(snapshot.elevation, 3);
        assert_eq!(snapshot.urban_level, 2);
        assert!(!snapshot.is_underwater());
    }
}
