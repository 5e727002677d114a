//! Uniform-grid spatial index for ranged neighbor queries.
//!
//! The index buckets alive units into fixed-size cubic cells keyed by integer
//! coordinates `(⌊x/C⌋, ⌊y/C⌋, ⌊z/C⌋)`. It is rebuilt once per tick before
//! the targeting and weapon phases and is a coarse prefilter only: queries
//! enumerate whole cells, so callers must apply exact distance filtering.
//!
//! Movement within a tick is not re-indexed; the grid always reflects the
//! state at the start of the current tick.

use std::collections::HashMap;

use nalgebra::Vector3;

use crate::models::Unit;

/// Grid cell coordinates.
type CellKey = (i64, i64, i64);

/// Uniform grid over unit positions, rebuilt each tick.
#[derive(Debug)]
pub struct SpatialGrid {
    cell_size: f64,
    /// Cell key -> dense indices of the alive units inside that cell.
    cells: HashMap<CellKey, Vec<usize>>,
}

impl SpatialGrid {
    /// Create an empty grid with the given cell edge length.
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size: if cell_size > 0.0 { cell_size } else { 1.0 },
            cells: HashMap::new(),
        }
    }

    /// Cell edge length in spatial units.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    fn key_for(&self, position: &Vector3<f64>) -> CellKey {
        (
            (position.x / self.cell_size).floor() as i64,
            (position.y / self.cell_size).floor() as i64,
            (position.z / self.cell_size).floor() as i64,
        )
    }

    /// Repopulate the grid from the current unit table. Dead units are
    /// excluded; they can neither be targeted nor block a cell.
    pub fn rebuild(&mut self, units: &[Unit]) {
        self.cells.clear();
        for (index, unit) in units.iter().enumerate() {
            if !unit.alive {
                continue;
            }
            let key = self.key_for(&unit.position);
            self.cells.entry(key).or_default().push(index);
        }
    }

    /// Collect the dense indices of units in the cell neighborhood covering a
    /// sphere of `radius` around `center`.
    ///
    /// The neighborhood is `(2·n+1)³` cells with `n = ⌈radius/C⌉ + 1`, so the
    /// result can include units well outside the radius and, when the center
    /// is a unit's own position, the unit itself.
    pub fn nearby_into(&self, center: &Vector3<f64>, radius: f64, out: &mut Vec<usize>) {
        out.clear();
        if self.cells.is_empty() || radius < 0.0 {
            return;
        }

        let cells_needed = (radius / self.cell_size).ceil() as i64 + 1;
        let (cx, cy, cz) = self.key_for(center);
        for dx in -cells_needed..=cells_needed {
            for dy in -cells_needed..=cells_needed {
                for dz in -cells_needed..=cells_needed {
                    if let Some(indices) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) {
                        out.extend_from_slice(indices);
                    }
                }
            }
        }
    }

    /// Convenience wrapper around [`nearby_into`](Self::nearby_into).
    pub fn nearby(&self, center: &Vector3<f64>, radius: f64) -> Vec<usize> {
        let mut out = Vec::new();
        self.nearby_into(center, radius, &mut out);
        out
    }

    /// Number of occupied cells.
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }
}
