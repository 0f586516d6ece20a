//! Fixed-grid clustering with 2×2 super-cells.
//!
//! Grouping on single cells splits any hotspot that straddles a cell edge.
//! Folding each cell into the even-aligned 2×2 block that contains it keeps
//! such neighbours together at the cost of a coarser resolution. The grid is
//! equirectangular, not geodesic.

use std::collections::BTreeMap;

use super::{ClusteringStrategy, LocatedItem};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridStrategy {
    grid_size: f64,
}

impl GridStrategy {
    pub fn new(grid_size: f64) -> Self {
        Self { grid_size }
    }

    /// `(floor(lat / g), floor(lon / g))`.
    pub fn cell(&self, lat: f64, lon: f64) -> (i64, i64) {
        (
            (lat / self.grid_size).floor() as i64,
            (lon / self.grid_size).floor() as i64,
        )
    }

    /// Even-aligned 2×2 block containing a cell.
    pub fn super_cell(cell: (i64, i64)) -> (i64, i64) {
        (cell.0.div_euclid(2) * 2, cell.1.div_euclid(2) * 2)
    }
}

impl ClusteringStrategy for GridStrategy {
    fn name(&self) -> &str {
        "grid"
    }

    fn group(&self, items: &[LocatedItem<'_>]) -> Vec<(String, Vec<usize>)> {
        let mut cells: BTreeMap<(i64, i64), Vec<usize>> = BTreeMap::new();
        for (idx, located) in items.iter().enumerate() {
            let key = Self::super_cell(self.cell(located.lat, located.lon));
            cells.entry(key).or_default().push(idx);
        }
        cells
            .into_iter()
            .map(|((lat, lon), members)| (format!("grid:{}:{}", lat, lon), members))
            .collect()
    }
}
