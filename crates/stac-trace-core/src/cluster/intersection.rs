//! Connected components of overlapping footprints.
//!
//! Two items belong to the same cluster when their footprints intersect,
//! directly or through a chain of other items. Every pair is tested, so this
//! strategy is O(n²) and meant for small batches and for cross-checking the
//! grid strategy on fixtures. A bbox pre-check skips most exact tests.

use geo::{Geometry, Intersects};

use super::{ClusteringStrategy, LocatedItem};
use crate::models::BBox;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IntersectionStrategy;

impl IntersectionStrategy {
    pub fn new() -> Self {
        Self
    }
}

/// Disjoint-set forest with path halving and union by size.
struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
    }
}

impl ClusteringStrategy for IntersectionStrategy {
    fn name(&self) -> &str {
        "intersection"
    }

    fn group(&self, items: &[LocatedItem<'_>]) -> Vec<(String, Vec<usize>)> {
        let shapes: Vec<Option<(Geometry<f64>, BBox)>> = items
            .iter()
            .map(|l| Some((l.item.footprint()?, l.item.bbox?)))
            .collect();

        let mut sets = DisjointSet::new(items.len());
        for i in 0..items.len() {
            let Some((ref gi, bi)) = shapes[i] else { continue };
            for j in (i + 1)..items.len() {
                let Some((ref gj, bj)) = shapes[j] else { continue };
                if bi.intersects(&bj) && gi.intersects(gj) {
                    sets.union(i, j);
                }
            }
        }

        // Components are listed in order of their lowest member index. Items
        // arrive sorted by id, so that member carries the smallest id.
        let mut components: Vec<(usize, Vec<usize>)> = Vec::new();
        let mut slot_of_root: Vec<Option<usize>> = vec![None; items.len()];
        for idx in 0..items.len() {
            let root = sets.find(idx);
            match slot_of_root[root] {
                Some(slot) => components[slot].1.push(idx),
                None => {
                    slot_of_root[root] = Some(components.len());
                    components.push((idx, vec![idx]));
                }
            }
        }

        components
            .into_iter()
            .map(|(first, members)| (format!("component:{}", items[first].item.id), members))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::test_support::item_at;
    use crate::cluster::{GridStrategy, HotspotClusterer, DEFAULT_MIN_IMAGES};
    use crate::filter::SensorFilter;
    use crate::models::CatalogItem;

    fn located(items: &[CatalogItem]) -> Vec<LocatedItem<'_>> {
        items
            .iter()
            .map(|item| {
                let (lat, lon) = item.bbox.unwrap().center();
                LocatedItem { item, lat, lon }
            })
            .collect()
    }

    #[test]
    fn test_chain_of_overlaps_is_one_component() {
        // Footprints are 0.01° wide; 0.008° steps overlap consecutively.
        let items: Vec<CatalogItem> = (0..4)
            .map(|i| item_at(&format!("c{i}"), 5.0, 5.0 + 0.008 * i as f64))
            .collect();
        let groups = IntersectionStrategy::new().group(&located(&items));
        assert_eq!(groups, vec![("component:c0".to_string(), vec![0, 1, 2, 3])]);
    }

    #[test]
    fn test_disjoint_footprints_stay_apart() {
        let items = vec![item_at("a", 0.0, 0.0), item_at("b", 0.0, 1.0)];
        let groups = IntersectionStrategy::new().group(&located(&items));
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_agrees_with_grid_on_compact_clusters() {
        let mut items: Vec<CatalogItem> = (0..6)
            .map(|i| item_at(&format!("a{i}"), 47.05 + 0.001 * i as f64, 39.02))
            .collect();
        items.extend((0..5).map(|i| item_at(&format!("b{i}"), -20.05, 30.05 + 0.002 * i as f64)));
        items.push(item_at("lonely", 60.0, 60.0));

        let grid = HotspotClusterer::new(
            Box::new(GridStrategy::new(0.1)),
            DEFAULT_MIN_IMAGES,
            SensorFilter::default(),
        )
        .cluster(&items);
        let overlap = HotspotClusterer::new(
            Box::new(IntersectionStrategy::new()),
            DEFAULT_MIN_IMAGES,
            SensorFilter::default(),
        )
        .cluster(&items);

        let mut grid_sets: Vec<Vec<String>> = grid.hotspots.iter().map(|h| h.item_ids.clone()).collect();
        let mut overlap_sets: Vec<Vec<String>> =
            overlap.hotspots.iter().map(|h| h.item_ids.clone()).collect();
        grid_sets.sort();
        overlap_sets.sort();
        assert_eq!(grid_sets, overlap_sets);
        assert_eq!(grid_sets.len(), 2);
    }
}
