//! Hotspot clustering.
//!
//! Turns a snapshot of catalog items into hotspots: locations imaged at
//! least `min_images` times. The pipeline is
//!
//! ```text
//! items ─▶ sensor filter ─▶ (lat, lon) ─▶ strategy.group() ─▶ threshold ─▶ aggregate + hull
//! ```
//!
//! Grouping is pluggable through [`ClusteringStrategy`]:
//!
//! | Strategy | Complexity | Use |
//! |----------|------------|-----|
//! | [`GridStrategy`] | O(n) | production path: fixed grid, 2×2 super-cells |
//! | [`IntersectionStrategy`] | O(n²) | small batches: connected components of overlapping footprints |
//!
//! Output depends only on the set of input items, never on their order:
//! items are sorted by id before grouping, strategies key their groups
//! deterministically, and member lists are sorted.

mod grid;
mod intersection;

pub use grid::GridStrategy;
pub use intersection::IntersectionStrategy;

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use geo::CoordsIter;

use crate::filter::SensorFilter;
use crate::hull::footprint_hull;
use crate::models::{CatalogItem, Hotspot};

/// Grid cell edge in degrees (≈ 11 km at the equator).
pub const DEFAULT_GRID_SIZE: f64 = 0.1;

/// Fewest images that make a hotspot.
pub const DEFAULT_MIN_IMAGES: usize = 5;

/// An item paired with the coordinates used to place it.
#[derive(Debug, Clone, Copy)]
pub struct LocatedItem<'a> {
    pub item: &'a CatalogItem,
    pub lat: f64,
    pub lon: f64,
}

/// A way of partitioning located items into candidate clusters.
pub trait ClusteringStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Group items (by index into `items`) under stable cluster keys.
    ///
    /// Every index appears in at most one group. Groups must come back in an
    /// order that depends only on the item set.
    fn group(&self, items: &[LocatedItem<'_>]) -> Vec<(String, Vec<usize>)>;
}

/// Placement coordinates for an item as `(lat, lon)`.
///
/// Uses the provider centroid when present, otherwise the bbox midpoint.
pub fn item_coordinates(item: &CatalogItem) -> Option<(f64, f64)> {
    let coords = item
        .provider_centroid
        .or_else(|| item.bbox.map(|b| b.center()))?;
    if coords.0.is_finite() && coords.1.is_finite() {
        Some(coords)
    } else {
        None
    }
}

/// Result of one clustering pass.
#[derive(Debug, Clone, Default)]
pub struct ClusterReport {
    pub hotspots: Vec<Hotspot>,
    /// Items handed to the clusterer.
    pub considered: usize,
    /// Items dropped by the sensor filter.
    pub filtered_out: usize,
    /// Items with neither a centroid nor a bbox.
    pub unlocated: usize,
    /// Candidate clusters discarded for having too few images.
    pub below_threshold: usize,
}

pub struct HotspotClusterer {
    strategy: Box<dyn ClusteringStrategy>,
    min_images: usize,
    filter: SensorFilter,
}

impl HotspotClusterer {
    pub fn new(strategy: Box<dyn ClusteringStrategy>, min_images: usize, filter: SensorFilter) -> Self {
        Self {
            strategy,
            min_images: min_images.max(1),
            filter,
        }
    }

    /// Grid clusterer with the default cell size, threshold and filter.
    pub fn grid() -> Self {
        Self::new(
            Box::new(GridStrategy::new(DEFAULT_GRID_SIZE)),
            DEFAULT_MIN_IMAGES,
            SensorFilter::default(),
        )
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Cluster a snapshot of items. Hotspots come back in strategy order.
    pub fn cluster(&self, items: &[CatalogItem]) -> ClusterReport {
        let mut report = ClusterReport {
            considered: items.len(),
            ..Default::default()
        };

        let mut accepted: Vec<&CatalogItem> = items
            .iter()
            .filter(|item| self.filter.accepts(item))
            .collect();
        report.filtered_out = items.len() - accepted.len();
        accepted.sort_by(|a, b| a.id.cmp(&b.id));
        accepted.dedup_by(|a, b| a.id == b.id);

        let located: Vec<LocatedItem<'_>> = accepted
            .iter()
            .filter_map(|&item| {
                item_coordinates(item).map(|(lat, lon)| LocatedItem { item, lat, lon })
            })
            .collect();
        report.unlocated = accepted.len() - located.len();

        for (key, mut members) in self.strategy.group(&located) {
            if members.len() < self.min_images {
                report.below_threshold += 1;
                continue;
            }
            members.sort_by(|&a, &b| located[a].item.id.cmp(&located[b].item.id));
            let group: Vec<LocatedItem<'_>> = members.iter().map(|&i| located[i]).collect();
            match build_hotspot(key, &group) {
                Some(hotspot) => report.hotspots.push(hotspot),
                None => report.unlocated += group.len(),
            }
        }
        report
    }
}

fn build_hotspot(cluster_key: String, members: &[LocatedItem<'_>]) -> Option<Hotspot> {
    let n = members.len() as f64;
    let centroid_lat = members.iter().map(|m| m.lat).sum::<f64>() / n;
    let centroid_lon = members.iter().map(|m| m.lon).sum::<f64>() / n;

    let mut footprints = Vec::with_capacity(members.len());
    let mut loose_points = Vec::new();
    for m in members {
        // A footprint without a single finite vertex (an empty
        // MultiPolygon, say) contributes its placement point instead.
        match m.item.footprint() {
            Some(fp) if fp.coords_iter().any(|c| c.x.is_finite() && c.y.is_finite()) => {
                footprints.push(fp)
            }
            _ => loose_points.push((m.lat, m.lon)),
        }
    }
    let hull = footprint_hull(&footprints, &loose_points)?;

    let datetimes = members.iter().filter_map(|m| m.item.datetime);
    let earliest_datetime = datetimes.clone().min();
    let latest_datetime = datetimes.max();

    Some(Hotspot {
        cluster_key,
        image_count: members.len(),
        item_ids: members.iter().map(|m| m.item.id.clone()).collect(),
        centroid_lat,
        centroid_lon,
        hull: hull.polygon,
        hull_repaired: hull.repaired,
        earliest_datetime,
        latest_datetime,
        primary_collection: mode(members.iter().map(|m| m.item.collection_name())),
        location_name: None,
    })
}

/// Most frequent value; ties go to the lexicographically smallest.
fn mode<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// The `n` most-imaged hotspots.
///
/// Ordered by image count descending; equal counts are ordered by centroid
/// latitude, then longitude, then cluster key, so the ranking is total.
pub fn top_n(hotspots: &[Hotspot], n: usize) -> Vec<Hotspot> {
    let mut ranked = hotspots.to_vec();
    ranked.sort_by(|a, b| {
        b.image_count
            .cmp(&a.image_count)
            .then_with(|| a.centroid_lat.total_cmp(&b.centroid_lat))
            .then_with(|| a.centroid_lon.total_cmp(&b.centroid_lon))
            .then_with(|| a.cluster_key.cmp(&b.cluster_key))
    });
    ranked.truncate(n);
    ranked
}

/// Collection and daily breakdown of an item snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivitySummary {
    pub total_items: usize,
    pub collections: BTreeMap<String, usize>,
    /// Image counts for the most recent days that have any imagery.
    pub daily_activity: BTreeMap<NaiveDate, usize>,
}

/// Days kept in [`ActivitySummary::daily_activity`].
pub const DAILY_ACTIVITY_DAYS: usize = 7;

impl ActivitySummary {
    pub fn from_items(items: &[CatalogItem]) -> Self {
        let mut collections: HashMap<String, usize> = HashMap::new();
        let mut daily: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for item in items {
            *collections.entry(item.collection_name().to_string()).or_default() += 1;
            if let Some(dt) = item.datetime {
                *daily.entry(dt.date_naive()).or_default() += 1;
            }
        }
        while daily.len() > DAILY_ACTIVITY_DAYS {
            daily.pop_first();
        }
        Self {
            total_items: items.len(),
            collections: collections.into_iter().collect(),
            daily_activity: daily,
        }
    }
}

/// Earliest acquisition in a snapshot, used for reporting windows.
pub fn earliest_datetime(items: &[CatalogItem]) -> Option<DateTime<Utc>> {
    items.iter().filter_map(|i| i.datetime).min()
}
