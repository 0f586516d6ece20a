//! Taskable-sensor filter.
//!
//! Hotspots are only meaningful for imagery that somebody asked for. Wide-area
//! survey constellations and anything coarser than the taskable resolution
//! threshold are dropped. The same filter runs at fetch time (to keep the
//! store small) and again inside the clusterer, which can be fed items that
//! never went through the store.

use serde::Deserialize;

use crate::models::CatalogItem;

/// Coarsest ground sample distance (meters) still treated as taskable.
pub const DEFAULT_MAX_RESOLUTION: f64 = 0.75;

/// Wide-area constellation excluded from hotspot detection.
pub const DEFAULT_EXCLUDED_CONSTELLATION: &str = "spot";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SensorFilter {
    #[serde(default = "default_max_resolution")]
    pub max_resolution: f64,
    #[serde(default = "default_excluded_constellation")]
    pub excluded_constellation: String,
}

fn default_max_resolution() -> f64 {
    DEFAULT_MAX_RESOLUTION
}

fn default_excluded_constellation() -> String {
    DEFAULT_EXCLUDED_CONSTELLATION.to_string()
}

impl Default for SensorFilter {
    fn default() -> Self {
        Self {
            max_resolution: DEFAULT_MAX_RESOLUTION,
            excluded_constellation: DEFAULT_EXCLUDED_CONSTELLATION.to_string(),
        }
    }
}

impl SensorFilter {
    /// Whether an item comes from a taskable high-resolution sensor.
    ///
    /// Items that do not report a resolution are kept: the constellation
    /// check still applies, and dropping them would hide providers that
    /// simply leave the field out.
    pub fn accepts(&self, item: &CatalogItem) -> bool {
        if let Some(ref constellation) = item.constellation {
            if constellation.eq_ignore_ascii_case(&self.excluded_constellation) {
                return false;
            }
        }
        match item.resolution {
            Some(gsd) => gsd <= self.max_resolution,
            None => true,
        }
    }

    /// Keep accepted items, returning them with the number dropped.
    pub fn apply(&self, items: Vec<CatalogItem>) -> (Vec<CatalogItem>, usize) {
        let before = items.len();
        let kept: Vec<CatalogItem> = items.into_iter().filter(|i| self.accepts(i)).collect();
        let dropped = before - kept.len();
        (kept, dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn item(constellation: Option<&str>, resolution: Option<f64>) -> CatalogItem {
        let mut props = serde_json::Map::new();
        if let Some(c) = constellation {
            props.insert("constellation".into(), json!(c));
        }
        if let Some(r) = resolution {
            props.insert("resolution".into(), json!(r));
        }
        let feature = json!({
            "id": "i",
            "geometry": { "type": "Point", "coordinates": [0.0, 0.0] },
            "properties": props,
        });
        CatalogItem::from_stac(&feature, "oneatlas", Utc::now()).unwrap()
    }

    #[test]
    fn test_excludes_spot_case_insensitive() {
        let f = SensorFilter::default();
        assert!(!f.accepts(&item(Some("SPOT"), Some(0.5))));
        assert!(!f.accepts(&item(Some("Spot"), None)));
        assert!(f.accepts(&item(Some("PHR"), Some(0.5))));
    }

    #[test]
    fn test_resolution_threshold_inclusive() {
        let f = SensorFilter::default();
        assert!(f.accepts(&item(Some("PHR"), Some(0.75))));
        assert!(!f.accepts(&item(Some("PHR"), Some(0.76))));
        assert!(f.accepts(&item(Some("PHR"), None)));
    }

    #[test]
    fn test_apply_counts_dropped() {
        let f = SensorFilter::default();
        let (kept, dropped) = f.apply(vec![
            item(Some("PHR"), Some(0.5)),
            item(Some("spot"), Some(1.5)),
            item(Some("SPOT"), Some(0.5)),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(dropped, 2);
    }
}
