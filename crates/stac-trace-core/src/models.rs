//! Core data models shared by the sync pipeline, the item store, and the
//! hotspot clusterer.
//!
//! A [`CatalogItem`] keeps the handful of STAC properties the engine reasons
//! about as typed fields and carries everything else in a residual JSON map,
//! so a missing provider key surfaces as `None` instead of a silent lookup
//! miss deep inside the clustering code.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use geo::BoundingRect;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Axis-aligned bounding box in `[minLon, minLat, maxLon, maxLat]` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BBox {
    pub const fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Parse a STAC `bbox` array. Both 2D (4 values) and 3D (6 values)
    /// boxes are accepted; the elevation axis is dropped.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        let bbox = match values.len() {
            4 => Self::new(values[0], values[1], values[2], values[3]),
            6 => Self::new(values[0], values[1], values[3], values[4]),
            _ => return None,
        };
        if bbox.to_array().iter().all(|v| v.is_finite()) {
            Some(bbox)
        } else {
            None
        }
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    /// Midpoint of the box as `(lat, lon)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_lat <= other.max_lat
            && self.max_lat >= other.min_lat
            && self.min_lon <= other.max_lon
            && self.max_lon >= other.min_lon
    }
}

/// Why a raw STAC feature could not become a [`CatalogItem`].
#[derive(Debug, Error, PartialEq)]
pub enum ItemParseError {
    #[error("feature has no string `id`")]
    MissingId,
    #[error("feature {0} has no geometry")]
    MissingGeometry(String),
    #[error("feature {id} has an invalid geometry: {reason}")]
    InvalidGeometry { id: String, reason: String },
}

/// One satellite image footprint as stored in the item store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Globally unique item id; the idempotency key for ingestion.
    pub id: String,
    /// Catalog host that produced the item (e.g. `oneatlas`).
    pub host: String,
    /// Ground footprint.
    pub geometry: geojson::Geometry,
    pub datetime: Option<DateTime<Utc>>,
    pub constellation: Option<String>,
    /// Ground sample distance in meters.
    pub resolution: Option<f64>,
    /// Provider-supplied centroid as `(lat, lon)`.
    pub provider_centroid: Option<(f64, f64)>,
    pub bbox: Option<BBox>,
    /// Residual STAC properties not promoted to typed fields.
    pub properties: Map<String, Value>,
    pub fetched_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Build an item from a raw STAC feature.
    ///
    /// Typed fields are resolved with the same fallbacks providers need in
    /// practice: the acquisition timestamp may live under
    /// `providerProperties`, the constellation may only be given as a
    /// collection name, and the bbox is derived from the geometry when the
    /// feature omits it.
    pub fn from_stac(
        feature: &Value,
        host: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, ItemParseError> {
        let id = feature
            .get("id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(ItemParseError::MissingId)?
            .to_string();

        let raw_geometry = feature
            .get("geometry")
            .filter(|g| !g.is_null())
            .ok_or_else(|| ItemParseError::MissingGeometry(id.clone()))?;
        let geometry: geojson::Geometry = serde_json::from_value(raw_geometry.clone())
            .map_err(|e| ItemParseError::InvalidGeometry {
                id: id.clone(),
                reason: e.to_string(),
            })?;

        let mut properties = feature
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let provider = properties
            .get("providerProperties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let datetime = ["datetime"]
            .iter()
            .filter_map(|k| properties.get(*k))
            .chain(
                ["acquisitionDate", "publicationDate"]
                    .iter()
                    .filter_map(|k| provider.get(*k)),
            )
            .filter_map(Value::as_str)
            .find_map(parse_datetime);

        let constellation = ["constellation", "collection"]
            .iter()
            .filter_map(|k| properties.get(*k))
            .filter_map(Value::as_str)
            .find(|s| !s.is_empty())
            .map(str::to_string);

        let resolution = ["resolution", "gsd"]
            .iter()
            .filter_map(|k| properties.get(*k))
            .chain(provider.get("resolution"))
            .find_map(Value::as_f64);

        let provider_centroid = provider
            .get("geometryCentroid")
            .and_then(|c| Some((c.get("lat")?.as_f64()?, c.get("lon")?.as_f64()?)));

        let bbox = feature
            .get("bbox")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_f64).collect::<Vec<_>>())
            .and_then(|vals| BBox::from_slice(&vals))
            .or_else(|| bbox_of(&geometry));

        for promoted in ["datetime", "constellation", "resolution"] {
            properties.remove(promoted);
        }

        Ok(Self {
            id,
            host: host.to_string(),
            geometry,
            datetime,
            constellation,
            resolution,
            provider_centroid,
            bbox,
            properties,
            fetched_at,
        })
    }

    /// The footprint converted to a `geo` geometry, if it is convertible.
    pub fn footprint(&self) -> Option<geo::Geometry<f64>> {
        geo::Geometry::<f64>::try_from(self.geometry.value.clone()).ok()
    }

    /// Constellation name used for per-collection statistics.
    pub fn collection_name(&self) -> &str {
        self.constellation.as_deref().unwrap_or("unknown")
    }
}

fn bbox_of(geometry: &geojson::Geometry) -> Option<BBox> {
    let geom = geo::Geometry::<f64>::try_from(geometry.value.clone()).ok()?;
    let rect = geom.bounding_rect()?;
    Some(BBox::new(
        rect.min().x,
        rect.min().y,
        rect.max().x,
        rect.max().y,
    ))
}

/// Parse an RFC 3339 timestamp, also accepting a bare `YYYY-MM-DD`.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Half-open acquisition time range `[start, end)` requested from a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SyncWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// The trailing `days` ending at `end`. `None` for zero days or a
    /// start before the earliest representable date.
    pub fn last_days(end: DateTime<Utc>, days: u32) -> Option<Self> {
        let start = end.checked_sub_signed(chrono::Duration::try_days(i64::from(days))?)?;
        Self::new(start, end)
    }

    /// STAC `datetime` interval, e.g. `2025-05-01T00:00:00Z/2025-05-08T00:00:00Z`.
    pub fn to_interval(&self) -> String {
        format!(
            "{}/{}",
            self.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.end.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

/// Audit row written once per (host, region, window) sync attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub host: String,
    pub region: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    /// Items that passed the sensor filter for this region, before dedup.
    pub items_added: u64,
    pub synced_at: DateTime<Utc>,
}

/// Filter for [`ItemStore::query_items`](crate::store::ItemStore::query_items).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemQuery {
    /// Only items acquired at or after this instant. Items without a
    /// datetime never match a bounded query.
    pub min_datetime: Option<DateTime<Utc>>,
    pub host: Option<String>,
}

impl ItemQuery {
    pub fn matches(&self, item: &CatalogItem) -> bool {
        if let Some(min) = self.min_datetime {
            match item.datetime {
                Some(dt) if dt >= min => {}
                _ => return false,
            }
        }
        if let Some(ref host) = self.host {
            if &item.host != host {
                return false;
            }
        }
        true
    }
}

/// A `(key, count)` row returned by the store's aggregate queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountRow {
    pub key: String,
    pub count: i64,
}

/// A cluster of co-located image footprints.
#[derive(Debug, Clone, PartialEq)]
pub struct Hotspot {
    /// Stable id of the super-cell or connected component.
    pub cluster_key: String,
    pub image_count: usize,
    /// Member item ids, sorted.
    pub item_ids: Vec<String>,
    /// Mean of the member item centroids (not the hull centroid).
    pub centroid_lat: f64,
    pub centroid_lon: f64,
    /// Convex hull of the member footprints.
    pub hull: geo::Polygon<f64>,
    /// Set when the raw hull was degenerate and had to be rebuilt.
    pub hull_repaired: bool,
    pub earliest_datetime: Option<DateTime<Utc>>,
    pub latest_datetime: Option<DateTime<Utc>>,
    /// Most common constellation among members.
    pub primary_collection: String,
    pub location_name: Option<String>,
}
