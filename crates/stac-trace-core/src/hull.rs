//! Hotspot polygon synthesis.
//!
//! The hull of the union of a set of footprints is the hull of all their
//! vertices, so the union step never has to materialise a (possibly
//! self-intersecting) multi-polygon. What remains is the degenerate case:
//! identical or collinear inputs collapse the hull to a point or a sliver.
//! Those hulls are rebuilt from the members' bounding rectangle, padded when
//! it has no width or height, and flagged as repaired.

use geo::{Area, BoundingRect, ConvexHull, Coord, CoordsIter, Geometry, MultiPoint, Point, Polygon, Rect};

/// Padding in degrees applied to a zero-width or zero-height bounding box.
const DEGENERATE_PAD_DEG: f64 = 1e-4;

/// Smallest hull area (square degrees) treated as non-degenerate.
const MIN_AREA: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct HullResult {
    pub polygon: Polygon<f64>,
    /// The raw hull was degenerate and was replaced.
    pub repaired: bool,
}

/// Convex hull over every vertex of `footprints` plus `extra_points`.
///
/// `extra_points` are `(lat, lon)` pairs; the clusterer passes member
/// centroids for items whose footprint could not be converted. Returns
/// `None` only when there are no finite coordinates at all.
pub fn footprint_hull(footprints: &[Geometry<f64>], extra_points: &[(f64, f64)]) -> Option<HullResult> {
    let mut coords: Vec<Coord<f64>> = footprints
        .iter()
        .flat_map(|g| g.coords_iter())
        .collect();
    coords.extend(extra_points.iter().map(|&(lat, lon)| Coord { x: lon, y: lat }));
    coords.retain(|c| c.x.is_finite() && c.y.is_finite());
    if coords.is_empty() {
        return None;
    }

    let points = MultiPoint::new(coords.iter().copied().map(Point::from).collect());
    let hull = points.convex_hull();
    if is_valid_simple_polygon(&hull) {
        return Some(HullResult {
            polygon: hull,
            repaired: false,
        });
    }

    let rect = points.bounding_rect()?;
    Some(HullResult {
        polygon: padded(rect).to_polygon(),
        repaired: true,
    })
}

fn padded(rect: Rect<f64>) -> Rect<f64> {
    let (mut min, mut max) = (rect.min(), rect.max());
    if max.x - min.x < DEGENERATE_PAD_DEG {
        min.x -= DEGENERATE_PAD_DEG;
        max.x += DEGENERATE_PAD_DEG;
    }
    if max.y - min.y < DEGENERATE_PAD_DEG {
        min.y -= DEGENERATE_PAD_DEG;
        max.y += DEGENERATE_PAD_DEG;
    }
    Rect::new(min, max)
}

/// Validity check applied to every emitted hull.
///
/// A hull is accepted when its exterior is a closed ring of at least three
/// distinct finite vertices, it has no holes, it encloses positive area, and
/// no two non-adjacent edges intersect.
pub fn is_valid_simple_polygon(polygon: &Polygon<f64>) -> bool {
    let ring = &polygon.exterior().0;
    if ring.len() < 4 || !polygon.interiors().is_empty() {
        return false;
    }
    if ring.first() != ring.last() {
        return false;
    }
    if ring.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return false;
    }
    let vertices = &ring[..ring.len() - 1];
    for (i, a) in vertices.iter().enumerate() {
        if vertices[i + 1..].contains(a) {
            return false;
        }
    }
    if polygon.unsigned_area() <= MIN_AREA {
        return false;
    }

    let n = vertices.len();
    for i in 0..n {
        let (a1, a2) = (vertices[i], vertices[(i + 1) % n]);
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (b1, b2) = (vertices[j], vertices[(j + 1) % n]);
            if segments_cross(a1, a2, b1, b2) {
                return false;
            }
        }
    }
    true
}

fn orientation(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn segments_cross(a1: Coord<f64>, a2: Coord<f64>, b1: Coord<f64>, b2: Coord<f64>) -> bool {
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, LineString};

    fn square(lon: f64, lat: f64, size: f64) -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: lon, y: lat),
            (x: lon + size, y: lat),
            (x: lon + size, y: lat + size),
            (x: lon, y: lat + size),
            (x: lon, y: lat),
        ])
    }

    #[test]
    fn test_hull_spans_all_footprints() {
        let result = footprint_hull(&[square(0.0, 0.0, 1.0), square(2.0, 2.0, 1.0)], &[]).unwrap();
        assert!(!result.repaired);
        assert!(is_valid_simple_polygon(&result.polygon));
        let rect = result.polygon.bounding_rect().unwrap();
        assert_eq!(rect.min(), Coord { x: 0.0, y: 0.0 });
        assert_eq!(rect.max(), Coord { x: 3.0, y: 3.0 });
    }

    #[test]
    fn test_identical_points_are_repaired() {
        let result = footprint_hull(&[], &[(47.05, 39.02), (47.05, 39.02)]).unwrap();
        assert!(result.repaired);
        assert!(is_valid_simple_polygon(&result.polygon));
        assert!(result.polygon.unsigned_area() > 0.0);
    }

    #[test]
    fn test_collinear_points_are_repaired() {
        let result = footprint_hull(&[], &[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]).unwrap();
        assert!(result.repaired);
        assert!(is_valid_simple_polygon(&result.polygon));
    }

    #[test]
    fn test_no_coordinates() {
        assert!(footprint_hull(&[], &[]).is_none());
    }

    #[test]
    fn test_bowtie_is_invalid() {
        let bowtie = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 1.0), (1.0, 0.0), (0.0, 1.0), (0.0, 0.0)]),
            vec![],
        );
        assert!(!is_valid_simple_polygon(&bowtie));
    }
}
