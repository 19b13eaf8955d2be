use geo::{BooleanOps, Coord, Line, LineString, MultiPolygon, Polygon};
use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

/// Build a polygon from an open or closed vertex ring, dropping repeated
/// consecutive vertices. Returns `None` for fewer than 3 distinct vertices.
pub fn ring_polygon(mut coords: Vec<Coord<f64>>) -> Option<Polygon<f64>> {
    coords.dedup();
    if coords.len() > 1 && coords.first() == coords.last() { coords.pop(); }
    if coords.len() < 3 { return None }
    Some(Polygon::new(LineString::new(coords), vec![]))
}

/// Whether the exterior ring crosses or folds back onto itself.
///
/// Only segment pairs with overlapping envelopes are tested.
pub fn has_self_intersection(polygon: &Polygon<f64>) -> bool {
    let envelope = |l: &Line<f64>| -> AABB<[f64; 2]> { AABB::from_corners(l.start.into(), l.end.into()) };
    let segments: Vec<Line<f64>> = polygon.exterior().lines().collect();
    let n = segments.len();
    let rtree = RTree::bulk_load(segments.iter().enumerate()
        .map(|(i, l)| GeomWithData::new(Rectangle::from_aabb(envelope(l)), i))
        .collect());

    segments.iter().enumerate().any(|(i, &a)| {
        rtree.locate_in_envelope_intersecting(&envelope(&a))
            .map(|hit| hit.data)
            .filter(|&j| j > i)
            .any(|j| {
                let adjacent = j == i + 1 || (i == 0 && j == n - 1);
                match line_intersection(a, segments[j]) {
                    None => false,
                    // Neighbours always share a vertex; only an overlap is a fault.
                    Some(LineIntersection::SinglePoint { .. }) => !adjacent,
                    Some(LineIntersection::Collinear { .. }) => true,
                }
            })
    })
}

/// Resolve self-intersections (bow-ties, zero-width spikes) into a valid
/// multipolygon. Valid input passes through untouched.
pub fn repair(polygon: Polygon<f64>) -> (MultiPolygon<f64>, bool) {
    if !has_self_intersection(&polygon) {
        return (MultiPolygon::new(vec![polygon]), false);
    }
    (polygon.union(&polygon), true)
}
