use std::f64::consts::TAU;

use geo::{Area, BooleanOps, BoundingRect, Contains, Coord, LineString, MultiLineString, MultiPolygon, Point, Polygon, Rect};
use rstar::AABB;

/// Planar disk approximated by a regular polygon, in projected meters.
#[derive(Debug, Clone)]
pub struct Buffer {
    center: Coord<f64>,
    radius_m: f64,
    polygon: Polygon<f64>,
    bbox: Rect<f64>,
}

impl Buffer {
    /// Build a disk of `radius_m` around `center` with `4 * quad_segments` vertices.
    pub fn disk(center: Coord<f64>, radius_m: f64, quad_segments: usize) -> Self {
        let n = 4 * quad_segments.max(1);
        let mut ring: Vec<Coord<f64>> = (0..n)
            .map(|i| {
                let theta = TAU * i as f64 / n as f64;
                Coord { x: center.x + radius_m * theta.cos(), y: center.y + radius_m * theta.sin() }
            })
            .collect();
        ring.push(ring[0]);

        let polygon = Polygon::new(LineString::new(ring), vec![]);
        let bbox = polygon.bounding_rect()
            .unwrap_or_else(|| Rect::new(center, center));
        Self { center, radius_m, polygon, bbox }
    }

    #[inline] pub fn center(&self) -> Coord<f64> { self.center }

    #[inline] pub fn radius_m(&self) -> f64 { self.radius_m }

    #[inline] pub fn polygon(&self) -> &Polygon<f64> { &self.polygon }

    /// Envelope for R-tree queries.
    #[inline]
    pub fn envelope(&self) -> AABB<[f64; 2]> {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }

    /// Area of the disk polygon in km².
    #[inline] pub fn area_km2(&self) -> f64 { self.polygon.unsigned_area() / 1e6 }

    /// Length in meters of the part of `line` inside the disk.
    pub fn clipped_length_m(&self, line: &LineString<f64>) -> f64 {
        let inside = self.polygon.clip(&MultiLineString::new(vec![line.clone()]), false);
        inside.iter().map(planar_length).sum()
    }

    /// Area in m² of the part of `shape` inside the disk.
    pub fn clipped_area_m2(&self, shape: &MultiPolygon<f64>) -> f64 {
        MultiPolygon::new(vec![self.polygon.clone()])
            .intersection(shape)
            .unsigned_area()
    }

    /// Whether the disk contains `point` (boundary excluded).
    #[inline]
    pub fn contains(&self, point: Coord<f64>) -> bool {
        self.polygon.contains(&Point::from(point))
    }
}

/// Sum of Euclidean segment lengths.
pub(crate) fn planar_length(line: &LineString<f64>) -> f64 {
    line.lines().map(|seg| seg.dx().hypot(seg.dy())).sum()
}
