use geo::Rect;
use rstar::{RTree, RTreeObject, AABB};

/// A bounding box in an R-tree, associated with a projected shape by index.
#[derive(Debug, Clone)]
pub struct BoundingBox {
    idx: usize, // Index of corresponding shape in the caller's list
    bbox: Rect<f64>,
}

impl BoundingBox {
    pub fn new(idx: usize, bbox: Rect<f64>) -> Self {
        Self { idx, bbox }
    }

    /// Get the index of the corresponding shape.
    #[inline] pub fn idx(&self) -> usize { self.idx }
}

impl RTreeObject for BoundingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// Indices of all boxes whose envelope intersects `envelope`, in ascending order.
pub fn intersecting(boxes: Vec<BoundingBox>, envelope: &AABB<[f64; 2]>) -> Vec<usize> {
    let rtree = RTree::bulk_load(boxes);
    let mut hits: Vec<usize> = rtree.locate_in_envelope_intersecting(envelope)
        .map(BoundingBox::idx)
        .collect();
    hits.sort_unstable();
    hits
}

#[cfg(test)]
mod tests {
    use geo::Coord;

    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Rect<f64> {
        Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 })
    }

    #[test]
    fn finds_only_overlapping_boxes() {
        let boxes = vec![
            BoundingBox::new(0, rect(0.0, 0.0, 1.0, 1.0)),
            BoundingBox::new(1, rect(5.0, 5.0, 6.0, 6.0)),
            BoundingBox::new(2, rect(0.5, 0.5, 2.0, 2.0)),
        ];
        let env = AABB::from_corners([0.9, 0.9], [1.1, 1.1]);
        assert_eq!(intersecting(boxes, &env), vec![0, 2]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let env = AABB::from_corners([0.0, 0.0], [1.0, 1.0]);
        assert!(intersecting(Vec::new(), &env).is_empty());
    }
}
