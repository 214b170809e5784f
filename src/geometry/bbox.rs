//! Axis-aligned bounding box with independently-optional corners.
//!
//! A box starts "unset" on every side; unioning in a shape only ever widens
//! it. This mirrors `none_min`/`none_max` in the original renderer, where a
//! group's box is the union of its children and an empty group has no box
//! at all.

use super::transform;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    x1: Option<f64>,
    y1: Option<f64>,
    x2: Option<f64>,
    y2: Option<f64>,
}

impl BoundingBox {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x1: Some(x), y1: Some(y), x2: Some(x + width), y2: Some(y + height) }
    }

    pub fn circle(cx: f64, cy: f64, r: f64) -> Self {
        Self { x1: Some(cx - r), y1: Some(cy - r), x2: Some(cx + r), y2: Some(cy + r) }
    }

    pub fn from_points(points: &[(f64, f64)]) -> Self {
        let mut b = Self::empty();
        for &(x, y) in points {
            b.union(&Self { x1: Some(x), y1: Some(y), x2: Some(x), y2: Some(y) });
        }
        b
    }

    pub fn is_empty(&self) -> bool {
        self.x1.is_none()
    }

    pub fn corners(&self) -> Option<(f64, f64, f64, f64)> {
        Some((self.x1?, self.y1?, self.x2?, self.y2?))
    }

    pub fn width(&self) -> f64 {
        self.corners().map(|(x1, _, x2, _)| x2 - x1).unwrap_or(0.0)
    }

    pub fn height(&self) -> f64 {
        self.corners().map(|(_, y1, _, y2)| y2 - y1).unwrap_or(0.0)
    }

    /// Widens `self` to cover `other`; an empty side takes the other's value
    /// outright rather than comparing against a sentinel.
    pub fn union(&mut self, other: &BoundingBox) {
        self.x1 = none_min(self.x1, other.x1);
        self.y1 = none_min(self.y1, other.y1);
        self.x2 = none_max(self.x2, other.x2);
        self.y2 = none_max(self.y2, other.y2);
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x1 = self.x1.map(|v| v + dx);
        self.x2 = self.x2.map(|v| v + dx);
        self.y1 = self.y1.map(|v| v + dy);
        self.y2 = self.y2.map(|v| v + dy);
    }

    /// Applies every primitive parsed out of an SVG `transform` attribute
    /// value, in reverse textual order (the primitive closest to the shape
    /// in the attribute string is applied last, matching SVG semantics).
    pub fn apply_transform(&mut self, transform_attr: &str) {
        if self.is_empty() {
            return;
        }
        for prim in transform::parse(transform_attr).into_iter().rev() {
            match prim {
                transform::Primitive::Translate(dx, dy) => self.translate(dx, dy),
                transform::Primitive::Scale(sx, sy) => self.scale(sx, sy),
                transform::Primitive::Ignored(_) => {}
            }
        }
    }

    /// Scales both corners; a negative factor can leave `x1 > x2` (or
    /// `y1 > y2`), so each axis is swapped back into `lo <= hi` order
    /// afterward rather than flipping the shape itself.
    fn scale(&mut self, sx: f64, sy: f64) {
        self.x1 = self.x1.map(|v| v * sx);
        self.x2 = self.x2.map(|v| v * sx);
        self.y1 = self.y1.map(|v| v * sy);
        self.y2 = self.y2.map(|v| v * sy);
        if let (Some(a), Some(b)) = (self.x1, self.x2) {
            if a > b {
                self.x1 = Some(b);
                self.x2 = Some(a);
            }
        }
        if let (Some(a), Some(b)) = (self.y1, self.y2) {
            if a > b {
                self.y1 = Some(b);
                self.y2 = Some(a);
            }
        }
    }
}

fn none_min(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

fn none_max(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assertables::*;

    #[test]
    fn empty_union_adopts_other() {
        let mut a = BoundingBox::empty();
        a.union(&BoundingBox::rectangle(1.0, 2.0, 3.0, 4.0));
        assert_eq!(a.corners(), Some((1.0, 2.0, 4.0, 6.0)));
    }

    #[test]
    fn union_widens_both_sides() {
        let mut a = BoundingBox::rectangle(0.0, 0.0, 10.0, 10.0);
        a.union(&BoundingBox::rectangle(-5.0, 5.0, 2.0, 2.0));
        let (x1, y1, x2, y2) = a.corners().unwrap();
        assert_eq!(x1, -5.0);
        assert_eq!(y1, 0.0);
        assert_gt!(x2, 9.0);
        assert_gt!(y2, 9.0);
    }

    #[test]
    fn translate_moves_every_corner() {
        let mut a = BoundingBox::rectangle(0.0, 0.0, 2.0, 2.0);
        a.translate(3.0, -1.0);
        assert_eq!(a.corners(), Some((3.0, -1.0, 5.0, 1.0)));
    }

    #[test]
    fn apply_transform_composes_right_to_left() {
        let mut a = BoundingBox::rectangle(0.0, 0.0, 1.0, 1.0);
        a.apply_transform("translate(10,0) scale(2,2)");
        // scale first (closest to shape), then translate.
        assert_eq!(a.corners(), Some((10.0, 0.0, 12.0, 2.0)));
    }

    #[test]
    fn negative_scale_swaps_corners_back_into_order() {
        let mut a = BoundingBox::rectangle(2.0, 2.0, 4.0, 4.0); // (2,2,6,6)
        a.apply_transform("scale(-1,-1)");
        let (x1, y1, x2, y2) = a.corners().unwrap();
        assert!(x1 <= x2);
        assert!(y1 <= y2);
        assert_eq!((x1, y1, x2, y2), (-6.0, -6.0, -2.0, -2.0));
    }

    #[test]
    fn empty_box_has_no_corners() {
        assert_all!([BoundingBox::empty().is_empty()].iter(), |b: &&bool| **b);
    }
}
