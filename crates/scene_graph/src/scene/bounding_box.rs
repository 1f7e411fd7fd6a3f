//! Axis-aligned bounding box for spatial aggregation
//!
//! The box has an explicit empty state so that aggregating zero children is
//! well defined: an empty box is the identity element of [`expand_by`]
//! (`BoundingBox::expand_by`) and stays empty under transformation.

use crate::foundation::math::{Affine3, Point3, Vec3};

/// Axis-Aligned Bounding Box with an explicit empty state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    min: Point3,
    max: Point3,
}

impl BoundingBox {
    /// Create an empty bounding box
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::MAX, f32::MAX, f32::MAX),
            max: Point3::new(-f32::MAX, -f32::MAX, -f32::MAX),
        }
    }

    /// Create a bounding box from min and max corners
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Create a bounding box centered at a point with given half-extents
    pub fn from_center_extents(center: Point3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Whether the box contains no volume at all (never expanded)
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Reset the box to the empty state
    pub fn clear(&mut self) {
        *self = Self::empty();
    }

    /// Minimum corner of the box
    pub fn min(&self) -> Point3 {
        self.min
    }

    /// Maximum corner of the box
    pub fn max(&self) -> Point3 {
        self.max
    }

    /// Get the center of the box
    ///
    /// The center of an empty box is meaningless; check [`Self::is_empty`]
    /// first when the box may not have been expanded yet.
    pub fn center(&self) -> Point3 {
        self.min + (self.max - self.min) * 0.5
    }

    /// Get the half-size of the box
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Grow the box to contain a point
    pub fn expand_by_point(&mut self, point: Point3) {
        self.min = Point3::new(
            self.min.x.min(point.x),
            self.min.y.min(point.y),
            self.min.z.min(point.z),
        );
        self.max = Point3::new(
            self.max.x.max(point.x),
            self.max.y.max(point.y),
            self.max.z.max(point.z),
        );
    }

    /// Grow the box to contain another box
    pub fn expand_by(&mut self, other: &BoundingBox) {
        if !other.is_empty() {
            self.expand_by_point(other.min);
            self.expand_by_point(other.max);
        }
    }

    /// Apply an affine transform to the box
    ///
    /// All eight corners are transformed and re-aggregated, so the result is
    /// the tightest axis-aligned box around the transformed original. Empty
    /// boxes stay empty.
    pub fn transform(&mut self, transform: &Affine3) {
        if self.is_empty() {
            return;
        }
        let (min, max) = (self.min, self.max);
        let mut transformed = Self::empty();
        for corner in 0..8 {
            let p = Point3::new(
                if corner & 1 == 0 { min.x } else { max.x },
                if corner & 2 == 0 { min.y } else { max.y },
                if corner & 4 == 0 { min.z } else { max.z },
            );
            transformed.expand_by_point(transform.transform_point(&p));
        }
        *self = transformed;
    }

    /// Check if this box contains a point
    pub fn contains_point(&self, point: Point3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Check if this box intersects another box
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{affine_from_isometry, Isometry3};
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_box() {
        let mut bbox = BoundingBox::empty();
        assert!(bbox.is_empty());

        bbox.expand_by_point(Point3::new(1.0, 2.0, 3.0));
        assert!(!bbox.is_empty());
        assert_eq!(bbox.min(), Point3::new(1.0, 2.0, 3.0));
        assert_eq!(bbox.max(), Point3::new(1.0, 2.0, 3.0));

        bbox.clear();
        assert!(bbox.is_empty());
    }

    #[test]
    fn test_expand_by_is_identity_for_empty_operand() {
        let mut bbox = BoundingBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let before = bbox;
        bbox.expand_by(&BoundingBox::empty());
        assert_eq!(bbox, before);
    }

    #[test]
    fn test_expand_by_merges_boxes() {
        let mut bbox = BoundingBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        bbox.expand_by(&BoundingBox::new(
            Point3::new(-2.0, 0.5, 0.0),
            Point3::new(-1.0, 3.0, 0.5),
        ));
        assert_eq!(bbox.min(), Point3::new(-2.0, 0.0, 0.0));
        assert_eq!(bbox.max(), Point3::new(1.0, 3.0, 1.0));
    }

    #[test]
    fn test_transform_translates_box() {
        let mut bbox = BoundingBox::from_center_extents(Point3::origin(), Vec3::new(0.5, 0.5, 0.5));
        bbox.transform(&affine_from_isometry(&Isometry3::translation(1.0, 0.0, 0.0)));
        assert_relative_eq!(bbox.center(), Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(bbox.extents(), Vec3::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn test_transform_rotation_reaggregates_corners() {
        let mut bbox = BoundingBox::from_center_extents(Point3::origin(), Vec3::new(2.0, 1.0, 1.0));
        let quarter_turn = Isometry3::rotation(Vec3::new(0.0, 0.0, std::f32::consts::FRAC_PI_2));
        bbox.transform(&affine_from_isometry(&quarter_turn));
        assert_relative_eq!(bbox.extents(), Vec3::new(1.0, 2.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_transform_keeps_empty_box_empty() {
        let mut bbox = BoundingBox::empty();
        bbox.transform(&affine_from_isometry(&Isometry3::translation(5.0, 5.0, 5.0)));
        assert!(bbox.is_empty());
    }

    #[test]
    fn test_contains_point() {
        let bbox = BoundingBox::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        assert!(bbox.contains_point(Point3::origin()));
        assert!(bbox.contains_point(Point3::new(0.5, 0.5, 0.5)));
        assert!(!bbox.contains_point(Point3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_intersects() {
        let a = BoundingBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 2.0));
        let b = BoundingBox::new(Point3::new(1.0, 1.0, 1.0), Point3::new(3.0, 3.0, 3.0));
        let c = BoundingBox::new(Point3::new(5.0, 5.0, 5.0), Point3::new(7.0, 7.0, 7.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}
