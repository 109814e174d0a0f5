use glam::{Mat4, Vec3};

/// Axis-aligned bounding box over scene geometry.
///
/// Starts empty (inverted bounds) and grows as points are added, so a box
/// computed over a scene with no materialized geometry stays empty instead of
/// collapsing to the origin.
#[derive(Copy, Clone, Debug)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// An empty box: any union or grow replaces it.
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    /// True when no point has been added yet.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// True when the box encloses exactly one point (all extents zero).
    /// A flat box (one or two zero extents) is not a point.
    pub fn is_point(&self) -> bool {
        !self.is_empty() && self.min == self.max
    }

    pub fn grow(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Extent along each axis. Zero for an empty box.
    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Largest single-axis extent.
    pub fn max_extent(&self) -> f32 {
        let s = self.size();
        s.x.max(s.y).max(s.z)
    }

    /// Box enclosing all eight corners after an affine transform.
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let mut out = Aabb::empty();
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.grow(matrix.transform_point3(corner));
        }
        out
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_box_reports_empty() {
        let aabb = Aabb::empty();
        assert!(aabb.is_empty());
        assert!(!aabb.is_point());
        assert_eq!(aabb.size(), Vec3::ZERO);
    }

    #[test]
    fn test_grow_from_empty() {
        let mut aabb = Aabb::empty();
        aabb.grow(Vec3::new(1.0, 2.0, 3.0));
        assert!(!aabb.is_empty());
        assert!(aabb.is_point());

        aabb.grow(Vec3::new(-1.0, 0.0, 0.0));
        assert!(!aabb.is_point());
        assert_eq!(aabb.min, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_center() {
        let aabb = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(aabb.center(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_center_negative() {
        let aabb = Aabb::new(Vec3::new(-2.0, -4.0, -6.0), Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(aabb.center(), Vec3::ZERO);
    }

    #[test]
    fn test_union_non_overlapping() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::splat(2.0), Vec3::splat(3.0));
        let union = a.union(&b);
        assert_eq!(union.min, Vec3::ZERO);
        assert_eq!(union.max, Vec3::splat(3.0));
    }

    #[test]
    fn test_union_with_empty_is_identity() {
        let a = Aabb::new(Vec3::splat(-1.0), Vec3::ONE);
        let union = a.union(&Aabb::empty());
        assert_eq!(union.min, a.min);
        assert_eq!(union.max, a.max);
    }

    #[test]
    fn test_max_extent_picks_largest_axis() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::new(2.0, 3.0, 4.0));
        assert_eq!(aabb.max_extent(), 4.0);
    }

    #[test]
    fn test_flat_box_is_not_a_point() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 2.0));
        assert!(!aabb.is_point());
        assert_eq!(aabb.max_extent(), 2.0);
    }

    #[test]
    fn test_transformed_translation() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::ONE);
        let moved = aabb.transformed(&Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)));
        assert_eq!(moved.min, Vec3::new(4.0, -1.0, -1.0));
        assert_eq!(moved.max, Vec3::new(6.0, 1.0, 1.0));
    }

    #[test]
    fn test_transformed_scale() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::ONE);
        let scaled = aabb.transformed(&Mat4::from_scale(Vec3::splat(2.0)));
        assert_eq!(scaled.min, Vec3::splat(-2.0));
        assert_eq!(scaled.max, Vec3::splat(2.0));
    }

    #[test]
    fn test_transformed_empty_stays_empty() {
        let aabb = Aabb::empty();
        let moved = aabb.transformed(&Mat4::from_translation(Vec3::ONE));
        assert!(moved.is_empty());
    }
}
