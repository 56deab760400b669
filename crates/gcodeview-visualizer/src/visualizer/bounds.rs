//! Axis-aligned bounding boxes of the loaded toolpaths.

use glam::Vec3;
use serde::Serialize;

/// Bounding box accumulator used while building toolpaths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundingBox {
    pub fn new() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    pub fn update(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn merge(&mut self, other: &BoundingBox) {
        if other.is_valid() {
            self.update(other.min);
            self.update(other.max);
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite()
            && self.max.is_finite()
            // flat boxes (a single layer) are valid
            && self.min.cmple(self.max).all()
    }

    pub fn size(&self) -> Vec3 {
        if self.is_valid() {
            self.max - self.min
        } else {
            Vec3::ZERO
        }
    }

    pub fn center(&self) -> Vec3 {
        if self.is_valid() {
            (self.min + self.max) * 0.5
        } else {
            Vec3::ZERO
        }
    }

    /// Copy of this box grown upward by `height`, room for the tool marker.
    pub fn extended_up(&self, height: f32) -> BoundingBox {
        let mut extended = *self;
        if self.is_valid() {
            extended.update(self.max + Vec3::Z * height);
        }
        extended
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulation() {
        let mut bbox = BoundingBox::new();
        assert!(!bbox.is_valid());
        assert_eq!(bbox.size(), Vec3::ZERO);

        bbox.update(Vec3::new(1.0, 2.0, 0.2));
        assert!(bbox.is_valid());
        bbox.update(Vec3::new(-1.0, 5.0, 0.2));
        assert_eq!(bbox.min, Vec3::new(-1.0, 2.0, 0.2));
        assert_eq!(bbox.max, Vec3::new(1.0, 5.0, 0.2));
        assert_eq!(bbox.center(), Vec3::new(0.0, 3.5, 0.2));
    }

    #[test]
    fn test_extended_up() {
        let mut bbox = BoundingBox::new();
        bbox.update(Vec3::ZERO);
        bbox.update(Vec3::new(10.0, 10.0, 2.0));
        let max = bbox.extended_up(3.0);
        assert_eq!(max.max, Vec3::new(10.0, 10.0, 5.0));
        assert_eq!(max.min, bbox.min);

        assert!(!BoundingBox::new().extended_up(3.0).is_valid());

        let mut merged = BoundingBox::new();
        merged.merge(&BoundingBox::new());
        assert!(!merged.is_valid());
        merged.merge(&bbox);
        assert_eq!(merged, bbox);
    }
}
