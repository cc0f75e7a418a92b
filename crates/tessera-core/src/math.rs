//! Math utilities
//!
//! Re-exports from glam and the 2D rectangle types used for page and tile
//! placement.

use serde::{Deserialize, Serialize};

pub use glam::{IVec2, Mat4, Quat, UVec2, Vec2, Vec3, Vec4};

/// Integer axis-aligned rectangle (origin at the minimum corner)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RectI {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl RectI {
    /// Create a rectangle from position and size
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Exclusive maximum x
    pub fn x_max(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive maximum y
    pub fn y_max(&self) -> i32 {
        self.y + self.height
    }

    /// Check if a point is inside the rectangle
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x_max() && y >= self.y && y < self.y_max()
    }

    /// Convert to a floating point rectangle
    pub fn as_rect(&self) -> Rect {
        Rect::new(self.x as f32, self.y as f32, self.width as f32, self.height as f32)
    }
}

/// Floating point axis-aligned rectangle (origin at the minimum corner)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Create a rectangle from position and size
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Create a rectangle from its min and max corners
    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.width, self.y + self.height)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Check if this rectangle overlaps another (touching edges do not count)
    pub fn overlaps(&self, other: &Rect) -> bool {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());
        a_min.x < b_max.x && a_max.x > b_min.x && a_min.y < b_max.y && a_max.y > b_min.y
    }

    /// Intersection of two rectangles, `None` when they do not overlap
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Rect::from_min_max(self.min().max(other.min()), self.max().min(other.max())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_i_contains() {
        let rect = RectI::new(4, 8, 4, 4);
        assert!(rect.contains(4, 8));
        assert!(rect.contains(7, 11));
        assert!(!rect.contains(8, 11));
        assert_eq!(rect.x_max(), 8);
        assert_eq!(rect.y_max(), 12);
    }

    #[test]
    fn test_rect_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        let c = Rect::new(10.0, 0.0, 5.0, 5.0);

        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_rect_intersection() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, -5.0, 10.0, 10.0);

        let i = a.intersection(&b).unwrap();
        assert_eq!(i, Rect::new(5.0, 0.0, 5.0, 5.0));
        assert!(a.intersection(&Rect::new(20.0, 20.0, 1.0, 1.0)).is_none());
    }
}
