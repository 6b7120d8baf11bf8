//! Page geometry in layout coordinates (origin top-left, y grows downwards).

use serde::{Deserialize, Serialize};

/// A point on a page.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Shift the point by the given offsets.
    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Axis-aligned bounding rectangle (x0, y0, x1, y1).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn center(&self) -> Point {
        Point::new((self.x0 + self.x1) * 0.5, (self.y0 + self.y1) * 0.5)
    }

    /// Left edge on the text baseline, where inserted text is anchored.
    pub fn baseline_anchor(&self) -> Point {
        Point::new(self.x0, self.y1)
    }

    /// Grow the rectangle by the same amount on every side.
    pub fn expand(&self, padding: f32) -> Self {
        self.expand_by(padding, padding, padding, padding)
    }

    /// Grow the rectangle by individual amounts per side.
    pub fn expand_by(&self, left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            x0: self.x0 - left,
            y0: self.y0 - top,
            x1: self.x1 + right,
            y1: self.y1 + bottom,
        }
    }

    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x0 && point.x <= self.x1 && point.y >= self.y0 && point.y <= self.y1
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x0 < other.x1 && self.x1 > other.x0 && self.y0 < other.y1 && self.y1 > other.y0
    }

    /// Two rectangles are the same visual occurrence when their top-left
    /// corners are closer than `tolerance` on both axes.
    pub fn is_near(&self, other: &Rect, tolerance: f32) -> bool {
        (self.x0 - other.x0).abs() < tolerance && (self.y0 - other.y0).abs() < tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_expand() {
        let rect = Rect::new(10.0, 20.0, 40.0, 30.0);
        assert_eq!(rect.expand(2.0), Rect::new(8.0, 18.0, 42.0, 32.0));
    }

    #[test]
    fn test_is_near() {
        let a = Rect::new(10.0, 20.0, 40.0, 30.0);
        let b = Rect::new(10.2, 20.1, 40.2, 30.1);
        let c = Rect::new(16.0, 20.0, 46.0, 30.0);
        assert!(a.is_near(&b, 5.0));
        assert!(!a.is_near(&c, 5.0));
    }

    #[test]
    fn test_baseline_anchor() {
        let rect = Rect::new(10.0, 20.0, 40.0, 30.0);
        assert_eq!(rect.baseline_anchor(), Point::new(10.0, 30.0));
    }
}
