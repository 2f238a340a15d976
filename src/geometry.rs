//! Screen-space points and rectangles in client coordinates.

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle, edges inclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Normalized rectangle spanned by two corners in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            right: a.x.max(b.x),
            bottom: a.y.max(b.y),
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Bounding-box overlap; touching edges count as overlapping.
    ///
    /// ```rust
    /// use flipbook_core_view::Rect;
    ///
    /// let a = Rect::new(0.0, 0.0, 10.0, 10.0);
    /// assert!(a.intersects(&Rect::new(10.0, 10.0, 20.0, 20.0)));
    /// assert!(!a.intersects(&Rect::new(10.5, 0.0, 20.0, 10.0)));
    /// ```
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.right < other.left
            || self.left > other.right
            || self.bottom < other.top
            || self.top > other.bottom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_normalize() {
        let r = Rect::from_corners(Point::new(30.0, 5.0), Point::new(10.0, 25.0));
        assert_eq!(r, Rect::new(10.0, 5.0, 30.0, 25.0));
        assert_eq!(r.width(), 20.0);
        assert_eq!(r.height(), 20.0);
    }

    #[test]
    fn intersection_cases() {
        let card = Rect::from_xywh(100.0, 100.0, 50.0, 50.0);
        assert!(card.intersects(&Rect::new(90.0, 90.0, 110.0, 110.0)));
        assert!(card.intersects(&Rect::new(0.0, 0.0, 500.0, 500.0)));
        assert!(Rect::new(120.0, 120.0, 121.0, 121.0).intersects(&card));
        assert!(!card.intersects(&Rect::new(0.0, 0.0, 99.0, 500.0)));
        assert!(!card.intersects(&Rect::new(0.0, 151.0, 500.0, 200.0)));
    }
}
