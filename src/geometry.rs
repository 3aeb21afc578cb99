//! Planar value types shared by the grid, transform and adoption code

use serde::{Deserialize, Serialize};

/// A 2D point, either normalized chart space or image pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Point::new(x, y)
    }
}

/// Width/height pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Size {
    pub w: f64,
    pub h: f64,
}

impl Size {
    pub const fn new(w: f64, h: f64) -> Self {
        Self { w, h }
    }
}

/// Corner handle of a chart quadrilateral.
///
/// The discriminant is the row index inside a [`Quad`]; the order
/// top-left, top-right, bottom-left, bottom-right is part of the contract
/// with the unit square `(0,0), (1,0), (0,1), (1,1)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CornerId {
    TopLeft = 0,
    TopRight = 1,
    BottomLeft = 2,
    BottomRight = 3,
}

impl CornerId {
    pub const ALL: [CornerId; 4] = [
        CornerId::TopLeft,
        CornerId::TopRight,
        CornerId::BottomLeft,
        CornerId::BottomRight,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CornerId::TopLeft => "Top Left",
            CornerId::TopRight => "Top Right",
            CornerId::BottomLeft => "Bottom Left",
            CornerId::BottomRight => "Bottom Right",
        }
    }
}

/// Four corners in top-left, top-right, bottom-left, bottom-right order
pub type Quad = [Point; 4];

/// Axis-aligned bounding box `(min, max)` of a set of points
pub fn bounds(points: &[Point]) -> (Point, Point) {
    let mut min = Point::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    (min, max)
}

/// Whether every point lies inside `[0, width] x [0, height]`
pub fn fits_inside(points: &[Point], width: f64, height: f64) -> bool {
    points
        .iter()
        .all(|p| p.x >= 0.0 && p.x <= width && p.y >= 0.0 && p.y <= height)
}

/// Canonical unit square in quad order
pub const UNIT_SQUARE: Quad = [
    Point::new(0.0, 0.0),
    Point::new(1.0, 0.0),
    Point::new(0.0, 1.0),
    Point::new(1.0, 1.0),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_conversion() {
        assert_eq!(Point::from((0.5, 0.25)), Point::new(0.5, 0.25));
        assert_eq!(Point::from([1.0, 2.0]), Point::new(1.0, 2.0));
    }

    #[test]
    fn test_bounds_and_fit() {
        let pts = [Point::new(10.0, 5.0), Point::new(-1.0, 20.0), Point::new(3.0, 3.0)];
        let (min, max) = bounds(&pts);
        assert_eq!(min, Point::new(-1.0, 3.0));
        assert_eq!(max, Point::new(10.0, 20.0));
        assert!(!fits_inside(&pts, 100.0, 100.0));
        assert!(fits_inside(&pts[..1], 10.0, 5.0));
    }

    #[test]
    fn test_corner_order() {
        for (i, id) in CornerId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }
}
