use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in normalized sheet coordinates (`[0,1]²`).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NormRect {
    pub const UNIT: NormRect = NormRect {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Finite, positive extent, inside `[0,1]²` (with a small tolerance).
    pub fn is_valid(&self) -> bool {
        const EPS: f32 = 1e-4;
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
            && self.x >= -EPS
            && self.y >= -EPS
            && self.x + self.width <= 1.0 + EPS
            && self.y + self.height <= 1.0 + EPS
    }

    /// Corners TL, TR, BR, BL.
    pub fn corners(&self) -> [Point2<f32>; 4] {
        [
            Point2::new(self.x, self.y),
            Point2::new(self.x + self.width, self.y),
            Point2::new(self.x + self.width, self.y + self.height),
            Point2::new(self.x, self.y + self.height),
        ]
    }

    /// Map a point given in this rectangle's local `[0,1]²` frame to the parent frame.
    pub fn local_to_parent(&self, u: f32, v: f32) -> Point2<f32> {
        Point2::new(self.x + u * self.width, self.y + v * self.height)
    }
}

/// Signed shoelace area; positive for clockwise order in image coordinates (y down).
pub fn signed_polygon_area(pts: &[Point2<f32>]) -> f64 {
    if pts.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0f64;
    for (i, p) in pts.iter().enumerate() {
        let q = pts[(i + 1) % pts.len()];
        acc += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
    }
    0.5 * acc
}

pub fn polygon_area(pts: &[Point2<f32>]) -> f64 {
    signed_polygon_area(pts).abs()
}

/// Length of the closed polyline through `pts`.
pub fn closed_perimeter(pts: &[Point2<f32>]) -> f64 {
    if pts.len() < 2 {
        return 0.0;
    }
    pts.iter()
        .enumerate()
        .map(|(i, p)| {
            let q = pts[(i + 1) % pts.len()];
            ((q.x - p.x) as f64).hypot((q.y - p.y) as f64)
        })
        .sum()
}

#[inline]
pub fn distance(a: Point2<f32>, b: Point2<f32>) -> f32 {
    (a.x - b.x).hypot(a.y - b.y)
}
