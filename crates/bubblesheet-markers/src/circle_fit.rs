//! Contour shape measures: convex hull, minimum enclosing circle, circularity.

use bubblesheet_core::{closed_perimeter, polygon_area};
use nalgebra::Point2;

/// Circle in continuous coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub center: Point2<f32>,
    pub radius: f32,
}

impl Circle {
    #[inline]
    fn contains(&self, p: Point2<f32>) -> bool {
        let dx = p.x - self.center.x;
        let dy = p.y - self.center.y;
        (dx * dx + dy * dy).sqrt() <= self.radius + 1e-4 * self.radius.max(1.0)
    }

    fn from_two(a: Point2<f32>, b: Point2<f32>) -> Self {
        let center = Point2::new(0.5 * (a.x + b.x), 0.5 * (a.y + b.y));
        Self {
            center,
            radius: 0.5 * (a.x - b.x).hypot(a.y - b.y),
        }
    }

    fn from_three(a: Point2<f32>, b: Point2<f32>, c: Point2<f32>) -> Self {
        let (ax, ay) = (a.x as f64, a.y as f64);
        let (bx, by) = (b.x as f64, b.y as f64);
        let (cx, cy) = (c.x as f64, c.y as f64);
        let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
        if d.abs() < 1e-12 {
            // collinear: the widest pair spans the other point
            return [Self::from_two(a, b), Self::from_two(a, c), Self::from_two(b, c)]
                .into_iter()
                .max_by(|l, r| l.radius.total_cmp(&r.radius))
                .unwrap_or_else(|| Self::from_two(a, b));
        }
        let a2 = ax * ax + ay * ay;
        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let ux = (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d;
        let uy = (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d;
        let center = Point2::new(ux as f32, uy as f32);
        Self {
            center,
            radius: (ux - ax).hypot(uy - ay) as f32,
        }
    }
}

/// Convex hull (Andrew's monotone chain), clockwise in image coordinates.
pub fn convex_hull(points: &[Point2<f32>]) -> Vec<Point2<f32>> {
    let mut pts: Vec<Point2<f32>> = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    fn cross(o: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    }

    let mut lower: Vec<Point2<f32>> = Vec::with_capacity(pts.len());
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0
        {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<Point2<f32>> = Vec::with_capacity(pts.len());
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0
        {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Smallest circle containing every point (incremental Welzl).
///
/// Runs on the convex hull, which bounds the work for dense contours.
pub fn min_enclosing_circle(points: &[Point2<f32>]) -> Option<Circle> {
    let hull = convex_hull(points);
    let first = *hull.first()?;
    let mut c = Circle {
        center: first,
        radius: 0.0,
    };
    for i in 1..hull.len() {
        if c.contains(hull[i]) {
            continue;
        }
        c = Circle {
            center: hull[i],
            radius: 0.0,
        };
        for j in 0..i {
            if c.contains(hull[j]) {
                continue;
            }
            c = Circle::from_two(hull[i], hull[j]);
            for k in 0..j {
                if !c.contains(hull[k]) {
                    c = Circle::from_three(hull[i], hull[j], hull[k]);
                }
            }
        }
    }
    Some(c)
}

/// Shape measures for one closed contour.
#[derive(Clone, Copy, Debug)]
pub struct ContourShape {
    pub area: f64,
    pub perimeter: f64,
    pub circularity: f32,
    pub enclosing: Circle,
}

impl ContourShape {
    /// Contour area over enclosing-circle area.
    pub fn enclosing_fill(&self) -> f32 {
        let r = self.enclosing.radius as f64;
        if r <= 0.0 {
            return 0.0;
        }
        (self.area / (std::f64::consts::PI * r * r)) as f32
    }
}

/// `4·π·area / perimeter²`, clamped to `[0, 1]`.
pub fn circularity(area: f64, perimeter: f64) -> f32 {
    if perimeter <= 0.0 {
        return 0.0;
    }
    (4.0 * std::f64::consts::PI * area / (perimeter * perimeter)).clamp(0.0, 1.0) as f32
}

pub fn measure_contour(points: &[Point2<f32>]) -> Option<ContourShape> {
    if points.len() < 3 {
        return None;
    }
    let area = polygon_area(points);
    let perimeter = closed_perimeter(points);
    let enclosing = min_enclosing_circle(points)?;
    Some(ContourShape {
        area,
        perimeter,
        circularity: circularity(area, perimeter),
        enclosing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn enclosing_circle_of_square_is_circumcircle() {
        let pts = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 2.0),
            Point2::new(1.0, 1.0),
        ];
        let c = min_enclosing_circle(&pts).unwrap();
        assert_abs_diff_eq!(c.center.x, 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(c.center.y, 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(c.radius, 2.0_f32.sqrt(), epsilon = 1e-4);
    }

    #[test]
    fn enclosing_circle_contains_all_points() {
        let pts: Vec<Point2<f32>> = (0..40)
            .map(|k| {
                let t = k as f32 * 0.37;
                Point2::new(10.0 + 7.0 * t.cos() + (k % 3) as f32, 5.0 + 4.0 * t.sin())
            })
            .collect();
        let c = min_enclosing_circle(&pts).unwrap();
        for p in &pts {
            assert!(c.contains(*p));
        }
    }

    #[test]
    fn hull_drops_interior_points() {
        let pts = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
        ];
        assert_eq!(convex_hull(&pts).len(), 4);
    }

    #[test]
    fn circle_polygon_is_nearly_perfectly_circular() {
        let pts: Vec<Point2<f32>> = (0..256)
            .map(|k| {
                let t = k as f32 / 256.0 * std::f32::consts::TAU;
                Point2::new(50.0 + 20.0 * t.cos(), 50.0 + 20.0 * t.sin())
            })
            .collect();
        let shape = measure_contour(&pts).unwrap();
        assert!(shape.circularity > 0.99);
        assert!(shape.enclosing_fill() > 0.99);
        assert_abs_diff_eq!(shape.enclosing.radius, 20.0, epsilon = 1e-2);
    }

    #[test]
    fn square_scores_as_a_square() {
        let pts = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        let shape = measure_contour(&pts).unwrap();
        assert_abs_diff_eq!(shape.circularity, std::f32::consts::FRAC_PI_4, epsilon = 1e-4);
        assert!(shape.enclosing_fill() < 0.7);
    }
}
