//! Planar geometry helpers shared by the morphology engines
//!
//! Vectors are nalgebra [`Vec2`]; polygons and polylines cross module
//! boundaries as `geo` types. Angles are radians, counter-clockwise from the
//! +x axis, normalised to [0, 2π).

use crate::core_types::vec2::Vec2;
use geo::{Coord, LineString, Polygon, Rect};
use std::f64::consts::TAU;

/// Absolute tolerance on coordinates and lengths (m)
pub const EPSILON: f64 = 1e-9;

/// Tolerance on angles (rad)
pub const ANGLE_EPSILON: f64 = 1e-12;

#[inline]
pub fn vec2(c: Coord<f64>) -> Vec2 {
    Vec2::new(c.x, c.y)
}

#[inline]
pub fn coord(v: Vec2) -> Coord<f64> {
    Coord { x: v.x, y: v.y }
}

/// z component of the cross product a × b
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Wrap an angle into [0, 2π)
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    if a >= TAU {
        0.0
    } else {
        a
    }
}

/// Direction of `to` seen from `from`, in [0, 2π)
#[inline]
pub fn azimuth(from: Vec2, to: Vec2) -> f64 {
    let d = to - from;
    normalize_angle(d.y.atan2(d.x))
}

/// Polar coordinates (r, θ) of `p` around `origin`
#[inline]
pub fn to_polar(origin: Vec2, p: Vec2) -> (f64, f64) {
    ((p - origin).norm(), azimuth(origin, p))
}

/// Cartesian point at (r, θ) around `origin`
#[inline]
pub fn from_polar(origin: Vec2, r: f64, theta: f64) -> Vec2 {
    origin + Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Unit vector at angle θ
#[inline]
pub fn unit(theta: f64) -> Vec2 {
    Vec2::new(theta.cos(), theta.sin())
}

/// Distance along the ray `origin + t·dir` to segment [a, b], if it is hit
///
/// Parallel segments are never hit.
pub fn ray_segment_intersection(origin: Vec2, dir: Vec2, a: Vec2, b: Vec2) -> Option<f64> {
    let ab = b - a;
    let denom = cross(dir, ab);
    if denom.abs() < EPSILON * ab.norm().max(1.0) {
        return None;
    }
    let ao = a - origin;
    let t = cross(ao, ab) / denom;
    let u = cross(ao, dir) / denom;
    (t >= -EPSILON && (-EPSILON..=1.0 + EPSILON).contains(&u)).then_some(t.max(0.0))
}

/// Intersection of two segments as the parameter along the first, if any
pub fn segment_intersection(p: Vec2, p2: Vec2, a: Vec2, b: Vec2) -> Option<f64> {
    let d = p2 - p;
    let len = d.norm();
    if len < EPSILON {
        return None;
    }
    let t = ray_segment_intersection(p, d / len, a, b)?;
    (t <= len + EPSILON).then_some(t / len)
}

/// Closest point of segment [a, b] to `p`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Parameter along the segment in [0, 1]
    pub t: f64,
    /// Projected point
    pub point: Vec2,
    /// Distance from `p` to the projected point
    pub distance: f64,
}

pub fn project_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Projection {
    let ab = b - a;
    let len2 = ab.norm_squared();
    let t = if len2 < EPSILON * EPSILON {
        0.0
    } else {
        ((p - a).dot(&ab) / len2).clamp(0.0, 1.0)
    };
    let point = a + ab * t;
    Projection {
        t,
        point,
        distance: (p - point).norm(),
    }
}

/// Stable textual key of a coordinate rounded to `precision` decimals
///
/// Negative zero is folded onto zero so that both round to the same key.
pub fn node_hash(p: Vec2, precision: usize) -> String {
    let clean = |v: f64| {
        let scale = 10f64.powi(precision as i32);
        let r = (v * scale).round() / scale;
        if r == 0.0 {
            0.0
        } else {
            r
        }
    };
    format!("{:.*}_{:.*}", precision, clean(p.x), precision, clean(p.y))
}

/// Regular polygon approximating a disk, counter-clockwise
pub fn disk(center: Vec2, radius: f64, segments: usize) -> Polygon<f64> {
    let n = segments.max(3);
    let ring: Vec<Coord<f64>> = (0..n)
        .map(|k| coord(from_polar(center, radius, TAU * k as f64 / n as f64)))
        .collect();
    Polygon::new(LineString::from(ring), vec![])
}

/// Axis-aligned square of half side `half` centred on `center`
pub fn square(center: Vec2, half: f64) -> Rect<f64> {
    Rect::new(
        coord(center - Vec2::new(half, half)),
        coord(center + Vec2::new(half, half)),
    )
}

/// Polygon exterior as points, without the closing duplicate
pub fn exterior_points(polygon: &Polygon<f64>) -> Vec<Vec2> {
    ring_points(polygon.exterior())
}

/// Ring as points, without the closing duplicate
pub fn ring_points(ring: &LineString<f64>) -> Vec<Vec2> {
    let mut pts: Vec<Vec2> = ring.coords().map(|c| vec2(*c)).collect();
    if pts.len() > 1 && (pts[0] - pts[pts.len() - 1]).norm() < EPSILON {
        pts.pop();
    }
    pts
}

/// Length of a polyline
pub fn polyline_length(points: &[Vec2]) -> f64 {
    points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
}

/// Point at curvilinear abscissa `s` along a polyline, and the index of the
/// segment containing it
pub fn point_along(points: &[Vec2], s: f64) -> (Vec2, usize) {
    let mut remaining = s.max(0.0);
    for (i, w) in points.windows(2).enumerate() {
        let len = (w[1] - w[0]).norm();
        if remaining <= len {
            let t = if len > 0.0 { remaining / len } else { 0.0 };
            return (w[0] + (w[1] - w[0]) * t, i);
        }
        remaining -= len;
    }
    let last = points.len().saturating_sub(1);
    (points[last], last.saturating_sub(1))
}

/// Split a polyline at curvilinear abscissa `s`
pub fn split_polyline(points: &[Vec2], s: f64) -> (Vec<Vec2>, Vec<Vec2>) {
    let (p, i) = point_along(points, s);
    let mut head: Vec<Vec2> = points[..=i].to_vec();
    if (head[head.len() - 1] - p).norm() > EPSILON {
        head.push(p);
    }
    let mut tail = vec![p];
    for q in &points[i + 1..] {
        if (q - tail[tail.len() - 1]).norm() > EPSILON {
            tail.push(*q);
        }
    }
    if tail.len() < 2 {
        tail.push(p);
    }
    (head, tail)
}

/// Prefix of a polyline of length `s`
pub fn truncate_polyline(points: &[Vec2], s: f64) -> Vec<Vec2> {
    split_polyline(points, s).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_normalize_angle() {
        assert_abs_diff_eq!(normalize_angle(-PI / 2.0), 1.5 * PI, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_angle(5.0 * PI), PI, epsilon = 1e-12);
        assert!(normalize_angle(-1e-18) < TAU);
    }

    #[test]
    fn test_polar_roundtrip() {
        let o = Vec2::new(3.0, -2.0);
        let p = Vec2::new(-1.0, 5.0);
        let (r, t) = to_polar(o, p);
        assert_abs_diff_eq!((from_polar(o, r, t) - p).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ray_hits_segment() {
        let t = ray_segment_intersection(
            Vec2::zeros(),
            Vec2::new(1.0, 0.0),
            Vec2::new(5.0, -1.0),
            Vec2::new(5.0, 1.0),
        );
        assert_abs_diff_eq!(t.unwrap(), 5.0, epsilon = 1e-12);
        assert!(ray_segment_intersection(
            Vec2::zeros(),
            Vec2::new(-1.0, 0.0),
            Vec2::new(5.0, -1.0),
            Vec2::new(5.0, 1.0)
        )
        .is_none());
    }

    #[test]
    fn test_node_hash_folds_negative_zero() {
        assert_eq!(node_hash(Vec2::new(-0.0000001, 1.0), 3), "0.000_1.000");
        assert_eq!(node_hash(Vec2::new(1.0001, 2.0), 3), node_hash(Vec2::new(0.9999, 2.0), 3));
    }

    #[test]
    fn test_split_polyline() {
        let line = vec![Vec2::zeros(), Vec2::new(2.0, 0.0), Vec2::new(2.0, 2.0)];
        let (head, tail) = split_polyline(&line, 3.0);
        assert_abs_diff_eq!(polyline_length(&head), 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(polyline_length(&tail), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!((head[head.len() - 1] - tail[0]).norm(), 0.0, epsilon = 1e-12);
    }
}
