//! Star-domain kernel of the open space around a viewpoint
//!
//! The open space at radius r is the disk of radius r centred on the
//! viewpoint minus the convex hulls of the buildings it meets. Its kernel is
//! the set of points that see the whole open space; it is the intersection
//! of the inner half-planes of every boundary edge. The largest radius whose
//! kernel still contains the viewpoint is found by bisection between the
//! nearest building distance and the longest panoptic ray.

use crate::core_types::vec2::Vec2;
use crate::error::{Error, Result};
use crate::geometry::buildings::BuildingIndex;
use crate::geometry::primitives::{coord, cross, disk, ring_points, square, vec2, EPSILON};
use crate::geometry::raycast::{cast_2d, panoptic_directions};
use geo::orient::Direction;
use geo::{
    Area, BooleanOps, Centroid, Contains, ConvexHull, Geometry, LineString, MultiPolygon, Orient, Point,
    Polygon,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarKernelConfig {
    /// Rays of the panoptic cast bounding the search
    pub panoptic_rays: usize,
    /// Ray length and radius used when no building is in sight (m)
    pub max_radius: f64,
    /// Bisection stops when the bracket is narrower than this (m)
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Vertices of the polygonal disk
    pub disk_segments: usize,
}

impl Default for StarKernelConfig {
    fn default() -> Self {
        Self {
            panoptic_rays: 64,
            max_radius: 100.0,
            tolerance: 0.01,
            max_iterations: 40,
            disk_segments: 64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StarKernel {
    pub viewpoint: Vec2,
    /// Largest accepted buffer radius, 0 when no radius is admissible
    pub radius: f64,
    /// Kernel polygon, `None` when it degenerates to the viewpoint
    pub kernel: Option<Polygon<f64>>,
    /// Open space at the accepted radius
    pub open_space: Option<Polygon<f64>>,
    /// Distance from the viewpoint to the kernel centroid
    pub drift: f64,
    pub area: f64,
}

impl StarKernel {
    /// Kernel as a geometry: the polygon, or the viewpoint itself when the
    /// kernel degenerates
    pub fn geometry(&self) -> Geometry<f64> {
        match &self.kernel {
            Some(kernel) => Geometry::Polygon(kernel.clone()),
            None => Geometry::Point(Point::from(coord(self.viewpoint))),
        }
    }
}

/// Clip a convex polygon to the half-plane left of a→b
fn clip_left(poly: &[Vec2], a: Vec2, b: Vec2) -> Vec<Vec2> {
    let ab = b - a;
    let side = |p: Vec2| cross(ab, p - a);
    let mut out = Vec::with_capacity(poly.len() + 1);
    for (k, &p) in poly.iter().enumerate() {
        let q = poly[(k + 1) % poly.len()];
        let (sp, sq) = (side(p), side(q));
        if sp >= 0.0 {
            out.push(p);
        }
        if (sp >= 0.0) != (sq >= 0.0) {
            let t = sp / (sp - sq);
            out.push(p + (q - p) * t);
        }
    }
    out
}

fn convex_area(poly: &[Vec2]) -> f64 {
    (0..poly.len())
        .map(|k| cross(poly[k], poly[(k + 1) % poly.len()]))
        .sum::<f64>()
        * 0.5
}

/// Kernel of a polygon as the intersection of the inner half-planes of its
/// edges, `None` when empty
pub fn polygon_kernel(polygon: &Polygon<f64>) -> Option<Polygon<f64>> {
    let polygon = polygon.orient(Direction::Default);
    let outer = ring_points(polygon.exterior());
    let (mut min, mut max) = (Vec2::repeat(f64::INFINITY), Vec2::repeat(f64::NEG_INFINITY));
    for p in &outer {
        min = min.inf(p);
        max = max.sup(p);
    }
    let mut kernel = vec![min, Vec2::new(max.x, min.y), max, Vec2::new(min.x, max.y)];
    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
        let pts = ring_points(ring);
        for k in 0..pts.len() {
            kernel = clip_left(&kernel, pts[k], pts[(k + 1) % pts.len()]);
            if kernel.len() < 3 {
                return None;
            }
        }
    }
    if convex_area(&kernel) <= EPSILON {
        return None;
    }
    Some(Polygon::new(
        LineString::from(kernel.into_iter().map(coord).collect::<Vec<_>>()),
        vec![],
    ))
}

fn covers(polygon: &Polygon<f64>, p: Vec2) -> bool {
    if polygon.contains(&Point::from(coord(p))) {
        return true;
    }
    let pts = ring_points(polygon.exterior());
    (0..pts.len()).all(|k| cross(pts[(k + 1) % pts.len()] - pts[k], p - pts[k]) >= -EPSILON)
}

/// Open space around `vp` at radius `r`: the connected piece containing it
pub fn open_space(index: &BuildingIndex, vp: Vec2, r: f64, segments: usize) -> Option<Polygon<f64>> {
    let around = MultiPolygon::new(vec![disk(vp, r, segments)]);
    let hulls = index
        .intersecting(&square(vp, r))
        .into_iter()
        .map(|i| MultiPolygon::new(vec![index.get(i).footprint.convex_hull()]))
        .reduce(|acc, next| acc.union(&next));
    let space = match hulls {
        Some(h) => around.difference(&h),
        None => around,
    };
    space.into_iter().find(|piece| covers(piece, vp))
}

fn accepted(index: &BuildingIndex, vp: Vec2, r: f64, segments: usize) -> Option<(Polygon<f64>, Polygon<f64>)> {
    let space = open_space(index, vp, r, segments)?;
    let kernel = polygon_kernel(&space)?;
    covers(&kernel, vp).then_some((kernel, space))
}

/// Largest star-domain kernel containing `vp`
///
/// The buffer radius is bisected on [0, r_max], r_max being the longest
/// panoptic ray. The nearest-building distance seeds the lower bound when it
/// is admissible. Without any admissible radius the kernel degenerates to
/// `vp` (see [`StarKernel::geometry`]).
///
/// # Errors
/// [`Error::IndoorViewpoint`] when `vp` is strictly inside a building,
/// [`Error::InvalidInputs`] for an empty ray set or non-positive radius.
pub fn star_kernel(index: &BuildingIndex, vp: Vec2, config: &StarKernelConfig) -> Result<StarKernel> {
    if config.panoptic_rays == 0 || !(config.max_radius > 0.0) {
        return Err(Error::invalid("star kernel needs rays and a positive radius"));
    }
    index.ensure_outdoor(vp)?;

    let r_min = index.nearest(vp).map_or(config.max_radius, |(_, d)| d.min(config.max_radius));
    let mut r_max: f64 = 0.0;
    for direction in panoptic_directions(config.panoptic_rays) {
        match cast_2d(index, vp, direction, config.max_radius) {
            Ok(ray) => r_max = r_max.max(ray.distance),
            Err(Error::AnchoredInside) => {}
            Err(e) => return Err(e),
        }
    }
    let r_max = r_max.max(r_min);

    let mut best = accepted(index, vp, r_max, config.disk_segments).map(|k| (r_max, k));
    if best.is_none() {
        let (mut lo, mut hi) = (0.0, r_max);
        if r_min > 0.0 && r_min < r_max {
            match accepted(index, vp, r_min, config.disk_segments) {
                Some(k) => {
                    lo = r_min;
                    best = Some((r_min, k));
                }
                None => hi = r_min,
            }
        }
        let mut iterations = 0;
        while hi - lo > config.tolerance && iterations < config.max_iterations {
            let mid = 0.5 * (lo + hi);
            match accepted(index, vp, mid, config.disk_segments) {
                Some(k) => {
                    lo = mid;
                    best = Some((mid, k));
                }
                None => hi = mid,
            }
            iterations += 1;
        }
        debug!(iterations, radius = lo, "star kernel bisection");
    }

    Ok(match best {
        Some((radius, (kernel, space))) => {
            let drift = kernel
                .centroid()
                .map_or(0.0, |c| (vec2(c.0) - vp).norm());
            StarKernel {
                viewpoint: vp,
                radius,
                area: kernel.unsigned_area(),
                kernel: Some(kernel),
                open_space: Some(space),
                drift,
            }
        }
        None => StarKernel {
            viewpoint: vp,
            radius: 0.0,
            kernel: None,
            open_space: None,
            drift: 0.0,
            area: 0.0,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::buildings::Building;
    use approx::assert_abs_diff_eq;
    use geo::polygon;

    fn block(x0: f64, y0: f64, x1: f64, y1: f64) -> Building {
        Building::new(
            polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)],
            10.0,
        )
        .unwrap()
    }

    #[test]
    fn test_convex_polygon_is_its_own_kernel() {
        let square = polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0)];
        let kernel = polygon_kernel(&square).unwrap();
        assert_abs_diff_eq!(kernel.unsigned_area(), 16.0, epsilon = 1e-9);
    }

    #[test]
    fn test_l_shape_kernel() {
        let l_shape = polygon![
            (x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 1.0),
            (x: 1.0, y: 1.0), (x: 1.0, y: 4.0), (x: 0.0, y: 4.0)
        ];
        let kernel = polygon_kernel(&l_shape).unwrap();
        assert_abs_diff_eq!(kernel.unsigned_area(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_scene_keeps_full_disk() {
        let index = BuildingIndex::new(Vec::new());
        let result = star_kernel(&index, Vec2::zeros(), &StarKernelConfig::default()).unwrap();
        assert_abs_diff_eq!(result.radius, 100.0, epsilon = 1e-12);
        assert!(result.drift < 1e-6);
    }

    #[test]
    fn test_kernel_stays_inside_open_space() {
        let index = BuildingIndex::new(vec![
            block(5.0, 5.0, 30.0, 30.0),
            block(-30.0, 5.0, -5.0, 30.0),
            block(-30.0, -30.0, -5.0, -5.0),
            block(5.0, -30.0, 30.0, -5.0),
        ]);
        let result = star_kernel(&index, Vec2::zeros(), &StarKernelConfig::default()).unwrap();
        let kernel = result.kernel.unwrap();
        let space = result.open_space.unwrap();
        assert!(result.radius >= 5.0 * 2f64.sqrt() - 1e-6);
        assert!(kernel.unsigned_area() <= space.unsigned_area() + 1e-9);
        assert!(covers(&kernel, Vec2::zeros()));
    }

    #[test]
    fn test_facade_viewpoint_bisects_from_zero() {
        // nearest building at distance 0; the open space stays a half-disk
        // until the buffer reaches the corners of the facade
        let index = BuildingIndex::new(vec![block(0.0, 0.0, 10.0, 10.0)]);
        let vp = Vec2::new(10.0, 5.0);
        let result = star_kernel(&index, vp, &StarKernelConfig::default()).unwrap();
        assert_abs_diff_eq!(result.radius, 5.0, epsilon = 0.02);
        assert!(matches!(result.geometry(), Geometry::Polygon(_)));
        let kernel = result.kernel.as_ref().unwrap();
        assert!(covers(kernel, vp));
        assert!(kernel.unsigned_area() > 0.4 * std::f64::consts::PI * 25.0);
    }

    #[test]
    fn test_degenerate_kernel_is_the_viewpoint() {
        let kernel = StarKernel {
            viewpoint: Vec2::new(3.0, 4.0),
            radius: 0.0,
            kernel: None,
            open_space: None,
            drift: 0.0,
            area: 0.0,
        };
        assert_eq!(kernel.geometry(), Geometry::Point(Point::new(3.0, 4.0)));
    }
}
