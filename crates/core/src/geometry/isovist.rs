//! Exact isovist: the region visible from a viewpoint within a maximum range
//!
//! Opaque walls are the boundary edges of the union of the nearby footprints
//! that face the viewpoint. They are clipped to the range disk, expressed as
//! angular intervals around the viewpoint, pruned when provably hidden, and
//! swept counter-clockwise from the +x axis. Between two critical angles
//! (wall endpoints and wall crossings) the nearest wall, or the range circle,
//! owns the boundary.
//!
//! The boundary splits into three disjoint kinds of edges:
//! - *material*: along a single wall
//! - *occluding*: radial jumps between a near wall and what lies behind it
//! - *skyline*: the artificial horizon on the range circle
//!
//! # References
//! - Benedikt, M.L. (1979). "To take hold of space: isovists and isovist
//!   fields". Environment and Planning B, 6(1), 47-65
//! - Leduc, T. et al. (2019). "Isovist-based spatial descriptors of urban
//!   open spaces". Urban Morphology

use crate::core_types::vec2::Vec2;
use crate::error::{Error, Result};
use crate::geometry::buildings::BuildingIndex;
use crate::geometry::primitives::{
    azimuth, coord, cross, project_on_segment, ring_points, segment_intersection, square, to_polar,
    unit, EPSILON,
};
use geo::orient::Direction;
use geo::{BooleanOps, Centroid, LineString, MultiLineString, MultiPolygon, Orient, Polygon};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use tracing::debug;

/// Angular tolerance of the sweep (rad)
const SWEEP_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsovistConfig {
    /// Maximum visibility range L (m)
    pub max_radius: f64,
    /// Angular step of the artificial horizon δ (degrees)
    pub horizon_step_deg: f64,
}

impl Default for IsovistConfig {
    fn default() -> Self {
        Self {
            max_radius: 100.0,
            horizon_step_deg: 5.0,
        }
    }
}

/// Role of a contour node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// First visible point of a wall
    Start,
    /// Interior point of a wall, or a corner shared by two walls
    Mid,
    /// Last visible point of a wall
    Stop,
    /// Point on the range circle owned by no wall
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IsovistNode {
    pub point: Vec2,
    pub radius: f64,
    pub azimuth: f64,
    pub kind: NodeKind,
    /// Identifiers of the walls through this node (two for a fused corner)
    pub edges: Vec<usize>,
}

/// Boundary edge class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Material,
    Occluding,
    Skyline,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct IsovistMetrics {
    /// Total boundary length, `solid + occlusiv + skyline`
    pub perimeter: f64,
    pub solid: f64,
    pub occlusiv: f64,
    pub skyline: f64,
    pub solid_ratio: f64,
    pub occlusiv_ratio: f64,
    pub skyline_ratio: f64,
    /// Σ r_b·(r_b − r_f)/r_f over occluding edges
    pub anticipation: f64,
    pub area: f64,
    /// Distance from the viewpoint to the isovist centroid
    pub drift: f64,
    pub min_radius: f64,
    pub max_radius: f64,
    /// Number of synthesised horizon points
    pub artificial_horizon: usize,
}

#[derive(Debug, Clone)]
pub struct Isovist {
    pub viewpoint: Vec2,
    /// Visible region, skyline arcs sampled every δ
    pub polygon: Polygon<f64>,
    /// Contour nodes in counter-clockwise order from azimuth 0
    pub nodes: Vec<IsovistNode>,
    pub material: MultiLineString<f64>,
    pub occluding: MultiLineString<f64>,
    pub skyline: MultiLineString<f64>,
    pub metrics: IsovistMetrics,
}

/// Wall facing the viewpoint, oriented counter-clockwise around it
#[derive(Debug, Clone, Copy)]
struct Wall {
    id: usize,
    a: Vec2,
    b: Vec2,
    lo: f64,
    hi: f64,
    /// Whether `a` and `b` are wall ends rather than cuts at azimuth 0
    opens: bool,
    closes: bool,
}

/// Distance along the ray at azimuth θ to the line through (a, b)
fn line_radius(vp: Vec2, theta: f64, a: Vec2, b: Vec2) -> Option<f64> {
    let u = unit(theta);
    let ab = b - a;
    let denom = cross(u, ab);
    if denom.abs() < EPSILON {
        return None;
    }
    let t = cross(a - vp, ab) / denom;
    (t > 0.0).then_some(t)
}

impl Wall {
    fn covers(&self, theta: f64) -> bool {
        self.lo < theta && theta < self.hi
    }

    fn radius_at(&self, vp: Vec2, theta: f64) -> f64 {
        if (theta - self.lo).abs() < SWEEP_EPSILON {
            return (self.a - vp).norm();
        }
        if (theta - self.hi).abs() < SWEEP_EPSILON {
            return (self.b - vp).norm();
        }
        line_radius(vp, theta, self.a, self.b).unwrap_or_else(|| (self.a - vp).norm())
    }

    fn point_at(&self, vp: Vec2, theta: f64) -> Vec2 {
        if (theta - self.lo).abs() < SWEEP_EPSILON {
            return self.a;
        }
        if (theta - self.hi).abs() < SWEEP_EPSILON {
            return self.b;
        }
        vp + unit(theta) * self.radius_at(vp, theta)
    }

    fn min_radius(&self, vp: Vec2) -> f64 {
        project_on_segment(vp, self.a, self.b).distance
    }

    fn max_radius(&self, vp: Vec2) -> f64 {
        (self.a - vp).norm().max((self.b - vp).norm())
    }
}

/// Part of segment [a, b] inside the disk of radius `r` around `center`
fn clip_to_disk(center: Vec2, r: f64, a: Vec2, b: Vec2) -> Option<(Vec2, Vec2)> {
    let d = b - a;
    let f = a - center;
    let qa = d.norm_squared();
    if qa < EPSILON * EPSILON {
        return None;
    }
    let qb = 2.0 * f.dot(&d);
    let qc = f.norm_squared() - r * r;
    let disc = qb * qb - 4.0 * qa * qc;
    if disc <= 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    let lo = ((-qb - sq) / (2.0 * qa)).max(0.0);
    let hi = ((-qb + sq) / (2.0 * qa)).min(1.0);
    if (hi - lo) * qa.sqrt() <= EPSILON {
        return None;
    }
    Some((a + d * lo, a + d * hi))
}

/// Boundary edges of the merged footprints that face `vp`, clipped to the
/// range disk and cut at azimuth 0
fn facing_walls(index: &BuildingIndex, vp: Vec2, radius: f64) -> Vec<Wall> {
    let merged = index
        .intersecting(&square(vp, radius))
        .into_iter()
        .map(|i| MultiPolygon::new(vec![index.get(i).footprint.clone()]))
        .reduce(|acc, next| acc.union(&next));
    let Some(merged) = merged else {
        return Vec::new();
    };
    let merged = merged.orient(Direction::Default);

    let mut walls = Vec::new();
    let mut id = 0;
    for polygon in &merged {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            let pts = ring_points(ring);
            for k in 0..pts.len() {
                let (p, q) = (pts[k], pts[(k + 1) % pts.len()]);
                let pq = q - p;
                // interior on the left, so the viewpoint must be on the right
                if cross(pq, vp - p) >= -EPSILON * pq.norm() {
                    continue;
                }
                let Some((p, q)) = clip_to_disk(vp, radius, p, q) else {
                    continue;
                };
                // reversed so that azimuth increases from a to b
                let (a, b) = (q, p);
                let (lo, hi) = (azimuth(vp, a), azimuth(vp, b));
                if hi >= lo {
                    walls.push(Wall { id, a, b, lo, hi, opens: true, closes: true });
                } else {
                    let cut = line_radius(vp, 0.0, a, b).map_or(a, |r| vp + Vec2::new(r, 0.0));
                    walls.push(Wall { id, a, b: cut, lo, hi: TAU, opens: true, closes: false });
                    if hi > SWEEP_EPSILON {
                        walls.push(Wall { id, a: cut, b, lo: 0.0, hi, opens: false, closes: true });
                    }
                }
                id += 1;
            }
        }
    }
    walls.retain(|w| w.hi - w.lo > SWEEP_EPSILON);
    walls
}

/// Drop walls that are hidden by a single nearer wall, then walls hidden by
/// a contiguous run of strictly nearer walls
fn prune_hidden(walls: Vec<Wall>, vp: Vec2) -> Vec<Wall> {
    let hidden_by_one = |s: &Wall, t: &Wall| {
        if t.lo > s.lo + SWEEP_EPSILON || t.hi < s.hi - SWEEP_EPSILON {
            return false;
        }
        let (rs0, rs1) = (s.radius_at(vp, s.lo), s.radius_at(vp, s.hi));
        let (rt0, rt1) = (t.radius_at(vp, s.lo), t.radius_at(vp, s.hi));
        rt0 <= rs0 + EPSILON && rt1 <= rs1 + EPSILON && (rt0 + EPSILON < rs0 || rt1 + EPSILON < rs1)
    };
    let kept: Vec<Wall> = walls
        .iter()
        .enumerate()
        .filter(|(i, s)| {
            !walls
                .iter()
                .enumerate()
                .any(|(j, t)| *i != j && hidden_by_one(s, t))
        })
        .map(|(_, w)| *w)
        .collect();

    let covered = |s: &Wall| {
        let floor = s.min_radius(vp) - EPSILON;
        let mut run: Vec<(f64, f64)> = kept
            .iter()
            .filter(|t| t.max_radius(vp) <= floor)
            .map(|t| (t.lo, t.hi))
            .collect();
        run.sort_by(|x, y| x.0.total_cmp(&y.0));
        let mut cursor = s.lo;
        for (lo, hi) in run {
            if lo > cursor + SWEEP_EPSILON {
                break;
            }
            cursor = cursor.max(hi);
            if cursor >= s.hi - SWEEP_EPSILON {
                return true;
            }
        }
        false
    };
    kept.iter().filter(|s| !covered(s)).copied().collect()
}

/// Angular interval owned by one wall (index into the wall list) or by the
/// range circle
#[derive(Debug, Clone, Copy)]
struct Span {
    owner: Option<usize>,
    t0: f64,
    t1: f64,
    p0: Vec2,
    p1: Vec2,
}

fn sweep(walls: &[Wall], vp: Vec2, radius: f64) -> Vec<Span> {
    let mut critical = vec![0.0, TAU];
    for (i, w) in walls.iter().enumerate() {
        critical.push(w.lo);
        critical.push(w.hi);
        for v in &walls[i + 1..] {
            if let Some(t) = segment_intersection(w.a, w.b, v.a, v.b) {
                critical.push(azimuth(vp, w.a + (w.b - w.a) * t));
            }
        }
    }
    critical.sort_by(f64::total_cmp);
    critical.dedup_by(|a, b| (*a - *b).abs() < SWEEP_EPSILON);

    let mut spans: Vec<Span> = Vec::new();
    for pair in critical.windows(2) {
        let (t0, t1) = (pair[0], pair[1]);
        if t1 - t0 <= SWEEP_EPSILON {
            continue;
        }
        let mid = 0.5 * (t0 + t1);
        let owner = walls
            .iter()
            .enumerate()
            .filter(|(_, w)| w.covers(mid))
            .map(|(i, w)| (i, w.radius_at(vp, mid)))
            .min_by(|x, y| x.1.total_cmp(&y.1))
            .map(|(i, _)| i);
        let (p0, p1) = match owner {
            Some(i) => (walls[i].point_at(vp, t0), walls[i].point_at(vp, t1)),
            None => (vp + unit(t0) * radius, vp + unit(t1) * radius),
        };
        let same_owner = spans.last().is_some_and(|last| match (last.owner, owner) {
            (None, None) => true,
            (Some(x), Some(y)) => walls[x].id == walls[y].id && (last.p1 - p0).norm() < EPSILON,
            _ => false,
        });
        match spans.last_mut() {
            Some(last) if same_owner => {
                last.t1 = t1;
                last.p1 = p1;
            }
            _ => spans.push(Span { owner, t0, t1, p0, p1 }),
        }
    }
    spans
}

/// Compute the isovist of `viewpoint`
///
/// # Errors
/// [`Error::IndoorViewpoint`] when the viewpoint is strictly inside a
/// building, [`Error::InvalidInputs`] for a non-positive range or step.
pub fn isovist(index: &BuildingIndex, viewpoint: Vec2, config: &IsovistConfig) -> Result<Isovist> {
    let radius = config.max_radius;
    if !(radius.is_finite() && radius > 0.0) {
        return Err(Error::invalid("isovist range must be positive"));
    }
    if !(config.horizon_step_deg.is_finite() && config.horizon_step_deg > 0.0) {
        return Err(Error::invalid("horizon step must be positive"));
    }
    if !(viewpoint.x.is_finite() && viewpoint.y.is_finite()) {
        return Err(Error::invalid("viewpoint is not a finite point"));
    }
    index.ensure_outdoor(viewpoint)?;

    let walls = facing_walls(index, viewpoint, radius);
    let facing = walls.len();
    let walls = prune_hidden(walls, viewpoint);
    debug!(facing, kept = walls.len(), "isovist walls");

    let spans = sweep(&walls, viewpoint, radius);
    Ok(assemble(&walls, &spans, viewpoint, radius, config.horizon_step_deg.to_radians()))
}

fn node(vp: Vec2, point: Vec2, kind: NodeKind, edges: Vec<usize>) -> IsovistNode {
    let (radius, azimuth) = to_polar(vp, point);
    IsovistNode {
        point,
        radius,
        azimuth,
        kind,
        edges,
    }
}

fn assemble(walls: &[Wall], spans: &[Span], vp: Vec2, radius: f64, step: f64) -> Isovist {
    let n = spans.len();
    let mut nodes: Vec<IsovistNode> = Vec::new();
    // class of the edge leaving each node
    let mut leaving: Vec<EdgeKind> = Vec::new();
    let mut metrics = IsovistMetrics {
        min_radius: radius,
        ..IsovistMetrics::default()
    };
    let span_kind = |s: &Span| {
        if s.owner.is_some() {
            EdgeKind::Material
        } else {
            EdgeKind::Skyline
        }
    };

    for k in 0..n {
        let left = &spans[(k + n - 1) % n];
        let right = &spans[k];
        let lw = left.owner.map(|i| &walls[i]);
        let rw = right.owner.map(|i| &walls[i]);
        let end_kind = |w: &Wall| {
            if w.closes && (left.t1 - w.hi).abs() < SWEEP_EPSILON {
                NodeKind::Stop
            } else {
                NodeKind::Mid
            }
        };
        let start_kind = |w: &Wall| {
            if w.opens && (right.t0 - w.lo).abs() < SWEEP_EPSILON {
                NodeKind::Start
            } else {
                NodeKind::Mid
            }
        };

        if (left.p1 - right.p0).norm() < EPSILON {
            let (kind, edges) = match (lw, rw) {
                (Some(l), Some(r)) if l.id == r.id => (NodeKind::Mid, vec![l.id]),
                (Some(l), Some(r)) => (NodeKind::Mid, vec![l.id, r.id]),
                (Some(l), None) => (end_kind(l), vec![l.id]),
                (None, Some(r)) => (start_kind(r), vec![r.id]),
                (None, None) => (NodeKind::Unknown, Vec::new()),
            };
            nodes.push(node(vp, right.p0, kind, edges));
            leaving.push(span_kind(right));
        } else {
            let near = left.p1.metric_distance(&vp).min(right.p0.metric_distance(&vp));
            let far = left.p1.metric_distance(&vp).max(right.p0.metric_distance(&vp));
            metrics.occlusiv += far - near;
            if near > EPSILON {
                metrics.anticipation += far * (far - near) / near;
            }
            nodes.push(match lw {
                Some(l) => node(vp, left.p1, end_kind(l), vec![l.id]),
                None => node(vp, left.p1, NodeKind::Unknown, Vec::new()),
            });
            leaving.push(EdgeKind::Occluding);
            nodes.push(match rw {
                Some(r) => node(vp, right.p0, start_kind(r), vec![r.id]),
                None => node(vp, right.p0, NodeKind::Unknown, Vec::new()),
            });
            leaving.push(span_kind(right));
        }

        match right.owner {
            Some(_) => {
                metrics.solid += (right.p1 - right.p0).norm();
                metrics.area += 0.5 * cross(right.p0 - vp, right.p1 - vp);
                metrics.min_radius = metrics
                    .min_radius
                    .min(project_on_segment(vp, right.p0, right.p1).distance);
            }
            None => {
                let sweep = right.t1 - right.t0;
                metrics.skyline += radius * sweep;
                metrics.area += 0.5 * radius * radius * sweep;
                let samples = ((sweep / step - 1e-9).ceil() as usize).max(if n == 1 { 3 } else { 1 });
                for j in 1..samples {
                    let theta = right.t0 + sweep * j as f64 / samples as f64;
                    nodes.push(node(vp, vp + unit(theta) * radius, NodeKind::Unknown, Vec::new()));
                    leaving.push(EdgeKind::Skyline);
                }
            }
        }
    }

    let mut material = Vec::new();
    let mut occluding = Vec::new();
    let mut skyline = Vec::new();
    for (k, kind) in leaving.iter().enumerate() {
        let (p, q) = (nodes[k].point, nodes[(k + 1) % nodes.len()].point);
        let line = LineString::from(vec![coord(p), coord(q)]);
        match kind {
            EdgeKind::Material => material.push(line),
            EdgeKind::Occluding => occluding.push(line),
            EdgeKind::Skyline => skyline.push(line),
        }
    }

    let polygon = Polygon::new(
        LineString::from(nodes.iter().map(|nd| coord(nd.point)).collect::<Vec<_>>()),
        vec![],
    );
    metrics.perimeter = metrics.solid + metrics.occlusiv + metrics.skyline;
    if metrics.perimeter > 0.0 {
        metrics.solid_ratio = metrics.solid / metrics.perimeter;
        metrics.occlusiv_ratio = metrics.occlusiv / metrics.perimeter;
        metrics.skyline_ratio = metrics.skyline / metrics.perimeter;
    }
    metrics.max_radius = nodes.iter().map(|nd| nd.radius).fold(0.0, f64::max);
    metrics.artificial_horizon = nodes.iter().filter(|nd| nd.kind == NodeKind::Unknown).count();
    metrics.drift = polygon
        .centroid()
        .map_or(0.0, |c| (Vec2::new(c.x(), c.y()) - vp).norm());

    Isovist {
        viewpoint: vp,
        polygon,
        nodes,
        material: MultiLineString::new(material),
        occluding: MultiLineString::new(occluding),
        skyline: MultiLineString::new(skyline),
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::buildings::Building;
    use approx::assert_abs_diff_eq;
    use geo::polygon;
    use std::f64::consts::PI;

    fn block(x0: f64, y0: f64, x1: f64, y1: f64) -> Building {
        Building::new(
            polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)],
            10.0,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_scene_is_disk() {
        let index = BuildingIndex::new(Vec::new());
        let iso = isovist(&index, Vec2::zeros(), &IsovistConfig::default()).unwrap();
        assert_abs_diff_eq!(iso.metrics.perimeter, 2.0 * PI * 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(iso.metrics.skyline_ratio, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(iso.metrics.area, PI * 100.0 * 100.0, epsilon = 1e-6);
        assert_eq!(iso.metrics.artificial_horizon, 72);
        assert!(iso.material.0.is_empty());
    }

    #[test]
    fn test_single_block_occludes() {
        let index = BuildingIndex::new(vec![block(10.0, -5.0, 20.0, 5.0)]);
        let iso = isovist(&index, Vec2::zeros(), &IsovistConfig::default()).unwrap();
        let m = iso.metrics;
        // only the near face is visible
        assert_abs_diff_eq!(m.solid, 10.0, epsilon = 1e-9);
        assert_eq!(iso.occluding.0.len(), 2);
        let radial = 2.0 * (100.0 - 125f64.sqrt());
        assert_abs_diff_eq!(m.occlusiv, radial, epsilon = 1e-9);
        assert_abs_diff_eq!(m.perimeter, m.solid + m.occlusiv + m.skyline, epsilon = 1e-12);
        assert_abs_diff_eq!(m.solid_ratio + m.occlusiv_ratio + m.skyline_ratio, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(m.min_radius, 10.0, epsilon = 1e-9);
        assert!(m.anticipation > 0.0);
    }

    #[test]
    fn test_courtyard_is_fully_material() {
        let courtyard = Building::new(
            Polygon::new(
                LineString::from(vec![(-50.0, -50.0), (50.0, -50.0), (50.0, 50.0), (-50.0, 50.0)]),
                vec![LineString::from(vec![(-5.0, -5.0), (-5.0, 5.0), (5.0, 5.0), (5.0, -5.0)])],
            ),
            20.0,
        )
        .unwrap();
        let index = BuildingIndex::new(vec![courtyard]);
        let iso = isovist(&index, Vec2::new(1.0, 2.0), &IsovistConfig::default()).unwrap();
        assert_abs_diff_eq!(iso.metrics.perimeter, 40.0, epsilon = 1e-9);
        assert_abs_diff_eq!(iso.metrics.skyline_ratio, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(iso.metrics.area, 100.0, epsilon = 1e-9);
        assert_eq!(iso.metrics.artificial_horizon, 0);
    }

    #[test]
    fn test_indoor_viewpoint() {
        let index = BuildingIndex::new(vec![block(-5.0, -5.0, 5.0, 5.0)]);
        assert!(matches!(
            isovist(&index, Vec2::zeros(), &IsovistConfig::default()),
            Err(Error::IndoorViewpoint { .. })
        ));
    }

    #[test]
    fn test_hidden_wall_is_pruned() {
        let vp = Vec2::zeros();
        let wall = |id, a: Vec2, b: Vec2| Wall {
            id,
            a,
            b,
            lo: azimuth(vp, a),
            hi: azimuth(vp, b),
            opens: true,
            closes: true,
        };
        let near = wall(0, Vec2::new(5.0, 5.0), Vec2::new(-5.0, 5.0));
        let far = wall(1, Vec2::new(2.0, 10.0), Vec2::new(-2.0, 10.0));
        let kept = prune_hidden(vec![far, near], vp);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, 0);
    }
}
