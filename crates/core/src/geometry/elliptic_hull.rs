//! Minimum bounding ellipse of a polygon
//!
//! The polygon is reduced to its convex hull, near-collinear vertices are
//! pruned, and every support configuration of three, four and five hull
//! vertices is solved for the smallest ellipse passing through it. The best
//! candidate enclosing all vertices wins.
//!
//! Support configurations:
//! - three points: the Steiner circumellipse, image of the unit circle by the
//!   affine map sending an equilateral triangle onto the points
//! - parallelogram: image of the circumcircle of the unit square
//! - general quadrilateral: the area-minimising member of the pencil of
//!   conics through the four points
//! - five points: the unique conic through them
//!
//! # References
//! - Post, M.J. (1984). "Minimum spanning ellipsoids". Proc. 16th ACM STOC
//! - Ramanujan, S. (1914). "Modular equations and approximations to π".
//!   Quarterly Journal of Mathematics, 45, 350-372 (perimeter formula)

use crate::core_types::vec2::Vec2;
use crate::error::{Error, Result};
use crate::geometry::primitives::{coord, cross, exterior_points, from_polar, polyline_length};
use geo::orient::Direction;
use geo::{ConvexHull, LineString, Orient, Polygon};
use nalgebra::{Matrix2, Matrix3, Matrix5, Vector3, Vector5};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MabeObjective {
    Area,
    Perimeter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MabeConfig {
    /// Hull vertices turning by less than this are dropped (degrees)
    pub collinearity_threshold_deg: f64,
    /// Containment tolerance in normalised coordinates
    pub epsilon: f64,
    pub objective: MabeObjective,
    /// Hull vertices kept for the combinatorial search
    pub max_vertices: usize,
}

impl Default for MabeConfig {
    fn default() -> Self {
        Self {
            collinearity_threshold_deg: 1.0,
            epsilon: 1e-6,
            objective: MabeObjective::Area,
            max_vertices: 16,
        }
    }
}

/// Support configuration of the winning ellipse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MabeMethod {
    Tri,
    Parall,
    Quadri,
    Penta,
}

impl MabeMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            MabeMethod::Tri => "tri",
            MabeMethod::Parall => "parall",
            MabeMethod::Quadri => "quadri",
            MabeMethod::Penta => "penta",
        }
    }
}

/// Ellipse `{x : (x − c)ᵀ Q (x − c) ≤ 1}`
#[derive(Debug, Clone, Copy, PartialEq)]
struct Ellipse {
    center: Vec2,
    shape: Matrix2<f64>,
}

impl Ellipse {
    /// Image of the unit disk by `x ↦ center + m·x`
    fn from_affine(center: Vec2, m: Matrix2<f64>) -> Option<Self> {
        (m * m.transpose())
            .try_inverse()
            .map(|shape| Self { center, shape })
    }

    /// Ellipse of the conic `xᵀ·C·x = 0` in homogeneous coordinates
    fn from_conic(c: &Matrix3<f64>) -> Option<Self> {
        let a = Matrix2::new(c[(0, 0)], c[(0, 1)], c[(1, 0)], c[(1, 1)]);
        let b = Vec2::new(c[(0, 2)] + c[(2, 0)], c[(1, 2)] + c[(2, 1)]);
        let f = c[(2, 2)];
        let center = -0.5 * a.try_inverse()? * b;
        let k = center.dot(&(a * center)) - f;
        if k.abs() < f64::EPSILON {
            return None;
        }
        let shape = a / k;
        let eig = shape.symmetric_eigen();
        (eig.eigenvalues.iter().all(|&l| l > 0.0 && l.is_finite())).then_some(Self { center, shape })
    }

    fn level(&self, p: Vec2) -> f64 {
        let d = p - self.center;
        d.dot(&(self.shape * d))
    }

    /// (semi-major, semi-minor, azimuth of the major axis in [0, π))
    fn axes(&self) -> (f64, f64, f64) {
        let eig = self.shape.symmetric_eigen();
        let (i_major, i_minor) = if eig.eigenvalues[0] <= eig.eigenvalues[1] { (0, 1) } else { (1, 0) };
        let dir = eig.eigenvectors.column(i_major);
        let azimuth = dir[1].atan2(dir[0]).rem_euclid(PI);
        (
            1.0 / eig.eigenvalues[i_major].sqrt(),
            1.0 / eig.eigenvalues[i_minor].sqrt(),
            azimuth,
        )
    }

    fn area(&self) -> f64 {
        PI / self.shape.determinant().sqrt()
    }

    fn perimeter(&self) -> f64 {
        let (a, b, _) = self.axes();
        ramanujan_perimeter(a, b)
    }

    fn objective(&self, objective: MabeObjective) -> f64 {
        match objective {
            MabeObjective::Area => self.area(),
            MabeObjective::Perimeter => self.perimeter(),
        }
    }
}

/// Ramanujan's second approximation of the ellipse perimeter
pub fn ramanujan_perimeter(a: f64, b: f64) -> f64 {
    if a + b <= 0.0 {
        return 0.0;
    }
    let h = ((a - b) / (a + b)).powi(2);
    PI * (a + b) * (1.0 + 3.0 * h / (10.0 + (4.0 - 3.0 * h).sqrt()))
}

/// Minimum bounding ellipse record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EllipticHull {
    pub center: Vec2,
    pub semi_major: f64,
    pub semi_minor: f64,
    /// Azimuth of the major axis, radians in [0, π) from +x
    pub azimuth: f64,
    /// Support vertices
    pub nodes: Vec<Vec2>,
    pub method: MabeMethod,
    pub area: f64,
    pub perimeter: f64,
}

impl EllipticHull {
    /// Polygonal rendering with `segments` vertices
    pub fn to_polygon(&self, segments: usize) -> Polygon<f64> {
        let n = segments.max(8);
        let (c, s) = (self.azimuth.cos(), self.azimuth.sin());
        let ring: Vec<_> = (0..n)
            .map(|k| {
                let t = 2.0 * PI * k as f64 / n as f64;
                let local = from_polar(Vec2::zeros(), 1.0, t);
                let (x, y) = (self.semi_major * local.x, self.semi_minor * local.y);
                coord(self.center + Vec2::new(c * x - s * y, s * x + c * y))
            })
            .collect();
        Polygon::new(LineString::from(ring), vec![])
    }

    /// Whether `p` lies inside the ellipse, with relative tolerance `eps`
    pub fn contains(&self, p: Vec2, eps: f64) -> bool {
        let d = p - self.center;
        let (c, s) = (self.azimuth.cos(), self.azimuth.sin());
        let (u, v) = (c * d.x + s * d.y, -s * d.x + c * d.y);
        (u / self.semi_major).powi(2) + (v / self.semi_minor).powi(2) <= 1.0 + eps
    }
}

/// Exterior turning angle at each vertex of a convex CCW ring
fn turning_angles(pts: &[Vec2]) -> Vec<f64> {
    let n = pts.len();
    (0..n)
        .map(|k| {
            let d0 = pts[k] - pts[(k + n - 1) % n];
            let d1 = pts[(k + 1) % n] - pts[k];
            cross(d0, d1).atan2(d0.dot(&d1)).abs()
        })
        .collect()
}

/// Drop flat vertices, then the flattest ones until at most `cap` remain
fn prune_vertices(mut pts: Vec<Vec2>, threshold: f64, cap: usize) -> Vec<Vec2> {
    loop {
        if pts.len() <= 3 {
            return pts;
        }
        let angles = turning_angles(&pts);
        let Some((k, &flattest)) = angles.iter().enumerate().min_by(|a, b| a.1.total_cmp(b.1)) else {
            return pts;
        };
        if flattest >= threshold && pts.len() <= cap {
            return pts;
        }
        pts.remove(k);
    }
}

fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    fn extend(start: usize, n: usize, k: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for i in start..n {
            current.push(i);
            extend(i + 1, n, k, current, out);
            current.pop();
        }
    }
    let mut out = Vec::new();
    extend(0, n, k, &mut Vec::with_capacity(k), &mut out);
    out
}

const HALF_SQRT_3: f64 = 0.866_025_403_784_438_6;

fn steiner_ellipse(p: [Vec2; 3]) -> Option<Ellipse> {
    let g = (p[0] + p[1] + p[2]) / 3.0;
    let q = Matrix2::new(1.0, -0.5, 0.0, HALF_SQRT_3);
    let target = Matrix2::from_columns(&[p[0] - g, p[1] - g]);
    Ellipse::from_affine(g, target * q.try_inverse()?)
}

fn is_parallelogram(p: [Vec2; 4], tol: f64) -> bool {
    ((p[0] + p[2]) - (p[1] + p[3])).norm() <= tol
}

fn parallelogram_ellipse(p: [Vec2; 4]) -> Option<Ellipse> {
    let c = (p[0] + p[1] + p[2] + p[3]) / 4.0;
    let e1 = (p[0] - p[1]) / 2.0;
    let e2 = (p[0] - p[3]) / 2.0;
    Ellipse::from_affine(c, Matrix2::from_columns(&[e1, e2]) * std::f64::consts::SQRT_2)
}

fn line_through(p: Vec2, q: Vec2) -> Vector3<f64> {
    Vector3::new(p.x, p.y, 1.0).cross(&Vector3::new(q.x, q.y, 1.0))
}

fn line_pair(l1: Vector3<f64>, l2: Vector3<f64>) -> Matrix3<f64> {
    (l1 * l2.transpose() + l2 * l1.transpose()) * 0.5
}

fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Real roots of a polynomial of degree ≤ 3, coefficients ascending
fn real_roots(coeffs: &[f64]) -> Vec<f64> {
    let scale = coeffs.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
    if scale == 0.0 {
        return Vec::new();
    }
    let mut c: Vec<f64> = coeffs.iter().map(|x| x / scale).collect();
    while c.len() > 1 && c[c.len() - 1].abs() < 1e-10 {
        c.pop();
    }
    match c.len() {
        2 => vec![-c[0] / c[1]],
        3 => {
            let disc = c[1] * c[1] - 4.0 * c[2] * c[0];
            if disc < 0.0 {
                return Vec::new();
            }
            let sq = disc.sqrt();
            vec![(-c[1] - sq) / (2.0 * c[2]), (-c[1] + sq) / (2.0 * c[2])]
        }
        4 => {
            let (a0, a1, a2) = (c[0] / c[3], c[1] / c[3], c[2] / c[3]);
            let companion = Matrix3::new(0.0, 0.0, -a0, 1.0, 0.0, -a1, 0.0, 1.0, -a2);
            companion
                .complex_eigenvalues()
                .iter()
                .filter(|z| z.im.abs() <= 1e-7 * (1.0 + z.re.abs()))
                .map(|z| z.re)
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Area-minimising ellipse through four points in convex position
///
/// Along the pencil C(t) = C₁ + t·C₂ of conics through the points, the
/// area is π·|det C|/det(A)^{3/2} with A the quadratic part. Its stationary
/// points are the roots of 2·P′·Q − 3·P·Q′ with P = det C and Q = det A.
fn quadrilateral_ellipse(p: [Vec2; 4]) -> Option<Ellipse> {
    let c1 = line_pair(line_through(p[0], p[1]), line_through(p[2], p[3]));
    let c2 = line_pair(line_through(p[1], p[2]), line_through(p[3], p[0]));
    let det_c = |t: f64| (c1 + c2 * t).determinant();
    let det_a = |t: f64| {
        let m = c1 + c2 * t;
        m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)]
    };

    let (f0, f1, fm, f2) = (det_c(0.0), det_c(1.0), det_c(-1.0), det_c(2.0));
    let p2 = 0.5 * (f1 + fm) - f0;
    let odd = 0.5 * (f1 - fm);
    let p3 = (0.5 * (f2 - f0 - 4.0 * p2) - odd) / 3.0;
    let p1 = odd - p3;
    let cubic = [f0, p1, p2, p3];
    let dcubic = [p1, 2.0 * p2, 3.0 * p3];

    let (g0, g1, gm) = (det_a(0.0), det_a(1.0), det_a(-1.0));
    let q2 = 0.5 * (g1 + gm) - g0;
    let q1 = 0.5 * (g1 - gm);
    let quad = [g0, q1, q2];
    let dquad = [q1, 2.0 * q2];

    let lhs = poly_mul(&dcubic, &quad);
    let rhs = poly_mul(&cubic, &dquad);
    // the quartic terms cancel exactly
    let stationary: Vec<f64> = (0..4)
        .map(|i| 2.0 * lhs.get(i).unwrap_or(&0.0) - 3.0 * rhs.get(i).unwrap_or(&0.0))
        .collect();

    real_roots(&stationary)
        .into_iter()
        .filter(|&t| det_a(t) > 0.0)
        .filter_map(|t| Ellipse::from_conic(&(c1 + c2 * t)))
        .min_by(|a, b| a.area().total_cmp(&b.area()))
}

fn five_point_ellipse(p: [Vec2; 5]) -> Option<Ellipse> {
    let mut m = Matrix5::zeros();
    for (row, q) in p.iter().enumerate() {
        m.set_row(
            row,
            &Vector5::new(q.x * q.x, q.x * q.y, q.y * q.y, q.x, q.y).transpose(),
        );
    }
    let s = m.lu().solve(&Vector5::repeat(1.0))?;
    let conic = Matrix3::new(
        s[0],
        0.5 * s[1],
        0.5 * s[3],
        0.5 * s[1],
        s[2],
        0.5 * s[4],
        0.5 * s[3],
        0.5 * s[4],
        -1.0,
    );
    Ellipse::from_conic(&conic)
}

struct Candidate {
    ellipse: Ellipse,
    method: MabeMethod,
    support: Vec<usize>,
}

fn candidates(pts: &[Vec2]) -> Vec<Candidate> {
    let n = pts.len();
    let mut out = Vec::new();
    for s in combinations(n, 3) {
        if let Some(ellipse) = steiner_ellipse([pts[s[0]], pts[s[1]], pts[s[2]]]) {
            out.push(Candidate { ellipse, method: MabeMethod::Tri, support: s });
        }
    }
    for s in combinations(n, 4) {
        let quad = [pts[s[0]], pts[s[1]], pts[s[2]], pts[s[3]]];
        let (ellipse, method) = if is_parallelogram(quad, 1e-9) {
            (parallelogram_ellipse(quad), MabeMethod::Parall)
        } else {
            (quadrilateral_ellipse(quad), MabeMethod::Quadri)
        };
        if let Some(ellipse) = ellipse {
            out.push(Candidate { ellipse, method, support: s });
        }
    }
    for s in combinations(n, 5) {
        let five = [pts[s[0]], pts[s[1]], pts[s[2]], pts[s[3]], pts[s[4]]];
        if let Some(ellipse) = five_point_ellipse(five) {
            out.push(Candidate { ellipse, method: MabeMethod::Penta, support: s });
        }
    }
    out
}

/// Minimum bounding ellipse of `polygon`
///
/// # Errors
/// [`Error::InvalidInputs`] when the convex hull has fewer than three
/// vertices.
pub fn elliptic_hull(polygon: &Polygon<f64>, config: &MabeConfig) -> Result<EllipticHull> {
    let hull = polygon.convex_hull().orient(Direction::Default);
    let all = exterior_points(&hull);
    if all.len() < 3 || all.iter().any(|p| !(p.x.is_finite() && p.y.is_finite())) {
        return Err(Error::invalid("elliptic hull needs a polygon with a non-degenerate hull"));
    }
    let pts = prune_vertices(
        all.clone(),
        config.collinearity_threshold_deg.to_radians(),
        config.max_vertices.max(3),
    );

    // angle-weighted centroid, then unit bounding-box diameter
    let weights = turning_angles(&pts);
    let total: f64 = weights.iter().sum();
    let origin = pts.iter().zip(&weights).map(|(p, w)| p * *w).sum::<Vec2>() / total;
    let (mut lo, mut hi) = (Vec2::repeat(f64::INFINITY), Vec2::repeat(f64::NEG_INFINITY));
    for p in &pts {
        lo = lo.inf(p);
        hi = hi.sup(p);
    }
    let scale = (hi - lo).norm();
    let local: Vec<Vec2> = pts.iter().map(|p| (p - origin) / scale).collect();

    let pool = candidates(&local);
    let inflation = |c: &Candidate| local.iter().map(|p| c.ellipse.level(*p)).fold(0.0, f64::max);
    let enclosing = pool
        .iter()
        .filter(|c| inflation(c) <= 1.0 + config.epsilon)
        .min_by(|a, b| {
            a.ellipse
                .objective(config.objective)
                .total_cmp(&b.ellipse.objective(config.objective))
        });
    let best = match enclosing {
        Some(c) => c,
        None => pool
            .iter()
            .min_by(|a, b| {
                let cost = |c: &Candidate| c.ellipse.objective(config.objective) * inflation(c).max(1.0);
                cost(a).total_cmp(&cost(b))
            })
            .ok_or_else(|| Error::invalid("no ellipse through the hull vertices"))?,
    };
    debug!(candidates = pool.len(), method = best.method.as_str(), "elliptic hull");

    let mut ellipse = Ellipse {
        center: origin + best.ellipse.center * scale,
        shape: best.ellipse.shape / (scale * scale),
    };
    // enclose every hull vertex, pruned ones included
    let worst = all.iter().map(|p| ellipse.level(*p)).fold(0.0, f64::max);
    if worst > 1.0 {
        ellipse.shape /= worst;
    }
    let (semi_major, semi_minor, azimuth) = ellipse.axes();
    Ok(EllipticHull {
        center: ellipse.center,
        semi_major,
        semi_minor,
        azimuth,
        nodes: best.support.iter().map(|&i| pts[i]).collect(),
        method: best.method,
        area: ellipse.area(),
        perimeter: ramanujan_perimeter(semi_major, semi_minor),
    })
}

/// Perimeter of the convex hull of `polygon`
pub fn hull_perimeter(polygon: &Polygon<f64>) -> f64 {
    let mut ring = exterior_points(&polygon.convex_hull());
    if let Some(first) = ring.first().copied() {
        ring.push(first);
    }
    polyline_length(&ring)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use geo::{polygon, Area};

    #[test]
    fn test_square_gives_circumcircle() {
        let square = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)];
        let hull = elliptic_hull(&square, &MabeConfig::default()).unwrap();
        assert_eq!(hull.method, MabeMethod::Parall);
        assert_abs_diff_eq!(hull.semi_major, 2f64.sqrt(), epsilon = 1e-9);
        assert_abs_diff_eq!(hull.semi_minor, 2f64.sqrt(), epsilon = 1e-9);
        assert_abs_diff_eq!((hull.center - Vec2::new(1.0, 1.0)).norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_triangle_gives_steiner_ellipse() {
        let tri = polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 0.0, y: 3.0)];
        let hull = elliptic_hull(&tri, &MabeConfig::default()).unwrap();
        assert_eq!(hull.method, MabeMethod::Tri);
        let expected = 4.0 * PI / (3.0 * 3f64.sqrt()) * 6.0;
        assert_abs_diff_eq!(hull.area, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_quadrilateral_pencil_encloses() {
        let kite = polygon![(x: 0.0, y: 0.0), (x: 3.0, y: -1.0), (x: 5.0, y: 0.0), (x: 3.0, y: 2.0)];
        let hull = elliptic_hull(&kite, &MabeConfig::default()).unwrap();
        for p in exterior_points(&kite) {
            assert!(hull.contains(p, 1e-6));
        }
        assert!(hull.area >= kite.unsigned_area());
        assert!(hull.perimeter >= hull_perimeter(&kite) - 1e-9);
    }

    #[test]
    fn test_real_roots_cubic() {
        // (t − 1)(t − 2)(t + 3)
        let mut roots = real_roots(&[6.0, -7.0, 0.0, 1.0]);
        roots.sort_by(f64::total_cmp);
        assert_eq!(roots.len(), 3);
        assert_abs_diff_eq!(roots[0], -3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(roots[2], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ramanujan_circle() {
        assert_abs_diff_eq!(ramanujan_perimeter(2.0, 2.0), 4.0 * PI, epsilon = 1e-12);
    }
}
