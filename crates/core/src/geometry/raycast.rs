//! Ray casting against building footprints in 2D and 2.5D
//!
//! A ray leaves the viewpoint along a unit direction and stops at the first
//! wall it meets or at the maximum range. The 2.5D cast also reports the
//! height-to-width ratio (H/W) of the building that constrains the view,
//! either the nearest one or the one with the steepest elevation angle
//! (background mode).
//!
//! A viewpoint lying on a wall is anchored to that building: rays running
//! into it or along its wall are meaningless, rays leaving it ignore it.

use crate::core_types::vec2::Vec2;
use crate::error::{Error, Result};
use crate::geometry::buildings::BuildingIndex;
use crate::geometry::primitives::{
    cross, ray_segment_intersection, unit, EPSILON,
};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2, TAU};

/// Ray casting parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RayCastConfig {
    /// Maximum ray length (m)
    pub max_length: f64,
    /// Eye height of the viewpoint (m)
    pub viewpoint_height: f64,
    /// Keep the steepest constraining building instead of the nearest
    pub background: bool,
}

impl Default for RayCastConfig {
    fn default() -> Self {
        Self {
            max_length: 100.0,
            viewpoint_height: 0.0,
            background: false,
        }
    }
}

/// One cast ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec2,
    /// Unit direction
    pub direction: Vec2,
    /// First hit, or the end point at maximum range
    pub hit: Vec2,
    /// Distance from origin to `hit`
    pub distance: f64,
    /// Index of the building hit
    pub building: Option<usize>,
    /// Height-to-width ratio of the constraining building (2.5D casts only)
    pub height_width: Option<f64>,
}

impl Ray {
    fn open(origin: Vec2, direction: Vec2, length: f64) -> Self {
        Self {
            origin,
            direction,
            hit: origin + direction * length,
            distance: length,
            building: None,
            height_width: None,
        }
    }

    /// Ray from a viewpoint on a wall into or along its own building
    fn against_wall(origin: Vec2, direction: Vec2, building: usize) -> Self {
        Self {
            origin,
            direction,
            hit: origin,
            distance: 0.0,
            building: Some(building),
            height_width: None,
        }
    }

    /// Whether the ray was stopped by a building
    #[inline]
    pub fn is_blocked(&self) -> bool {
        self.building.is_some()
    }

    /// Elevation angle of the constraining building (rad), 0 when open
    ///
    /// A ray stopped at its origin faces a wall and sees no sky.
    pub fn elevation(&self) -> f64 {
        if self.is_blocked() && self.distance <= EPSILON {
            return FRAC_PI_2;
        }
        self.height_width.map_or(0.0, |hw| hw.max(0.0).atan())
    }
}

const HALF_SQRT_3: f64 = 0.866_025_403_784_438_6;

/// Directions every 30°, exact
const TABLE_12: [[f64; 2]; 12] = [
    [1.0, 0.0],
    [HALF_SQRT_3, 0.5],
    [0.5, HALF_SQRT_3],
    [0.0, 1.0],
    [-0.5, HALF_SQRT_3],
    [-HALF_SQRT_3, 0.5],
    [-1.0, 0.0],
    [-HALF_SQRT_3, -0.5],
    [-0.5, -HALF_SQRT_3],
    [0.0, -1.0],
    [0.5, -HALF_SQRT_3],
    [HALF_SQRT_3, -0.5],
];

/// Directions every 45°, exact
const TABLE_8: [[f64; 2]; 8] = [
    [1.0, 0.0],
    [FRAC_1_SQRT_2, FRAC_1_SQRT_2],
    [0.0, 1.0],
    [-FRAC_1_SQRT_2, FRAC_1_SQRT_2],
    [-1.0, 0.0],
    [-FRAC_1_SQRT_2, -FRAC_1_SQRT_2],
    [0.0, -1.0],
    [FRAC_1_SQRT_2, -FRAC_1_SQRT_2],
];

/// `n` equi-angular unit directions starting at +x, counter-clockwise
///
/// Divisors of 12 and 8 reuse the exact tables so that opposite and
/// perpendicular rays are exactly symmetric.
pub fn panoptic_directions(n: usize) -> Vec<Vec2> {
    let from_table = |table: &[[f64; 2]], step: usize| {
        table
            .iter()
            .step_by(step)
            .map(|d| Vec2::new(d[0], d[1]))
            .collect()
    };
    match n {
        12 | 6 | 3 => from_table(&TABLE_12, 12 / n),
        8 | 4 | 2 => from_table(&TABLE_8, 8 / n),
        0 => Vec::new(),
        _ => (0..n).map(|k| unit(TAU * k as f64 / n as f64)).collect(),
    }
}

/// First wall hit by each candidate building along a ray: (distance, building)
fn wall_hits(
    index: &BuildingIndex,
    origin: Vec2,
    direction: Vec2,
    length: f64,
    skip: Option<usize>,
) -> Vec<(f64, usize)> {
    let end = origin + direction * length;
    index
        .along_segment(origin, end)
        .into_iter()
        .filter(|&i| Some(i) != skip)
        .filter_map(|i| {
            index
                .get(i)
                .edges()
                .filter_map(|(a, b)| ray_segment_intersection(origin, direction, a, b))
                .filter(|&t| t <= length)
                .reduce(f64::min)
                .map(|t| (t, i))
        })
        .collect()
}

/// Resolve the anchoring building of a viewpoint on a wall
///
/// Returns the building to ignore, or fails when the ray enters the
/// anchoring building or runs along its wall.
fn resolve_anchor(index: &BuildingIndex, origin: Vec2, direction: Vec2) -> Result<Option<usize>> {
    let Some(anchor) = index.anchoring(origin) else {
        return Ok(None);
    };
    let building = index.get(anchor);
    let probe_step = 1e-6;
    let probe = origin + direction * probe_step;
    if building.strictly_contains(probe) || building.boundary_distance(probe) <= EPSILON {
        return Err(Error::AnchoredInside);
    }
    // Walls through the origin that the ray grazes count as tangent
    let tangent = building.edges().any(|(a, b)| {
        let ab = b - a;
        let on_wall = cross(ab, origin - a).abs() <= EPSILON * ab.norm().max(1.0);
        on_wall && cross(ab, direction).abs() <= EPSILON
    });
    if tangent {
        return Err(Error::AnchoredInside);
    }
    Ok(Some(anchor))
}

fn validate(origin: Vec2, direction: Vec2, length: f64) -> Result<()> {
    if !(origin.x.is_finite() && origin.y.is_finite()) {
        return Err(Error::invalid("viewpoint is not a finite point"));
    }
    if !((direction.norm() - 1.0).abs() < 1e-6) {
        return Err(Error::invalid("ray direction must be a unit vector"));
    }
    if !(length.is_finite() && length > 0.0) {
        return Err(Error::invalid("ray length must be positive"));
    }
    Ok(())
}

/// Cast a single ray in the plane
///
/// # Errors
/// - [`Error::IndoorViewpoint`] when the origin is strictly inside a building
/// - [`Error::AnchoredInside`] when the origin is on a wall and the ray
///   enters or follows that building
/// - [`Error::InvalidInputs`] for a non-unit direction or non-positive range
pub fn cast_2d(index: &BuildingIndex, origin: Vec2, direction: Vec2, max_length: f64) -> Result<Ray> {
    validate(origin, direction, max_length)?;
    index.ensure_outdoor(origin)?;
    let skip = resolve_anchor(index, origin, direction)?;
    let nearest = wall_hits(index, origin, direction, max_length, skip)
        .into_iter()
        .min_by(|a, b| a.0.total_cmp(&b.0));
    Ok(match nearest {
        Some((t, i)) => Ray {
            hit: origin + direction * t,
            distance: t,
            building: Some(i),
            ..Ray::open(origin, direction, max_length)
        },
        None => Ray::open(origin, direction, max_length),
    })
}

/// Cast a single ray over prismatic buildings
///
/// Each building hit is seen under the slope (h − h₀)/d. A building
/// constrains the view when its slope exceeds every nearer one; the nearest
/// constraining building is kept, or the steepest in background mode.
pub fn cast_2_5d(
    index: &BuildingIndex,
    origin: Vec2,
    direction: Vec2,
    config: &RayCastConfig,
) -> Result<Ray> {
    validate(origin, direction, config.max_length)?;
    index.ensure_outdoor(origin)?;
    let skip = resolve_anchor(index, origin, direction)?;
    let mut hits = wall_hits(index, origin, direction, config.max_length, skip);
    hits.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut steepest = 0.0;
    let mut chosen: Option<(f64, usize, f64)> = None;
    for (d, i) in hits {
        let rise = index.get(i).height - config.viewpoint_height;
        if rise <= 0.0 {
            continue;
        }
        let slope = rise / d.max(EPSILON);
        if slope > steepest {
            steepest = slope;
            chosen = Some((d, i, slope));
            if !config.background {
                break;
            }
        }
    }
    Ok(match chosen {
        Some((d, i, slope)) => Ray {
            hit: origin + direction * d,
            distance: d,
            building: Some(i),
            height_width: Some(slope),
            ..Ray::open(origin, direction, config.max_length)
        },
        None => Ray {
            height_width: Some(0.0),
            ..Ray::open(origin, direction, config.max_length)
        },
    })
}

/// Cast one ray per direction
pub fn cast_many(
    index: &BuildingIndex,
    origin: Vec2,
    directions: &[Vec2],
    config: &RayCastConfig,
    two_and_half: bool,
) -> Result<Vec<Ray>> {
    if directions.is_empty() {
        return Err(Error::invalid("at least one ray direction is required"));
    }
    directions
        .iter()
        .map(|&d| {
            if two_and_half {
                cast_2_5d(index, origin, d, config)
            } else {
                cast_2d(index, origin, d, config.max_length)
            }
        })
        .collect()
}

/// Summary of a panoptic cast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayStatistics {
    /// Shortest ray length (MinLenRad)
    pub min_length: f64,
    /// Longest ray length (MaxLenRad)
    pub max_length: f64,
    /// Mean ray length
    pub mean_length: f64,
    /// Mean H/W over all rays
    pub mean_height_width: f64,
    /// Sky view proxy 1 − mean(sin²β) over the ray elevations β
    pub sky_view: f64,
}

impl RayStatistics {
    pub fn from_rays(rays: &[Ray]) -> Option<Self> {
        if rays.is_empty() {
            return None;
        }
        let n = rays.len() as f64;
        let min_length = rays.iter().map(|r| r.distance).fold(f64::INFINITY, f64::min);
        let max_length = rays.iter().map(|r| r.distance).fold(0.0, f64::max);
        let mean_length = rays.iter().map(|r| r.distance).sum::<f64>() / n;
        let mean_height_width = rays.iter().map(|r| r.height_width.unwrap_or(0.0)).sum::<f64>() / n;
        let sky_view = 1.0 - rays.iter().map(|r| r.elevation().sin().powi(2)).sum::<f64>() / n;
        Some(Self {
            min_length,
            max_length,
            mean_length,
            mean_height_width,
            sky_view,
        })
    }
}

/// Panoptic 2.5D cast with `n` rays
///
/// From a viewpoint on a facade, rays entering or grazing that building stop
/// at the origin with zero length and no H/W ratio.
///
/// # Errors
/// [`Error::IndoorViewpoint`] for an origin inside a building,
/// [`Error::InvalidInputs`] for `n = 0` or a non-finite origin.
pub fn panoptic_cast(
    index: &BuildingIndex,
    origin: Vec2,
    n: usize,
    config: &RayCastConfig,
) -> Result<Vec<Ray>> {
    let directions = panoptic_directions(n);
    if directions.is_empty() {
        return Err(Error::invalid("at least one ray direction is required"));
    }
    directions
        .into_iter()
        .map(|d| match cast_2_5d(index, origin, d, config) {
            Err(Error::AnchoredInside) => index
                .anchoring(origin)
                .map(|anchor| Ray::against_wall(origin, d, anchor))
                .ok_or(Error::AnchoredInside),
            other => other,
        })
        .collect()
}
