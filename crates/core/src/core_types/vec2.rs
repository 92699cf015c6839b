//! Vector type alias for planar positions and directions.

use nalgebra::Vector2;

/// 2D vector type for view-points, footprint vertices and ray directions.
///
/// This is a simple alias for `nalgebra::Vector2<f64>`, used throughout the
/// geometry and network modules. Coordinates are projected metres.
pub type Vec2 = Vector2<f64>;
