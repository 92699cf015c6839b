//! Core types and utilities

pub mod constants;
pub mod measurement;
pub mod units;
pub mod vec2;

pub use constants::*;
pub use measurement::{Field, FieldNames, Measurement, Row};
pub use units::*;
pub use vec2::Vec2;
