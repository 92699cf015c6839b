//! Urban Comfort Core Library
//!
//! Outdoor thermal-comfort indices and urban-form morphology for
//! pedestrian-level studies.
//!
//! ## Thermal comfort
//!
//! - PET, PMV/PPD, PT, SET and SETmist, UTCI, ETU
//! - Mean radiant temperature from radiometers, a pyranometer or a globe
//! - Row driver mapping measurement tables to index tables
//!
//! ## Urban morphology
//!
//! - 2D and 2.5D ray casting against building prisms
//! - Exact isovists with material, occluding and skyline edges
//! - Star-shaped kernels and minimum-area bounding ellipses
//! - Planar road graph with shortest paths, neighbourhoods and centralities
//! - Canonical crossroad sequences

// Core types and utilities
pub mod core_types;
pub mod error;

// Thermal comfort
pub mod physics;

// Urban morphology
pub mod geometry;
pub mod network;

// Row drivers
pub mod pipeline;

pub use core_types::{
    Celsius, Degrees, FieldNames, HumanModel, Kelvin, Measurement, MetersPerSecond, Percent,
    PetSubject, Row, Vec2, WattsPerSquareMeter,
};
pub use error::{Error, Result};

pub use physics::{
    etu, pet, pmv, ppd, set, set_mist, tmrt_from_global, tmrt_from_globe, tmrt_from_radiometer,
    utci, PerceptionScale,
};

pub use geometry::{
    elliptic_hull, isovist, star_kernel, Building, BuildingIndex, CrossroadSequence, EllipticHull,
    Isovist, StarKernel,
};
pub use network::{neighbourhood, shortest_path, RoadGraph, RoadPath};

pub use pipeline::{ComfortConfig, ComfortPipeline, MorphologyConfig, MorphologyPipeline, ThermalIndex};
