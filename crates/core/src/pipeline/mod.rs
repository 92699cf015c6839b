//! Row drivers: thermal indices over measurement tables, morphological
//! descriptors over viewpoints

pub mod comfort;
pub mod morphology;

pub use comfort::{ComfortConfig, ComfortPipeline, OutdoorTmrt, OutputRow, ThermalIndex, TmrtSource};
pub use morphology::{Descriptors, MorphologyConfig, MorphologyPipeline};
