//! Thermal-comfort physics: atmospheric primitives and one module per index

pub mod atmosphere;
pub mod etu;
pub mod perception;
pub mod pet;
pub mod pmv;
pub mod radiant;
pub mod two_node;
pub mod utci;

pub use etu::{etu, etu_detailed, EtuInputs, EtuResult};
pub use perception::{PerceptionRange, PerceptionScale};
pub use pet::{pet, pet_detailed, PetResult};
pub use pmv::{perceived_temperature, pmv, ppd};
pub use radiant::{
    tmrt_from_global, tmrt_from_globe, tmrt_from_radiometer, GlobalRadiationInputs, GlobeClosure,
    GlobeConfig, RadiometerChannels,
};
pub use two_node::{set, set_mist, MistingConfig};
pub use utci::{utci, WindProfile};
