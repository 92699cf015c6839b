//! Physical and human-biometric constants
//!
//! All indices share one reference subject: a standing adult walking slowly
//! outdoors in light summer clothing. The record is plain data, built once
//! (usually through `Default`) and passed by reference into every index.
//! Nothing here is mutable process-wide state.
//!
//! # References
//! - ISO 7730 (2005) - Fanger PMV/PPD, clothing area factor
//! - ASHRAE 55 (2020) - two-node model constants
//! - Höppe, P. (1999). "The physiological equivalent temperature - a universal
//!   index for the biometeorological assessment of the thermal environment."
//!   Int. J. Biometeorol., 43, 71-75.

use crate::core_types::units::Celsius;
use serde::{Deserialize, Serialize};

/// Stefan-Boltzmann constant (W/(m²·K⁴))
pub const STEFAN_BOLTZMANN: f64 = 5.67e-8;

/// Conversion factor from W/m² of metabolic heat to met units (ASHRAE 55)
pub const MET_TO_WATTS: f64 = 58.2;

/// Conversion factor from met to W/m² used by ISO 7730
pub const MET_TO_WATTS_ISO: f64 = 58.15;

/// Standard atmospheric pressure (hPa)
pub const STANDARD_PRESSURE_HPA: f64 = 1013.25;

/// Standard atmospheric pressure (Pa)
pub const STANDARD_PRESSURE_PA: f64 = 101_325.0;

/// Human model shared by every thermal index
///
/// Temperatures are kept as [`Celsius`]; the remaining fields are in the
/// units named on each field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanModel {
    /// Body core temperature (°C)
    pub core_temperature: Celsius,
    /// Neutral skin temperature of the two-node model (°C)
    pub neutral_skin_temperature: Celsius,
    /// Neutral core temperature of the two-node model (°C)
    pub neutral_core_temperature: Celsius,
    /// Metabolic rate M (W/m²)
    pub metabolic_rate: f64,
    /// Mechanical power W (W/m²)
    pub mechanical_power: f64,
    /// Clothing insulation (clo)
    pub clothing: f64,
    /// DuBois body surface area (m²)
    pub body_surface_area: f64,
    /// Long-wave emissivity of skin and clothing
    pub emissivity: f64,
    /// Short-wave absorption coefficient of the body
    pub shortwave_absorptivity: f64,
    /// Effective radiation area factor of a standing person
    pub effective_radiation_area: f64,
    /// Stefan-Boltzmann constant (W/(m²·K⁴))
    pub stefan_boltzmann: f64,
    /// Atmospheric pressure (Pa)
    pub atmospheric_pressure: f64,
}

impl Default for HumanModel {
    fn default() -> Self {
        Self {
            core_temperature: Celsius::new(37.0),
            neutral_skin_temperature: Celsius::new(33.7),
            neutral_core_temperature: Celsius::new(36.8),
            metabolic_rate: 93.0,
            mechanical_power: 0.0,
            clothing: 0.5,
            body_surface_area: 1.8258,
            emissivity: 0.97,
            shortwave_absorptivity: 0.7,
            effective_radiation_area: 0.72,
            stefan_boltzmann: STEFAN_BOLTZMANN,
            atmospheric_pressure: STANDARD_PRESSURE_PA,
        }
    }
}

impl HumanModel {
    /// Mean skin temperature of a comfortable subject: tsk = 35.7 − 0.0275·(M − W)
    #[inline]
    pub fn skin_temperature(&self) -> f64 {
        35.7 - 0.0275 * (self.metabolic_rate - self.mechanical_power)
    }

    /// Clothing area factor fcl
    ///
    /// fcl = 1 + 0.2·clo for clo ≤ 0.5, else 1.05 + 0.1·clo
    #[inline]
    pub fn clothing_area_factor(&self) -> f64 {
        if self.clothing <= 0.5 {
            1.0 + 0.2 * self.clothing
        } else {
            1.05 + 0.1 * self.clothing
        }
    }

    /// Intrinsic clothing thermal resistance (m²·K/W), 1 clo = 0.155 m²·K/W
    #[inline]
    pub fn clothing_resistance(&self) -> f64 {
        0.155 * self.clothing
    }

    /// Metabolic rate in met units (ASHRAE 55 convention, 58.2 W/m²)
    #[inline]
    pub fn met(&self) -> f64 {
        self.metabolic_rate / MET_TO_WATTS
    }

    /// Metabolic rate in met units (ISO 7730 convention, 58.15 W/m²)
    #[inline]
    pub fn met_iso(&self) -> f64 {
        self.metabolic_rate / MET_TO_WATTS_ISO
    }

    /// Atmospheric pressure in hPa
    #[inline]
    pub fn pressure_hpa(&self) -> f64 {
        self.atmospheric_pressure / 100.0
    }

    /// Copy of the model with another clothing insulation
    pub fn with_clothing(&self, clo: f64) -> Self {
        Self {
            clothing: clo,
            ..self.clone()
        }
    }
}

/// Sex of the PET subject (changes basal metabolism and sweat rate)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    /// Male subject
    Male,
    /// Female subject
    Female,
}

/// Body posture of the PET subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Posture {
    /// Standing, effective radiation area 0.725
    Standing,
    /// Sitting, effective radiation area 0.696
    Sitting,
}

impl Posture {
    /// Fraction of the DuBois area exchanging long-wave radiation
    #[inline]
    pub fn effective_radiation_area(self) -> f64 {
        match self {
            Posture::Standing => 0.725,
            Posture::Sitting => 0.696,
        }
    }
}

/// Subject of the Munich Energy-balance Model for Individuals (PET)
///
/// Defaults are the VDI 3787 reference person: 35-year-old man, 75 kg,
/// 1.75 m, light activity (80 W on top of basal metabolism), 0.9 clo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetSubject {
    /// Age (years)
    pub age: f64,
    /// Body mass (kg)
    pub mass: f64,
    /// Height (m)
    pub height: f64,
    /// External work added to basal metabolism (W)
    pub work: f64,
    /// Clothing insulation (clo)
    pub clothing: f64,
    /// Sex of the subject
    pub sex: Sex,
    /// Posture of the subject
    pub posture: Posture,
}

impl Default for PetSubject {
    fn default() -> Self {
        Self {
            age: 35.0,
            mass: 75.0,
            height: 1.75,
            work: 80.0,
            clothing: 0.9,
            sex: Sex::Male,
            posture: Posture::Standing,
        }
    }
}

impl PetSubject {
    /// DuBois body surface area (m²)
    #[inline]
    pub fn dubois_area(&self) -> f64 {
        0.203 * self.mass.powf(0.425) * self.height.powf(0.725)
    }

    /// Total metabolic heat production (W): Harris-Benedict style basal rate + work
    pub fn metabolic_heat(&self) -> f64 {
        let ponderal = self.height * 100.0 / self.mass.powf(1.0 / 3.0);
        let basal = match self.sex {
            Sex::Male => {
                3.45 * self.mass.powf(0.75)
                    * (1.0 + 0.004 * (30.0 - self.age) + 0.010 * (ponderal - 43.4))
            }
            Sex::Female => {
                3.19 * self.mass.powf(0.75)
                    * (1.0 + 0.004 * (30.0 - self.age) + 0.018 * (ponderal - 42.1))
            }
        };
        basal + self.work
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_skin_temperature() {
        let human = HumanModel::default();
        assert!((human.skin_temperature() - 33.1425).abs() < 1e-12);
    }

    #[test]
    fn test_clothing_area_factor_branches() {
        let light = HumanModel::default();
        assert!((light.clothing_area_factor() - 1.1).abs() < 1e-12);
        let heavy = light.with_clothing(1.0);
        assert!((heavy.clothing_area_factor() - 1.15).abs() < 1e-12);
    }

    #[test]
    fn test_reference_person_surface_area() {
        let subject = PetSubject::default();
        let adu = subject.dubois_area();
        assert!(adu > 1.85 && adu < 1.95, "DuBois area {adu}");
    }

    #[test]
    fn test_female_metabolism_lower() {
        let male = PetSubject::default();
        let female = PetSubject {
            sex: Sex::Female,
            ..PetSubject::default()
        };
        assert!(female.metabolic_heat() < male.metabolic_heat());
    }
}
