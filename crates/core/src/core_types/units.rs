//! Semantic unit types for type-safe physical quantity handling
//!
//! Newtype wrappers keep the biometeorological inputs from being mixed up
//! (air temperature in °C with radiant temperature in K, relative humidity
//! in percent with a 0-1 fraction, wind in m/s with km/h).
//!
//! # Design Philosophy
//! - All quantities are `f64`: heat-balance solvers raise temperatures to the
//!   fourth power and subtract nearly equal terms
//! - Total ordering via `Ord` (NaN compares greater than every value)
//! - `Deref` to the raw value for arithmetic inside the solvers
//! - Explicit conversion methods between related types
//!
//! # Usage
//! ```
//! use urban_comfort_core::core_types::units::{Celsius, Kelvin, Percent};
//!
//! let ta = Celsius::new(25.0);
//! let k: Kelvin = ta.into();
//! assert!((*k - 298.15).abs() < 1e-9);
//!
//! let rh = Percent::new(50.0);
//! assert!((rh.fraction() - 0.5).abs() < 1e-12);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Deref, Sub};

/// Celsius to Kelvin conversion offset (0°C = 273.15 K)
pub const CELSIUS_KELVIN_OFFSET: f64 = 273.15;

// ============================================================================
// TEMPERATURE TYPES
// ============================================================================

/// Temperature in degrees Celsius
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Celsius(f64);

impl Eq for Celsius {}

impl PartialOrd for Celsius {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Celsius {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Deref for Celsius {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl Celsius {
    /// Absolute zero in Celsius
    pub const ABSOLUTE_ZERO: Celsius = Celsius(-CELSIUS_KELVIN_OFFSET);

    /// Create a new Celsius temperature. Asserts value >= absolute zero (-273.15°C).
    ///
    /// NaN is accepted: missing measurements travel as NaN until the index
    /// entry points turn them into an undefined result.
    #[inline]
    #[must_use]
    #[track_caller]
    pub fn new(value: f64) -> Self {
        assert!(
            value.is_nan() || value >= -CELSIUS_KELVIN_OFFSET,
            "Celsius::new: value is below absolute zero (-273.15°C)"
        );
        Celsius(value)
    }

    /// Create a Celsius temperature from a measurement
    ///
    /// Returns `None` for NaN or values below absolute zero, so a bad station
    /// reading yields an undefined index instead of a panic.
    #[inline]
    #[must_use]
    pub fn checked(value: f64) -> Option<Self> {
        (value >= -CELSIUS_KELVIN_OFFSET).then_some(Celsius(value))
    }

    /// Convert to Kelvin
    #[inline]
    #[must_use]
    pub fn to_kelvin(self) -> Kelvin {
        Kelvin(self.0 + CELSIUS_KELVIN_OFFSET)
    }

    /// Fourth power of the absolute temperature (K⁴), the Stefan-Boltzmann term
    #[inline]
    #[must_use]
    pub fn kelvin_pow4(self) -> f64 {
        self.to_kelvin().0.powi(4)
    }
}

impl From<f64> for Celsius {
    fn from(v: f64) -> Self {
        Celsius(v)
    }
}

impl From<Celsius> for f64 {
    fn from(c: Celsius) -> f64 {
        c.0
    }
}

impl From<Celsius> for Kelvin {
    fn from(c: Celsius) -> Kelvin {
        c.to_kelvin()
    }
}

// Celsius - Celsius = plain difference in kelvins
impl Sub for Celsius {
    type Output = f64;
    fn sub(self, rhs: Celsius) -> f64 {
        self.0 - rhs.0
    }
}

impl Add<f64> for Celsius {
    type Output = Celsius;
    fn add(self, rhs: f64) -> Celsius {
        Celsius(self.0 + rhs)
    }
}

impl fmt::Display for Celsius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}°C", self.0)
    }
}

/// Temperature in Kelvin (absolute scale)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Kelvin(f64);

impl Eq for Kelvin {}

impl PartialOrd for Kelvin {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Kelvin {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Deref for Kelvin {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl Kelvin {
    /// Create a new Kelvin temperature. Asserts value >= absolute zero (0 K).
    #[inline]
    #[must_use]
    #[track_caller]
    pub fn new(value: f64) -> Self {
        assert!(
            value.is_nan() || value >= 0.0,
            "Kelvin::new: value is below absolute zero (0 K)"
        );
        Kelvin(value)
    }

    /// Convert to Celsius
    #[inline]
    #[must_use]
    pub fn to_celsius(self) -> Celsius {
        Celsius(self.0 - CELSIUS_KELVIN_OFFSET)
    }

    /// Temperature whose black-body emittance with emissivity ε equals `flux`
    ///
    /// Inverts `flux = ε·σ·T⁴`; returns NaN for a negative flux.
    #[inline]
    #[must_use]
    pub fn from_emittance(flux: f64, emissivity: f64, stefan_boltzmann: f64) -> Kelvin {
        Kelvin((flux / (emissivity * stefan_boltzmann)).powf(0.25))
    }
}

impl fmt::Display for Kelvin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}K", self.0)
    }
}

// ============================================================================
// HUMIDITY
// ============================================================================

/// Relative humidity in percent (0-100)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Percent(f64);

impl Eq for Percent {}

impl PartialOrd for Percent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Percent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Deref for Percent {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl Percent {
    /// Create a percentage; values are clamped to [0, 100] (NaN passes through)
    #[inline]
    #[must_use]
    pub fn new(value: f64) -> Self {
        Percent(value.clamp(0.0, 100.0))
    }

    /// Value as a 0-1 fraction
    #[inline]
    #[must_use]
    pub fn fraction(self) -> f64 {
        self.0 / 100.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

// ============================================================================
// WIND AND RADIATION
// ============================================================================

/// Wind speed in meters per second
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct MetersPerSecond(f64);

impl Deref for MetersPerSecond {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl MetersPerSecond {
    /// Create a wind speed; negative readings are clamped to calm (NaN passes through)
    #[inline]
    #[must_use]
    pub fn new(value: f64) -> Self {
        MetersPerSecond(if value < 0.0 { 0.0 } else { value })
    }

    /// Convert to km/h
    #[inline]
    #[must_use]
    pub fn to_km_per_hour(self) -> f64 {
        self.0 * 3.6
    }

    /// Extrapolate a wind speed measured at `from_height` to `to_height`
    /// with a neutral logarithmic profile of roughness length `z0` (m)
    #[inline]
    #[must_use]
    pub fn log_profile(self, from_height: f64, to_height: f64, z0: f64) -> Self {
        MetersPerSecond(self.0 * (to_height / z0).ln() / (from_height / z0).ln())
    }
}

impl fmt::Display for MetersPerSecond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} m/s", self.0)
    }
}

/// Irradiance in watts per square meter
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct WattsPerSquareMeter(f64);

impl Deref for WattsPerSquareMeter {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl WattsPerSquareMeter {
    /// Create an irradiance (signed: net fluxes may be negative)
    #[inline]
    #[must_use]
    pub const fn new(value: f64) -> Self {
        WattsPerSquareMeter(value)
    }
}

impl fmt::Display for WattsPerSquareMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} W/m²", self.0)
    }
}

// ============================================================================
// ANGLES
// ============================================================================

/// Angle in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Degrees(f64);

impl Deref for Degrees {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl Degrees {
    /// Create an angle in degrees
    #[inline]
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Degrees(value)
    }

    /// Convert to radians
    #[inline]
    #[must_use]
    pub fn to_radians(self) -> f64 {
        self.0.to_radians()
    }

    /// Create from radians
    #[inline]
    #[must_use]
    pub fn from_radians(rad: f64) -> Self {
        Degrees(rad.to_degrees())
    }
}

impl fmt::Display for Degrees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}°", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_celsius_kelvin_roundtrip() {
        let t = Celsius::new(36.8);
        assert!((*t.to_kelvin().to_celsius() - 36.8).abs() < 1e-12);
    }

    #[test]
    #[should_panic(expected = "below absolute zero")]
    fn test_celsius_below_absolute_zero_panics() {
        let _ = Celsius::new(-300.0);
    }

    #[test]
    fn test_checked_celsius_rejects_impossible_readings() {
        assert_eq!(Celsius::checked(-300.0), None);
        assert_eq!(Celsius::checked(f64::NAN), None);
        assert_eq!(Celsius::checked(-273.15), Some(Celsius::ABSOLUTE_ZERO));
        assert_eq!(Celsius::checked(21.5).map(|t| *t), Some(21.5));
    }

    #[test]
    fn test_nan_celsius_is_accepted() {
        assert!(Celsius::new(f64::NAN).is_nan());
    }

    #[test]
    fn test_emittance_inversion() {
        let t = Celsius::new(20.0);
        let flux = 0.97 * 5.67e-8 * t.kelvin_pow4();
        let back = Kelvin::from_emittance(flux, 0.97, 5.67e-8).to_celsius();
        assert!((*back - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_log_profile_increases_with_height() {
        let v = MetersPerSecond::new(2.0).log_profile(1.1, 10.0, 0.01);
        assert!((*v - 2.939_17).abs() < 1e-4, "got {}", *v);
    }

    #[test]
    fn test_percent_clamps() {
        assert_eq!(*Percent::new(120.0), 100.0);
        assert_eq!(*Percent::new(-3.0), 0.0);
    }

    #[test]
    fn test_degrees_radians() {
        let h = Degrees::new(90.0);
        assert!((h.to_radians() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((*Degrees::from_radians(std::f64::consts::PI) - 180.0).abs() < 1e-12);
    }

    #[test]
    fn test_irradiance_display() {
        assert_eq!(WattsPerSquareMeter::new(412.345).to_string(), "412.3 W/m²");
    }
}
