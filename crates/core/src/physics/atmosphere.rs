//! Atmospheric primitives shared by the thermal indices
//!
//! Saturation and partial vapour pressure, convective and radiative heat
//! transfer coefficients of a clothed body, the clothing-surface temperature
//! fixed point, and the split of global short-wave irradiance into direct
//! and diffuse parts from cloud cover.
//!
//! # Scientific References
//! - Fanger, P.O. (1970). "Thermal Comfort". Danish Technical Press.
//! - ISO 7726 (1998). "Ergonomics of the thermal environment - Instruments
//!   for measuring physical quantities"
//! - Kasten, F. & Czeplak, G. (1980). "Solar and terrestrial radiation
//!   dependent on the amount and type of cloud". Solar Energy, 24, 177-189

use crate::core_types::constants::{HumanModel, STANDARD_PRESSURE_HPA};
use crate::core_types::units::{Degrees, Percent};
use crate::error::{Error, Result};
use tracing::debug;

/// Iteration bound shared by the fixed-point solvers
pub const MAX_ITERATIONS: usize = 150;

/// Tolerance of temperature fixed points (°C)
pub const TEMPERATURE_TOLERANCE: f64 = 1e-3;

/// Default solar altitude used when none is supplied
pub const DEFAULT_SOLAR_ALTITUDE: Degrees = Degrees::new(66.0);

/// Saturation vapour pressure over water (hPa)
///
/// P_s(T) = exp(18.956 − 4030.183 / (T + 235))
///
/// # Arguments
/// * `temperature` - Air or surface temperature (°C)
#[inline]
pub fn saturation_vapour_pressure(temperature: f64) -> f64 {
    (18.956 - 4030.183 / (temperature + 235.0)).exp()
}

/// Partial vapour pressure of moist air (hPa)
///
/// # Arguments
/// * `temperature` - Air temperature (°C)
/// * `relative_humidity` - Relative humidity (%, clamped to 0-100)
#[inline]
pub fn partial_vapour_pressure(temperature: f64, relative_humidity: f64) -> f64 {
    Percent::new(relative_humidity).fraction() * saturation_vapour_pressure(temperature)
}

/// Partial vapour pressure of moist air (kPa)
#[inline]
pub fn partial_vapour_pressure_kpa(temperature: f64, relative_humidity: f64) -> f64 {
    partial_vapour_pressure(temperature, relative_humidity) / 10.0
}

/// Convective heat transfer coefficient of the clothed body (W/(m²·K))
///
/// Forced convection for Wv ≥ 0.1 m/s:
/// h_c = 12.1 · √(Wv · P / 1013.25)
///
/// Otherwise the largest of the free-convection and metabolic-activity
/// closures:
/// max(2.38·|tsk − Ta|^0.25, 3.5 + 5.2·v_a, 8.7·v_a^0.6) with
/// v_a = Wv + 0.0052·(M − 58)
///
/// # Arguments
/// * `air_temperature` - Ta (°C)
/// * `wind_speed` - Wv (m/s)
/// * `human` - Reference subject (skin temperature, metabolism, pressure)
pub fn convective_coefficient(air_temperature: f64, wind_speed: f64, human: &HumanModel) -> f64 {
    if wind_speed >= 0.1 {
        return 12.1 * (wind_speed * human.pressure_hpa() / STANDARD_PRESSURE_HPA).sqrt();
    }
    let activity = wind_speed + 0.0052 * (human.metabolic_rate - 58.0);
    let free = 2.38 * (human.skin_temperature() - air_temperature).abs().powf(0.25);
    free.max(3.5 + 5.2 * activity)
        .max(8.7 * activity.max(0.0).powf(0.6))
}

/// Linearised radiative heat transfer coefficient (W/(m²·K))
///
/// h_r = 4·ε·σ·f_eff·((tcl + Tmrt)/2 + 273.15)³
#[inline]
pub fn radiative_coefficient(
    clothing_temperature: f64,
    mean_radiant_temperature: f64,
    human: &HumanModel,
) -> f64 {
    let mean_k = (clothing_temperature + mean_radiant_temperature) / 2.0 + 273.15;
    4.0 * human.emissivity
        * human.stefan_boltzmann
        * human.effective_radiation_area
        * mean_k.powi(3)
}

/// Converged clothing-surface state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClothingSurface {
    /// Clothing surface temperature tcl (°C)
    pub temperature: f64,
    /// Convective coefficient h_c (W/(m²·K))
    pub convective: f64,
    /// Radiative coefficient h_r at the converged tcl (W/(m²·K))
    pub radiative: f64,
    /// Iterations used
    pub iterations: usize,
}

/// Clothing-surface temperature by relaxed fixed-point iteration
///
/// Heat flowing from the skin through the clothing equals the heat leaving
/// the clothing surface by convection and radiation:
///
/// tcl = tsk − R·[h_c·(tcl − Ta) + h_r(tcl)·(tcl − Tmrt)],  R = I_cl·f_cl
///
/// Starts at tcl₀ = Ta. Each update moves towards the balance by
/// (balance − tcl) / (1 + R·(h_c + h_r)), a Newton step with h_r frozen, which
/// stays contractive however strong the wind. Stops when successive
/// estimates agree within [`TEMPERATURE_TOLERANCE`].
///
/// # Errors
/// [`Error::NonConvergence`] after [`MAX_ITERATIONS`] updates.
pub fn clothing_surface_temperature(
    air_temperature: f64,
    mean_radiant_temperature: f64,
    wind_speed: f64,
    human: &HumanModel,
) -> Result<ClothingSurface> {
    let tsk = human.skin_temperature();
    let resistance = human.clothing_resistance() * human.clothing_area_factor();
    let hc = convective_coefficient(air_temperature, wind_speed, human);

    let mut tcl = air_temperature;
    for iteration in 1..=MAX_ITERATIONS {
        let hr = radiative_coefficient(tcl, mean_radiant_temperature, human);
        let balance = tsk
            - resistance
                * (hc * (tcl - air_temperature) + hr * (tcl - mean_radiant_temperature));
        let next = tcl + (balance - tcl) / (1.0 + resistance * (hc + hr));
        if !next.is_finite() {
            break;
        }
        if (next - tcl).abs() < TEMPERATURE_TOLERANCE {
            debug!(iterations = iteration, tcl = next, "clothing surface converged");
            return Ok(ClothingSurface {
                temperature: next,
                convective: hc,
                radiative: radiative_coefficient(next, mean_radiant_temperature, human),
                iterations: iteration,
            });
        }
        tcl = next;
    }
    Err(Error::non_convergence("clothing surface temperature", MAX_ITERATIONS))
}

/// Split of a global short-wave irradiance by cloud cover
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NebulositySplit {
    /// Clearness index K
    pub clearness: f64,
    /// Diffuse fraction of the global irradiance
    pub diffuse_fraction: f64,
    /// Direct normal irradiance Idn (W/m²)
    pub direct_normal: f64,
    /// Diffuse horizontal irradiance (W/m²)
    pub diffuse: f64,
}

/// Split global horizontal irradiance into beam and diffuse parts
///
/// K = 0.803 − 0.458·(N/8)² − 0.34·(N/8)
/// DIFF = 0.98 if K < 0.2 else 0.962 + 0.779·K − 4.375·K² + 2.716·K³
/// Idn = (1 − DIFF)·SR↑ / sin(h_sun)
///
/// # Arguments
/// * `global` - Global short-wave irradiance on a horizontal plane (W/m²)
/// * `cloud_cover` - N (octa, clamped to 0-8)
/// * `solar_altitude` - h_sun
pub fn nebulosity_split(global: f64, cloud_cover: f64, solar_altitude: Degrees) -> NebulositySplit {
    let n = cloud_cover.clamp(0.0, 8.0) / 8.0;
    let clearness = 0.803 - 0.458 * n * n - 0.34 * n;
    let diffuse_fraction = if clearness < 0.2 {
        0.98
    } else {
        0.962 + 0.779 * clearness - 4.375 * clearness.powi(2) + 2.716 * clearness.powi(3)
    }
    .clamp(0.0, 1.0);
    let sin_h = solar_altitude.to_radians().sin();
    let direct_normal = if sin_h > 0.0 {
        (1.0 - diffuse_fraction) * global / sin_h
    } else {
        0.0
    };
    NebulositySplit {
        clearness,
        diffuse_fraction,
        direct_normal,
        diffuse: diffuse_fraction * global,
    }
}
