//! Effective Temperature Universal
//!
//! ETU is the temperature of a reference environment (still air, Tmrt = Ta,
//! 50 % RH) producing the same skin heat loss as the actual environment. The
//! thermal load is decomposed into additive effective fields, each in W/m²:
//!
//! - NUATF: non-uniform air temperature around the body
//! - SERFL: long-wave radiant field in excess of the air temperature
//! - ERFS: absorbed short-wave radiation
//! - SEHF: evaporative heat field, the only term depending on ETU itself
//! - EVCF: change of convective and clothing conductance against the
//!   reference environment
//!
//! ETU = Ta + (NUATF + SERFL + ERFS + SEHF(ETU) + EVCF) / hu
//!
//! with hu = (h_co + h_ro)·F_cleo the overall conductance of the reference
//! environment. The equation is solved by Newton steps on a 0.1 °C probe.
//!
//! # Scientific References
//! - Watanabe, S., Nagano, K., Ishii, J., Horikoshi, T. (2014). "Evaluation
//!   of outdoor thermal comfort in sunlight, building shade, and pergola
//!   shade during summer in a humid subtropical region". Building and
//!   Environment, 82, 556-565
//! - Gagge, A.P., Nishi, Y. (1977). "Heat exchange between human skin
//!   surface and thermal environment". Handbook of Physiology, 69-92

use crate::core_types::constants::HumanModel;
use crate::error::{Error, Result};
use crate::physics::atmosphere::{
    clothing_surface_temperature, convective_coefficient, partial_vapour_pressure_kpa,
    radiative_coefficient, saturation_vapour_pressure, MAX_ITERATIONS, TEMPERATURE_TOLERANCE,
};
use tracing::debug;

/// Lewis relation (K/kPa)
const LEWIS: f64 = 16.5;
/// Probe step used to estimate the slope of the fixed-point map (°C)
const PROBE_STEP: f64 = 0.1;
/// Relative humidity of the reference environment (%)
const REFERENCE_HUMIDITY: f64 = 50.0;

/// Optional refinements of the actual environment
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EtuInputs {
    /// Long-wave-only mean radiant temperature (°C); the short-wave part of
    /// Tmrt is the excess over it. `None` treats all of Tmrt as long-wave.
    pub longwave_radiant_temperature: Option<f64>,
    /// Air temperature next to the body when it differs from the station (°C)
    pub local_air_temperature: Option<f64>,
}

/// ETU and its field decomposition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EtuResult {
    /// Effective temperature universal (°C)
    pub etu: f64,
    /// NUATF / hu (K)
    pub dif_nuatf: f64,
    /// SERFL / hu (K)
    pub dif_serfl: f64,
    /// ERFS / hu (K)
    pub dif_erfs: f64,
    /// SEHF / hu at the solution (K)
    pub dif_sehf: f64,
    /// EVCF / hu (K)
    pub dif_evcf: f64,
    /// Newton iterations used
    pub iterations: usize,
}

/// Clothing conductance factor fcl / (1 + fcl·Icl·h)
#[inline]
fn clothing_factor(human: &HumanModel, conductance: f64) -> f64 {
    let fcl = human.clothing_area_factor();
    fcl / (1.0 + fcl * human.clothing_resistance() * conductance)
}

/// Vapour permeation efficiency of the clothing
#[inline]
fn permeation_factor(human: &HumanModel, convective: f64) -> f64 {
    1.0 / (1.0 + 0.143 * convective * human.clothing)
}

/// Effective Temperature Universal with its diagnostic fields
///
/// # Errors
/// [`Error::NonConvergence`] when the clothing temperature or the ETU
/// iteration exceeds its bound.
pub fn etu_detailed(
    ta: f64,
    rh: f64,
    wv: f64,
    tmrt: f64,
    extra: &EtuInputs,
    human: &HumanModel,
) -> Result<EtuResult> {
    let tsk = human.skin_temperature();
    let surface = clothing_surface_temperature(ta, tmrt, wv, human)?;
    let (hc, hr) = (surface.convective, surface.radiative);
    let f_cl = clothing_factor(human, hc + hr);

    // Reference environment: still air, Tmrt = Ta
    let hco = convective_coefficient(ta, 0.0, human);
    let hro = radiative_coefficient(surface.temperature, ta, human);
    let f_cleo = clothing_factor(human, hco + hro);
    let hu = (hco + hro) * f_cleo;

    let t_long = extra.longwave_radiant_temperature.unwrap_or(tmrt);
    let nuatf = extra
        .local_air_temperature
        .map_or(0.0, |local| f_cl * hc * (local - ta));
    let serfl = f_cl * hr * (t_long - ta);
    let erfs = f_cl * hr * (tmrt - t_long);
    let evcf = (hu - f_cl * (hc + hr)) * (tsk - ta);

    // Skin wettedness from the required evaporation in the actual environment
    let p_sk = saturation_vapour_pressure(tsk) / 10.0;
    let p_a = partial_vapour_pressure_kpa(ta, rh);
    let m = human.metabolic_rate;
    let dry = f_cl * (hc * (tsk - ta) + hr * (tsk - tmrt));
    let respiration = 0.0014 * m * (34.0 - ta) + 0.0173 * m * (5.87 - p_a);
    let e_max = LEWIS * hc * permeation_factor(human, hc) * (p_sk - p_a);
    let e_req = m - human.mechanical_power - dry - respiration;
    let wettedness = if e_max > 0.0 {
        (e_req / e_max).clamp(0.06, 1.0)
    } else {
        0.06
    };
    let e_actual = wettedness * e_max;

    let reference_evaporation = LEWIS * hco * permeation_factor(human, hco);
    let sehf = |t: f64| {
        let p_ref = partial_vapour_pressure_kpa(t, REFERENCE_HUMIDITY);
        wettedness * reference_evaporation * (p_sk - p_ref) - e_actual
    };
    let fixed = nuatf + serfl + erfs + evcf;
    let map = |t: f64| ta + (fixed + sehf(t)) / hu;

    let mut t = map(ta);
    for iteration in 1..=MAX_ITERATIONS {
        let residual = map(t) - t;
        if !residual.is_finite() {
            break;
        }
        if residual.abs() < TEMPERATURE_TOLERANCE {
            debug!(iterations = iteration, etu = t, "ETU converged");
            return Ok(EtuResult {
                etu: t,
                dif_nuatf: nuatf / hu,
                dif_serfl: serfl / hu,
                dif_erfs: erfs / hu,
                dif_sehf: sehf(t) / hu,
                dif_evcf: evcf / hu,
                iterations: iteration,
            });
        }
        let slope = (map(t + PROBE_STEP) - map(t)) / PROBE_STEP;
        t += residual / (1.0 - slope);
    }
    Err(Error::non_convergence("ETU", MAX_ITERATIONS))
}

/// Effective Temperature Universal (°C)
pub fn etu(ta: f64, rh: f64, wv: f64, tmrt: f64, human: &HumanModel) -> Result<f64> {
    etu_detailed(ta, rh, wv, tmrt, &EtuInputs::default(), human).map(|r| r.etu)
}
