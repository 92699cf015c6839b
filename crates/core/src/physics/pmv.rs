//! Predicted Mean Vote, Predicted Percentage Dissatisfied and Perceived Temperature
//!
//! Fanger's steady-state heat balance as standardised by ISO 7730, followed by
//! the seasonal linear recast of PMV into temperature units.
//!
//! # Scientific References
//! - ISO 7730 (2005). "Ergonomics of the thermal environment - Analytical
//!   determination and interpretation of thermal comfort using calculation of
//!   the PMV and PPD indices and local thermal comfort criteria"
//! - Coccolo, S. et al. (2016). "Outdoor human comfort and thermal stress:
//!   A comprehensive review on models and standards". Urban Climate, 18, 33-57

use crate::core_types::constants::HumanModel;
use crate::error::{Error, Result};
use crate::physics::atmosphere::MAX_ITERATIONS;

/// Convergence threshold of the clothing temperature loop (in units of K/100)
const PMV_EPSILON: f64 = 0.00015;

/// Relative air velocity seen by an active subject (m/s)
///
/// v_r = Wv + 0.3·(met − 1) for met > 1, else Wv
#[inline]
pub fn relative_air_velocity(wind_speed: f64, met: f64) -> f64 {
    if met > 1.0 {
        wind_speed + 0.3 * (met - 1.0)
    } else {
        wind_speed
    }
}

/// Fanger Predicted Mean Vote (ISO 7730)
///
/// # Arguments
/// * `ta` - Air temperature (°C)
/// * `tr` - Mean radiant temperature (°C)
/// * `vr` - Relative air velocity (m/s)
/// * `rh` - Relative humidity (%)
/// * `met` - Metabolic rate (met)
/// * `clo` - Clothing insulation (clo)
/// * `wme` - External work (met)
///
/// # Returns
/// PMV clamped to [−3, +3]
///
/// # Errors
/// [`Error::NonConvergence`] when the clothing temperature loop exceeds its bound.
pub fn pmv_iso(ta: f64, tr: f64, vr: f64, rh: f64, met: f64, clo: f64, wme: f64) -> Result<f64> {
    // Water vapour pressure (Pa)
    let pa = rh * 10.0 * (16.6536 - 4030.183 / (ta + 235.0)).exp();

    let icl = 0.155 * clo;
    let m = met * 58.15;
    let w = wme * 58.15;
    let mw = m - w;
    let fcl = if icl <= 0.078 {
        1.0 + 1.29 * icl
    } else {
        1.05 + 0.645 * icl
    };

    let hcf = 12.1 * vr.max(0.0).sqrt();
    let taa = ta + 273.0;
    let tra = tr + 273.0;
    let tcla = taa + (35.5 - ta) / (3.5 * icl + 0.1);

    let p1 = icl * fcl;
    let p2 = p1 * 3.96;
    let p3 = p1 * 100.0;
    let p4 = p1 * taa;
    let p5 = 308.7 - 0.028 * mw + p2 * (tra / 100.0).powi(4);

    let mut xn = tcla / 100.0;
    let mut xf = tcla / 50.0;
    let mut hc = hcf;
    let mut n = 0;
    while (xn - xf).abs() > PMV_EPSILON {
        xf = (xf + xn) / 2.0;
        let hcn = 2.38 * (100.0 * xf - taa).abs().powf(0.25);
        hc = hcf.max(hcn);
        xn = (p5 + p4 * hc - p2 * xf.powi(4)) / (100.0 + p3 * hc);
        n += 1;
        if n > MAX_ITERATIONS || !xn.is_finite() {
            return Err(Error::non_convergence("PMV clothing temperature", n));
        }
    }
    let tcl = 100.0 * xn - 273.0;

    // Heat loss components (W/m²)
    let skin_diffusion = 3.05e-3 * (5733.0 - 6.99 * mw - pa);
    let sweating = if mw > 58.15 { 0.42 * (mw - 58.15) } else { 0.0 };
    let latent_respiration = 1.7e-5 * m * (5867.0 - pa);
    let dry_respiration = 0.0014 * m * (34.0 - ta);
    let radiation = 3.96 * fcl * (xn.powi(4) - (tra / 100.0).powi(4));
    let convection = fcl * hc * (tcl - ta);

    let ts = 0.303 * (-0.036 * m).exp() + 0.028;
    let pmv = ts
        * (mw
            - skin_diffusion
            - sweating
            - latent_respiration
            - dry_respiration
            - radiation
            - convection);
    Ok(pmv.clamp(-3.0, 3.0))
}

/// PMV of the reference subject outdoors
///
/// The metabolic rate is converted to met with the ISO 7730 factor and the
/// measured wind is turned into a relative air velocity.
pub fn pmv(ta: f64, rh: f64, wv: f64, tmrt: f64, human: &HumanModel) -> Result<f64> {
    let met = human.met_iso();
    let vr = relative_air_velocity(wv, met);
    pmv_iso(
        ta,
        tmrt,
        vr,
        rh,
        met,
        human.clothing,
        human.mechanical_power / 58.15,
    )
}

/// Predicted Percentage Dissatisfied (%)
///
/// PPD = 100 − 95·exp(−0.03353·PMV⁴ − 0.2179·PMV²)
#[inline]
pub fn ppd(pmv: f64) -> f64 {
    100.0 - 95.0 * (-0.03353 * pmv.powi(4) - 0.2179 * pmv.powi(2)).exp()
}

/// Perceived Temperature from PMV (°C)
///
/// Piecewise linear law with three seasonal branches:
/// - PMV < 0 and clo = 1.75: 5.805 + 12.6784·PMV
/// - PMV = 0 and 0.5 < clo < 1.75: 21.258 − 9.558·clo
/// - PMV > 0 and clo = 0.5: 16.826 + 6.183·PMV
///
/// Every other combination is undefined.
pub fn perceived_temperature(pmv: f64, clo: f64) -> Option<f64> {
    const TOL: f64 = 1e-9;
    if !pmv.is_finite() || !clo.is_finite() {
        return None;
    }
    if pmv < 0.0 && (clo - 1.75).abs() < TOL {
        Some(5.805 + 12.6784 * pmv)
    } else if pmv == 0.0 && clo > 0.5 && clo < 1.75 {
        Some(21.258 - 9.558 * clo)
    } else if pmv > 0.0 && (clo - 0.5).abs() < TOL {
        Some(16.826 + 6.183 * pmv)
    } else {
        None
    }
}
