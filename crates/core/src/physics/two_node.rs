//! Gagge two-node model: Standard Effective Temperature and its misting variant
//!
//! The body is a core cylinder wrapped in a thin skin shell. Sixty one-minute
//! steps of transient thermoregulation (vasomotion, sweating, shivering) bring
//! the skin and core to a quasi steady state in the measured environment.
//! SET is then the air temperature of the standard environment (50 % RH,
//! still air, Tmrt = Ta, standardised clothing) giving the same skin heat
//! loss at the same skin temperature and wettedness.
//!
//! SETmist adds the evaporation of mist droplets deposited on the clothing
//! surface to the skin evaporative loss inside the transient loop, and
//! reports the unrounded solution.
//!
//! # Scientific References
//! - Gagge, A.P., Fobelets, A.P., Berglund, L.G. (1986). "A standard
//!   predictive index of human response to the thermal environment".
//!   ASHRAE Transactions, 92(2B), 709-731
//! - ASHRAE 55 (2020), Appendix D
//! - Farnham, C. et al. (2015). "Evaluation of cooling effects: outdoor
//!   water mist fan". Building Research & Information, 43(3), 334-345

use crate::core_types::constants::HumanModel;
use crate::error::{Error, Result};
use crate::physics::atmosphere::MAX_ITERATIONS;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Stefan-Boltzmann constant as used by the two-node literature
const SBC: f64 = 5.6697e-8;
/// Body mass of the reference subject (kg)
const BODY_WEIGHT: f64 = 70.0;
/// Sweat rate driver (g/(m²·h·K))
const C_SWEAT: f64 = 170.0;
/// Vasodilation driver (L/(m²·h·K))
const C_DILATION: f64 = 120.0;
/// Vasoconstriction driver (1/K)
const C_CONSTRICTION: f64 = 0.5;
/// Neutral skin blood flow (L/(m²·h))
const NEUTRAL_BLOOD_FLOW: f64 = 6.3;
/// Fraction of the DuBois area radiating, seated posture
const RADIATION_AREA_FRACTION: f64 = 0.7;
/// Simulated minutes of exposure
const EXPOSURE_MINUTES: usize = 60;
/// Tolerance of the clothing temperature loop (°C)
const TCL_TOLERANCE: f64 = 0.01;
/// Tolerance of the Newton loop on the effective temperature (°C)
const NEWTON_TOLERANCE: f64 = 0.01;
/// Finite-difference step of the Newton loop (°C)
const NEWTON_STEP: f64 = 1e-4;

/// Saturation vapour pressure (Torr)
#[inline]
fn saturation_pressure_torr(t: f64) -> f64 {
    (18.6686 - 4030.183 / (t + 235.0)).exp()
}

/// Misting parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MistingConfig {
    /// Effective area factor of the wetted clothing surface; `None` uses 1 + 0.15·clo
    pub effective_area_factor: Option<f64>,
    /// Fraction of the clothing surface wetted by mist
    pub mist_fraction: f64,
}

impl Default for MistingConfig {
    fn default() -> Self {
        Self {
            effective_area_factor: None,
            mist_fraction: 0.02,
        }
    }
}

impl MistingConfig {
    fn area_factor(&self, clo: f64) -> f64 {
        self.effective_area_factor.unwrap_or(1.0 + 0.15 * clo)
    }
}

/// Inputs of one two-node evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoNodeInputs {
    /// Dry-bulb air temperature (°C)
    pub tdb: f64,
    /// Mean radiant temperature (°C)
    pub tr: f64,
    /// Air speed (m/s)
    pub v: f64,
    /// Relative humidity (%)
    pub rh: f64,
    /// Metabolic rate (met)
    pub met: f64,
    /// Clothing insulation (clo)
    pub clo: f64,
    /// External work (met)
    pub wme: f64,
    /// Body surface area (m²)
    pub body_surface_area: f64,
    /// Atmospheric pressure (Pa)
    pub patm: f64,
}

impl TwoNodeInputs {
    /// Inputs for the reference subject in a measured environment
    pub fn outdoor(ta: f64, rh: f64, wv: f64, tmrt: f64, human: &HumanModel) -> Self {
        Self {
            tdb: ta,
            tr: tmrt,
            v: wv,
            rh,
            met: human.met(),
            clo: human.clothing,
            wme: human.mechanical_power / 58.2,
            body_surface_area: human.body_surface_area,
            patm: human.atmospheric_pressure,
        }
    }
}

/// Body state after the simulated exposure
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoNodeState {
    /// Mean skin temperature (°C)
    pub skin_temperature: f64,
    /// Core temperature (°C)
    pub core_temperature: f64,
    /// Clothing surface temperature (°C)
    pub clothing_temperature: f64,
    /// Skin wettedness (0-1)
    pub wettedness: f64,
    /// Total skin heat loss, sensible + evaporative (W/m²)
    pub skin_heat_loss: f64,
    /// Radiative coefficient at the end of the exposure (W/(m²·K))
    pub radiative: f64,
}

/// Run the transient two-node simulation
///
/// `misting` adds e_mist = f_a_eff·(1 − w)·p_mist·(P_s(tcl) − P_a)/R_ea to the
/// skin evaporative loss at every step.
///
/// # Errors
/// [`Error::NonConvergence`] when the clothing temperature loop exceeds its bound.
pub fn simulate(inputs: &TwoNodeInputs, misting: Option<&MistingConfig>) -> Result<TwoNodeState> {
    let TwoNodeInputs {
        tdb,
        tr,
        v,
        rh,
        met,
        clo,
        wme,
        body_surface_area: bsa,
        patm,
    } = *inputs;

    let vp = rh * saturation_pressure_torr(tdb) / 100.0;
    let air = v.max(0.1);
    let neutral_skin = 33.7;
    let neutral_core = 36.8;
    let mut alfa = 0.1;
    let neutral_body = alfa * neutral_skin + (1.0 - alfa) * neutral_core;

    let mut tsk = neutral_skin;
    let mut tcr = neutral_core;
    let mut blood_flow = NEUTRAL_BLOOD_FLOW;
    let mut e_sk = 0.1 * met;
    let mut q_sens = 0.0;
    let mut w = 0.0;
    let mut tcl = tdb;

    let pa = patm / 101_325.0;
    let r_clo = 0.155 * clo;
    let facl = 1.0 + 0.15 * clo;
    let lewis = 2.2 / pa;
    let rm = (met - wme) * 58.2;
    let mut m = met * 58.2;
    let i_cl = if clo > 0.0 { 0.45 } else { 1.0 };
    let w_max = if clo > 0.0 {
        0.59 * air.powf(-0.08)
    } else {
        0.38 * air.powf(-0.29)
    };

    let mut hcc = (3.0 * pa.powf(0.53)).max(8.600001 * (air * pa).powf(0.53));
    if met > 0.85 {
        hcc = hcc.max(5.66 * (met - 0.85).powf(0.39));
    }
    let mut hr = 4.7;
    let mut ht = hr + hcc;
    let mut ra = 1.0 / (facl * ht);
    let mut top = (hr * tr + hcc * tdb) / ht;

    let mist_area = misting.map(|cfg| (cfg.area_factor(clo), cfg.mist_fraction));

    for _ in 0..EXPOSURE_MINUTES {
        tcl = (ra * tsk + r_clo * top) / (ra + r_clo);
        let mut converged = false;
        for _ in 0..MAX_ITERATIONS {
            hr = 4.0 * 0.95 * SBC * ((tcl + tr) / 2.0 + 273.15).powi(3) * RADIATION_AREA_FRACTION;
            ht = hr + hcc;
            ra = 1.0 / (facl * ht);
            top = (hr * tr + hcc * tdb) / ht;
            let next = (ra * tsk + r_clo * top) / (ra + r_clo);
            let done = (next - tcl).abs() <= TCL_TOLERANCE;
            tcl = next;
            if done {
                converged = true;
                break;
            }
        }
        if !converged {
            return Err(Error::non_convergence("two-node clothing temperature", MAX_ITERATIONS));
        }

        q_sens = (tsk - top) / (ra + r_clo);
        let skin_core_flow = (tcr - tsk) * (5.28 + 1.163 * blood_flow);
        let q_res = 0.0023 * m * (44.0 - vp);
        let c_res = 0.0014 * m * (34.0 - tdb);
        let s_cr = m - skin_core_flow - q_res - c_res - wme;
        let s_sk = skin_core_flow - q_sens - e_sk;
        let tc_sk = 0.97 * alfa * BODY_WEIGHT;
        let tc_cr = 0.97 * (1.0 - alfa) * BODY_WEIGHT;
        tsk += s_sk * bsa / (tc_sk * 60.0);
        tcr += s_cr * bsa / (tc_cr * 60.0);
        let tb = alfa * tsk + (1.0 - alfa) * tcr;

        let skin_signal = tsk - neutral_skin;
        let warm_skin = skin_signal.max(0.0);
        let cold_skin = (-skin_signal).max(0.0);
        let core_signal = tcr - neutral_core;
        let warm_core = core_signal.max(0.0);
        let cold_core = (-core_signal).max(0.0);
        let warm_body = (tb - neutral_body).max(0.0);

        blood_flow = ((NEUTRAL_BLOOD_FLOW + C_DILATION * warm_core)
            / (1.0 + C_CONSTRICTION * cold_skin))
            .clamp(0.5, 90.0);
        let regulatory_sweat = (C_SWEAT * warm_body * (warm_skin / 10.7).exp()).min(500.0);
        let mut e_rsw = 0.68 * regulatory_sweat;

        let r_ea = 1.0 / (lewis * facl * hcc);
        let r_ecl = r_clo / (lewis * i_cl);
        let e_max = (saturation_pressure_torr(tsk) - vp) / (r_ea + r_ecl);
        let mut p_rsw = e_rsw / e_max;
        w = 0.06 + 0.94 * p_rsw;
        let mut e_diff = w * e_max - e_rsw;
        if w > w_max {
            w = w_max;
            p_rsw = w_max / 0.94;
            e_rsw = p_rsw * e_max;
            e_diff = 0.06 * (1.0 - p_rsw) * e_max;
        }
        if e_max < 0.0 {
            e_diff = 0.0;
            e_rsw = 0.0;
            w = w_max;
        }
        e_sk = e_rsw + e_diff;
        if let Some((area, fraction)) = mist_area {
            e_sk += area * (1.0 - w) * fraction * (saturation_pressure_torr(tcl) - vp) / r_ea;
        }

        m = rm + 19.4 * cold_skin * cold_core;
        alfa = 0.0417737 + 0.7451833 / (blood_flow + 0.585417);
    }

    Ok(TwoNodeState {
        skin_temperature: tsk,
        core_temperature: tcr,
        clothing_temperature: tcl,
        wettedness: w,
        skin_heat_loss: q_sens + e_sk,
        radiative: hr,
    })
}

/// Solve for the standard-environment temperature matching a body state
///
/// Secant-Newton on h_sk − HD·(tsk − T) − w·HE·(P_ssk − 0.5·P_s(T)) = 0,
/// stopping when the update falls to [`NEWTON_TOLERANCE`].
fn standard_temperature(inputs: &TwoNodeInputs, state: &TwoNodeState) -> Result<f64> {
    let TwoNodeInputs { met, wme, patm, .. } = *inputs;
    let pa = patm / 101_325.0;
    let lewis = 2.2 / pa;
    let tsk = state.skin_temperature;
    let q_sk = state.skin_heat_loss;
    let w = state.wettedness;
    let p_ssk = saturation_pressure_torr(tsk);

    let hrs = state.radiative;
    let mut hcs = 3.0 * pa.powf(0.53);
    if met > 0.85 {
        hcs = hcs.max(5.66 * (met - 0.85).powf(0.39));
    }
    let hcs = hcs.max(3.0);
    let hts = hcs + hrs;

    // Standard clothing depends on activity
    let r_clo_s = 1.52 / ((met - wme / 58.2) + 0.6944) - 0.1835;
    let r_cl_s = 0.155 * r_clo_s;
    let facl_s = 1.0 + 0.25 * r_clo_s;
    let fcl_s = 1.0 / (1.0 + 0.155 * facl_s * hts * r_clo_s);
    let ims = 0.45;
    let icl_s = ims * hcs / hts * (1.0 - fcl_s) / (hcs / hts - fcl_s * ims);
    let ras = 1.0 / (facl_s * hts);
    let reas = 1.0 / (lewis * facl_s * hcs);
    let recls = r_cl_s / (lewis * icl_s);
    let hds = 1.0 / (ras + r_cl_s);
    let hes = 1.0 / (reas + recls);

    let residual = |t: f64| q_sk - hds * (tsk - t) - w * hes * (p_ssk - 0.5 * saturation_pressure_torr(t));

    let mut old = ((tsk - q_sk / hds) * 100.0).round() / 100.0;
    for iteration in 1..=MAX_ITERATIONS {
        let e1 = residual(old);
        let e2 = residual(old + NEWTON_STEP);
        let next = old - NEWTON_STEP * e1 / (e2 - e1);
        if !next.is_finite() {
            break;
        }
        let dx = next - old;
        old = next;
        if dx.abs() <= NEWTON_TOLERANCE {
            debug!(iterations = iteration, set = next, "standard temperature converged");
            return Ok(next);
        }
    }
    Err(Error::non_convergence("standard effective temperature", MAX_ITERATIONS))
}

/// Standard Effective Temperature (°C), rounded to 0.1 °C
///
/// # Arguments
/// * `inputs` - Environment and subject
pub fn set_from_inputs(inputs: &TwoNodeInputs) -> Result<f64> {
    let state = simulate(inputs, None)?;
    let set = standard_temperature(inputs, &state)?;
    Ok((set * 10.0).round() / 10.0)
}

/// Standard Effective Temperature of the reference subject outdoors (°C)
pub fn set(ta: f64, rh: f64, wv: f64, tmrt: f64, human: &HumanModel) -> Result<f64> {
    set_from_inputs(&TwoNodeInputs::outdoor(ta, rh, wv, tmrt, human))
}

/// Standard Effective Temperature under misting (°C, unrounded)
pub fn set_mist(
    ta: f64,
    rh: f64,
    wv: f64,
    tmrt: f64,
    human: &HumanModel,
    misting: &MistingConfig,
) -> Result<f64> {
    let inputs = TwoNodeInputs::outdoor(ta, rh, wv, tmrt, human);
    let state = simulate(&inputs, Some(misting))?;
    standard_temperature(&inputs, &state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_set_reference_case() {
        let human = HumanModel::default();
        let value = set(30.0, 30.0, 0.25, 40.0, &human).unwrap();
        assert_abs_diff_eq!(value, 31.3, epsilon = 1e-3);
    }

    #[test]
    fn test_mist_cools() {
        let human = HumanModel::default();
        let dry = set_mist(
            30.0,
            30.0,
            0.25,
            40.0,
            &human,
            &MistingConfig {
                mist_fraction: 0.0,
                ..MistingConfig::default()
            },
        )
        .unwrap();
        let wet = set_mist(30.0, 30.0, 0.25, 40.0, &human, &MistingConfig::default()).unwrap();
        assert!(wet < dry);
    }

    #[test]
    fn test_warmer_radiation_raises_set() {
        let human = HumanModel::default();
        let shade = set(30.0, 30.0, 0.5, 30.0, &human).unwrap();
        let sun = set(30.0, 30.0, 0.5, 55.0, &human).unwrap();
        assert!(sun > shade);
    }
}
