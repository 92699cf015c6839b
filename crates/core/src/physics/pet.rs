//! Physiologically Equivalent Temperature (Munich Energy-balance Model for Individuals)
//!
//! PET is the air temperature of a reference indoor room (Tmrt = Ta,
//! v = 0.1 m/s, vapour pressure 12 hPa) in which the heat budget of the
//! subject is balanced with the same core and skin temperatures as in the
//! real outdoor environment.
//!
//! Two sequential phases:
//! 1. **Real environment.** For each thermoregulatory regime (candidate core
//!    temperature formula), search the clothing temperature that balances
//!    the body heat budget, then accept the first regime whose core and skin
//!    temperatures and skin blood flow are physically admissible.
//! 2. **Reference environment.** With skin and clothing temperatures, sweat
//!    rate and skin wettedness frozen from phase 1, search the air
//!    temperature that balances the budget in the reference room.
//!
//! Both searches march with step 1 °C and refine to 0.1, 0.01 and 0.001 °C
//! each time the energy balance changes sign.
//!
//! # Scientific References
//! - Höppe, P. (1999). "The physiological equivalent temperature - a
//!   universal index for the biometeorological assessment of the thermal
//!   environment". Int. J. Biometeorol., 43, 71-75
//! - VDI 3787 Part 2 (2008). "Methods for the human biometeorological
//!   evaluation of climate and air quality for urban and regional planning"

use crate::core_types::constants::{PetSubject, Sex, STANDARD_PRESSURE_HPA, STEFAN_BOLTZMANN};
use crate::error::{Error, Result};
use std::f64::consts::PI;
use tracing::debug;

/// Blood density (kg/L)
const BLOOD_DENSITY: f64 = 1.06;
/// Specific heat of blood (J/(kg·K))
const BLOOD_HEAT: f64 = 3640.0;
/// Skin emissivity
const SKIN_EMISSIVITY: f64 = 0.99;
/// Clothing emissivity
const CLOTHING_EMISSIVITY: f64 = 0.95;
/// Latent heat of evaporation (J/kg)
const LATENT_HEAT: f64 = 2.42e6;
/// Specific heat of air (J/(kg·K))
const AIR_HEAT: f64 = 1010.0;
/// Skin resistance to vapour diffusion (s/m scaled)
const SKIN_DIFFUSION_RESISTANCE: f64 = 0.79e7;
/// Reference room wind speed (m/s)
const REFERENCE_WIND: f64 = 0.1;
/// Reference room vapour pressure (hPa)
const REFERENCE_VAPOUR: f64 = 12.0;
/// Refinement steps of the marching searches (°C)
const STEPS: [f64; 4] = [1.0, 0.1, 0.01, 0.001];
/// Iteration bound of one marching search
const MAX_MARCH: usize = 600;

/// Regimes tried in order; the first admissible one wins
const REGIMES: [usize; 7] = [1, 2, 3, 4, 5, 6, 7];

#[inline]
fn kelvin4(t: f64) -> f64 {
    (t + 273.2).powi(4)
}

/// Magnus vapour pressure over water (hPa)
#[inline]
fn magnus(t: f64) -> f64 {
    6.11 * 10f64.powf(7.45 * t / (235.0 + t))
}

/// Result of a PET evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PetResult {
    /// Physiologically equivalent temperature (°C)
    pub pet: f64,
    /// Core temperature in the real environment (°C)
    pub core_temperature: f64,
    /// Skin temperature in the real environment (°C)
    pub skin_temperature: f64,
    /// Clothing temperature in the real environment (°C)
    pub clothing_temperature: f64,
    /// Regime index (1-7) selected in phase 1
    pub regime: usize,
}

/// Anthropometry and clothing cylinder of the subject
struct Body {
    adu: f64,
    metabolism: f64,
    respiration_volume: f64,
    facl: f64,
    rcl: f64,
    fcl: f64,
    acl: f64,
    htcl: f64,
    feff: f64,
    sex: Sex,
}

impl Body {
    fn new(subject: &PetSubject) -> Self {
        let adu = subject.dubois_area();
        let metabolism = subject.metabolic_heat();
        let icl = subject.clothing;
        let height = subject.height;

        let facl = ((-2.36 + 173.51 * icl - 100.76 * icl.powi(2) + 19.28 * icl.powi(3)) / 100.0)
            .min(1.0);
        let rcl = icl / 6.45 / facl;
        // Fraction of the body height covered by the clothing cylinder
        let y = if icl <= 0.3 {
            0.1
        } else if icl <= 0.6 {
            0.5
        } else if icl < 2.0 {
            (height - 0.2) / height
        } else {
            1.0
        };
        let fcl = 1.0 + 0.15 * icl;
        let r2 = adu * (fcl - 1.0 + facl) / (2.0 * PI * height * y);
        let r1 = facl * adu / (2.0 * PI * height * y);
        let acl = adu * facl + adu * (fcl - 1.0);
        let htcl = 2.0 * PI * height * y * (r2 - r1) / (rcl * (r2 / r1).ln() * acl);

        Self {
            adu,
            metabolism,
            respiration_volume: 1.44e-6 * metabolism,
            facl,
            rcl,
            fcl,
            acl,
            htcl,
            feff: subject.posture.effective_radiation_area(),
            sex: subject.sex,
        }
    }

    /// Respiratory heat exchange (W) in air at `ta` with vapour pressure `vpa`
    fn respiration(&self, ta: f64, vpa: f64) -> f64 {
        let exhaled = 0.47 * ta + 21.0;
        let sensible = AIR_HEAT * (ta - exhaled) * self.respiration_volume;
        let latent = 0.623 * LATENT_HEAT / STANDARD_PRESSURE_HPA
            * (vpa - magnus(exhaled))
            * self.respiration_volume;
        sensible + latent
    }

    /// Convective coefficient (W/(m²·K))
    fn convection(wind: f64) -> f64 {
        2.67 + 6.5 * wind.powf(0.67)
    }
}

/// Real environment seen by phase 1
struct Environment {
    ta: f64,
    tmrt: f64,
    vpa: f64,
    hc: f64,
    respiration: f64,
}

/// Body state for one regime at a trial clothing temperature
#[derive(Debug, Clone, Copy)]
struct RegimeState {
    tsk: f64,
    tcore: f64,
    esw: f64,
    wetsk: f64,
    vpts: f64,
    vb: f64,
    balance: f64,
    c8: f64,
    c10: f64,
}

/// Candidate core temperatures of the seven regimes, `None` when the
/// quadratic discriminant of a regime is negative
fn core_candidate(regime: usize, body: &Body, env: &Environment, tsk: f64) -> (Option<f64>, f64, f64) {
    let adu = body.adu;
    let c0 = body.metabolism + env.respiration;
    let c1 = adu * BLOOD_DENSITY * BLOOD_HEAT;
    let c2 = 18.0 - 0.5 * tsk;
    let c3 = 5.28 * adu * c2;
    let c4 = 0.0208 * c1;
    let c5 = 0.76075 * c1;
    let c6 = c3 - c5 - tsk * c4;
    let c7 = -c0 * c2 - tsk * c3 + tsk * c5;
    let c8 = c6 * c6 - 4.0 * c4 * c7;
    let c9 = 5.28 * adu - c5 - c4 * tsk;
    let c10 = c9 * c9 - 4.0 * c4 * (c5 * tsk - c0 - 5.28 * adu * tsk);

    let tcore = match regime {
        1 if c10 >= 0.0 => Some((-c9 + c10.sqrt()) / (2.0 * c4)),
        6 if c10 >= 0.0 => Some((-c9 - c10.sqrt()) / (2.0 * c4)),
        2 if c8 >= 0.0 => Some((-c6 + c8.sqrt()) / (2.0 * c4)),
        5 if c8 >= 0.0 => Some((-c6 - c8.sqrt()) / (2.0 * c4)),
        3 => Some(c0 / (5.28 * adu + (c1 * 6.3 / 3600.0) / (1.0 + 0.5 * (34.0 - tsk))) + tsk),
        4 => Some(c0 / (5.28 * adu + c1 / 40.0) + tsk),
        7 => Some(c0 / (5.28 * adu + c1 * 6.3 / 3600.0) + tsk),
        _ => None,
    };
    (tcore, c8, c10)
}

fn regime_state(regime: usize, body: &Body, env: &Environment, tcl: f64) -> Option<RegimeState> {
    let adu = body.adu;
    let sigma = STEFAN_BOLTZMANN;

    let clothing_radiation =
        CLOTHING_EMISSIVITY * sigma * (kelvin4(tcl) - kelvin4(env.tmrt)) * body.feff;
    let mut tsk = (env.hc * (tcl - env.ta) + clothing_radiation) / body.htcl + tcl;
    if tsk == 36.0 {
        tsk = 36.01;
    }

    let aeff = adu * body.feff;
    let bare_radiation =
        aeff * (1.0 - body.facl) * SKIN_EMISSIVITY * sigma * (kelvin4(env.tmrt) - kelvin4(tsk));
    let clothed_radiation =
        body.feff * body.acl * CLOTHING_EMISSIVITY * sigma * (kelvin4(env.tmrt) - kelvin4(tcl));
    let convection = env.hc * (env.ta - tsk) * adu * (1.0 - body.facl)
        + env.hc * (env.ta - tcl) * body.acl;

    let (tcore, c8, c10) = core_candidate(regime, body, env, tsk);
    let tcore = tcore?;

    let tbody = 0.1 * tsk + 0.9 * tcore;
    let mut sweat = 304.94 * (tbody - 36.6) * adu / 3_600_000.0;
    if tbody <= 36.6 {
        sweat = 0.0;
    }
    if body.sex == Sex::Female {
        sweat *= 0.7;
    }
    let vpts = magnus(tsk);
    let physiological = -sweat * LATENT_HEAT;
    let he = 0.633 * env.hc / (STANDARD_PRESSURE_HPA * AIR_HEAT);
    let fec = 1.0 / ((1.0 + 0.92 * env.hc * body.rcl) * body.fcl);
    let potential = he * (env.vpa - vpts) * adu * LATENT_HEAT * fec;
    let wetsk = (physiological / potential).min(1.0);
    let esw = if physiological - potential <= 0.0 {
        potential
    } else {
        physiological
    }
    .min(0.0);
    let diffusion =
        LATENT_HEAT / SKIN_DIFFUSION_RESISTANCE * adu * (1.0 - wetsk) * (env.vpa - vpts);

    let vasoconstriction = (34.0 - tsk).max(0.0);
    let vasodilation = (tcore - 36.6).max(0.0);
    let vb = (6.3 + 75.0 * vasodilation) / (1.0 + 0.5 * vasoconstriction);

    let balance = body.metabolism
        + diffusion
        + env.respiration
        + esw
        + convection
        + bare_radiation
        + clothed_radiation;

    Some(RegimeState {
        tsk,
        tcore,
        esw,
        wetsk,
        vpts,
        vb,
        balance,
        c8,
        c10,
    })
}

fn admissible(regime: usize, s: &RegimeState) -> bool {
    let shape = match regime {
        1 | 6 => s.c10 >= 0.0 && s.tcore >= 36.6 && s.tsk > 33.85,
        2 | 5 => s.c8 >= 0.0 && s.tcore >= 36.6 && s.tsk <= 34.05,
        3 => s.tcore < 36.6 && s.tsk <= 34.0,
        7 => s.tcore < 36.6 && s.tsk > 34.0,
        _ => true,
    };
    let blood_flow = if regime == 4 { s.vb >= 89.0 } else { s.vb < 91.0 };
    shape && blood_flow
}

/// March `x` in the direction that reduces the balance, refining the step
/// each time the balance changes sign; stops after the last refinement.
///
/// `descend` is the sign applied to the step when the balance is positive.
/// Returns `Ok(None)` when `balance` cannot be evaluated.
fn march<F>(start: f64, descend: f64, solver: &'static str, mut balance: F) -> Result<Option<f64>>
where
    F: FnMut(f64) -> Option<f64>,
{
    let mut x = start;
    let mut stage = 0;
    let mut previous: Option<f64> = None;
    for _ in 0..MAX_MARCH {
        let Some(e) = balance(x) else {
            return Ok(None);
        };
        if !e.is_finite() {
            break;
        }
        if let Some(p) = previous {
            if (e > 0.0) != (p > 0.0) {
                stage += 1;
                if stage == STEPS.len() {
                    return Ok(Some(x));
                }
            }
        }
        previous = Some(e);
        let step = STEPS[stage];
        x += if e > 0.0 { descend * step } else { -descend * step };
    }
    Err(Error::non_convergence(solver, MAX_MARCH))
}

/// Physiologically Equivalent Temperature
///
/// # Arguments
/// * `ta` - Air temperature (°C)
/// * `rh` - Relative humidity (%)
/// * `wv` - Wind speed at 1.1 m (m/s)
/// * `tmrt` - Mean radiant temperature (°C)
/// * `subject` - Person whose heat budget is evaluated
///
/// # Errors
/// [`Error::NonConvergence`] when a search overflows or no regime is admissible.
pub fn pet_detailed(ta: f64, rh: f64, wv: f64, tmrt: f64, subject: &PetSubject) -> Result<PetResult> {
    let body = Body::new(subject);
    let vpa = rh / 100.0 * 6.105 * (17.27 * ta / (237.7 + ta)).exp();
    let env = Environment {
        ta,
        tmrt,
        vpa,
        hc: Body::convection(wv),
        respiration: body.respiration(ta, vpa),
    };

    // Phase 1: real environment
    let mut selected = None;
    for regime in REGIMES {
        let tsk0 = 34.0;
        let start = (ta + tmrt + tsk0) / 3.0;
        let Some(tcl) = march(start, 1.0, "PET clothing temperature", |tcl| {
            regime_state(regime, &body, &env, tcl).map(|s| s.balance)
        })?
        else {
            continue;
        };
        let Some(state) = regime_state(regime, &body, &env, tcl) else {
            continue;
        };
        if admissible(regime, &state) {
            debug!(regime, tcore = state.tcore, tsk = state.tsk, "PET regime selected");
            selected = Some((regime, tcl, state));
            break;
        }
    }
    let Some((regime, tcl, state)) = selected else {
        return Err(Error::non_convergence("PET regime selection", REGIMES.len()));
    };

    // Phase 2: reference room
    let hc = Body::convection(REFERENCE_WIND);
    let sigma = STEFAN_BOLTZMANN;
    let reference_balance = |tx: f64| {
        let bare = body.adu * body.feff * (1.0 - body.facl) * SKIN_EMISSIVITY * sigma
            * (kelvin4(tx) - kelvin4(state.tsk));
        let clothed =
            body.feff * body.acl * CLOTHING_EMISSIVITY * sigma * (kelvin4(tx) - kelvin4(tcl));
        let convection = hc * (tx - state.tsk) * body.adu * (1.0 - body.facl)
            + hc * (tx - tcl) * body.acl;
        let diffusion = LATENT_HEAT / SKIN_DIFFUSION_RESISTANCE
            * body.adu
            * (1.0 - state.wetsk)
            * (REFERENCE_VAPOUR - state.vpts);
        Some(
            body.metabolism
                + diffusion
                + body.respiration(tx, REFERENCE_VAPOUR)
                + state.esw
                + convection
                + bare
                + clothed,
        )
    };
    let pet = march(ta, -1.0, "PET reference temperature", reference_balance)?
        .ok_or_else(|| Error::non_convergence("PET reference temperature", 0))?;

    Ok(PetResult {
        pet,
        core_temperature: state.tcore,
        skin_temperature: state.tsk,
        clothing_temperature: tcl,
        regime,
    })
}

/// PET (°C) of a measurement
pub fn pet(ta: f64, rh: f64, wv: f64, tmrt: f64, subject: &PetSubject) -> Result<f64> {
    pet_detailed(ta, rh, wv, tmrt, subject).map(|r| r.pet)
}
