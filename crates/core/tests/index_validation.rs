//! Reference cases and monotonicity of the thermal indices
//!
//! # References
//! - Höppe (1999), VDI 3787 worked example for PET
//! - ASHRAE 55 (2020) Appendix D for SET
//! - Bröde et al. (2012) for the UTCI polynomial
//! - Thorsson et al. (2007) for the globe thermometer

mod common;

use approx::assert_abs_diff_eq;
use urban_comfort_core::physics::{
    pet_detailed, set_mist, GlobeConfig, MistingConfig, PerceptionScale, WindProfile,
};
use urban_comfort_core::{etu, pet, pmv, set, tmrt_from_globe, utci, HumanModel, PetSubject};

#[test]
fn test_pet_reference_case() {
    let r = pet_detailed(39.53, 10.83, 0.99, 42.42, &PetSubject::default()).unwrap();
    assert_abs_diff_eq!(r.pet, 41.35, epsilon = 1.22);
    assert_eq!(
        PerceptionScale::Pet.classify(r.pet).map(|b| b.label),
        Some(if r.pet >= 41.0 { "Very hot" } else { "Hot" })
    );
}

#[test]
fn test_set_reference_case() {
    let value = set(30.0, 30.0, 0.25, 40.0, &HumanModel::default()).unwrap();
    assert_abs_diff_eq!(value, 31.3, epsilon = 1e-3);
}

#[test]
fn test_set_mist_reference_case() {
    let value = set_mist(
        30.0,
        30.0,
        0.25,
        40.0,
        &HumanModel::default(),
        &MistingConfig::default(),
    )
    .unwrap();
    assert_abs_diff_eq!(value, 30.772, epsilon = 1e-3);
}

#[test]
fn test_utci_reference_case() {
    let value = utci(20.0, 50.0, 2.0, 25.0, &WindProfile::default()).unwrap();
    assert_abs_diff_eq!(value, 17.9, epsilon = 0.03);
    assert_eq!(
        PerceptionScale::Utci.classify(value).map(|b| b.label),
        Some("No thermal stress")
    );
}

#[test]
fn test_globe_reference_case() {
    let globe = GlobeConfig {
        diameter: 0.75,
        emissivity: 0.95,
        ..GlobeConfig::default()
    };
    let tmrt = tmrt_from_globe(39.53, 42.04, 0.99, &globe).unwrap();
    assert_abs_diff_eq!(tmrt, 42.42, epsilon = 2.18);
}

#[test]
fn test_wind_lowers_pmv() {
    let human = HumanModel::default();
    for (ta, tmrt) in [(18.0, 22.0), (22.0, 30.0), (28.0, 38.0)] {
        let mut previous = f64::INFINITY;
        for wv in [0.2, 0.5, 1.0, 2.0, 4.0] {
            let value = pmv(ta, 50.0, wv, tmrt, &human).unwrap();
            assert!(value < previous, "PMV({ta}, {wv}, {tmrt}) = {value} >= {previous}");
            previous = value;
        }
    }
}

#[test]
fn test_etu_in_strong_wind() {
    let human = HumanModel::default();
    let mut previous = f64::INFINITY;
    for wv in [4.0, 5.0, 6.0, 6.5, 7.0, 8.0, 10.0, 17.0] {
        let value = etu(20.0, 50.0, wv, 25.0, &human).unwrap();
        assert!(value < previous, "ETU {value} at {wv} m/s");
        previous = value;
    }
    assert_abs_diff_eq!(etu(20.0, 50.0, 4.0, 25.0, &human).unwrap(), 8.93, epsilon = 0.01);
    assert_abs_diff_eq!(etu(20.0, 50.0, 6.0, 25.0, &human).unwrap(), 7.27, epsilon = 0.01);
    assert!(etu(-30.0, 50.0, 10.0, -30.0, &human).unwrap().is_finite());
}

#[test]
fn test_radiation_raises_utci() {
    let profile = WindProfile::default();
    for ta in [5.0, 20.0, 30.0] {
        let mut previous = f64::NEG_INFINITY;
        for delta in [-10.0, 0.0, 20.0, 40.0] {
            let value = utci(ta, 50.0, 1.5, ta + delta, &profile).unwrap();
            assert!(value > previous, "UTCI not increasing at Ta = {ta}, ΔTmrt = {delta}");
            previous = value;
        }
    }
}

#[test]
fn test_set_and_pet_stay_near_air_temperature() {
    let human = HumanModel::default();
    let subject = PetSubject::default();
    for (ta, rh, wv, tmrt) in [
        (21.0, 50.0, 0.1, 21.0),
        (20.0, 50.0, 1.0, 20.0),
        (20.0, 50.0, 1.0, 50.0),
        (39.53, 10.83, 0.99, 42.42),
    ] {
        let s = set(ta, rh, wv, tmrt, &human).unwrap();
        let p = pet(ta, rh, wv, tmrt, &subject).unwrap();
        assert!((s - ta).abs() <= 50.0, "SET {s} far from Ta {ta}");
        assert!((p - ta).abs() <= 50.0, "PET {p} far from Ta {ta}");
    }
}

#[test]
fn test_unknown_inputs_are_undefined() {
    assert!(utci(f64::NAN, 50.0, 2.0, 25.0, &WindProfile::default()).is_none());
    assert!(tmrt_from_globe(20.0, f64::NAN, 1.0, &GlobeConfig::default()).is_none());
}
