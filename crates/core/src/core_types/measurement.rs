//! Pedestrian-level measurement records
//!
//! A row of the input table is a map from column name to scalar. The column
//! names are configured once through [`FieldNames`]; [`Measurement::from_row`]
//! then lifts a row into a typed record where every scalar is optional.
//! NaN readings are treated the same as absent ones.
//!
//! Radiometer naming follows the usual net-radiometer convention: the `up`
//! channel is the sensor facing the sky (incoming flux from the upper
//! hemisphere), the `down` channel faces the ground.

use crate::error::{Error, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// One row of the input table
pub type Row = FxHashMap<String, f64>;

/// Column names of the measurement table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNames {
    /// Air temperature Ta (°C)
    pub air_temperature: String,
    /// Relative humidity RH (%)
    pub relative_humidity: String,
    /// Wind speed at 1.1 m (m/s)
    pub wind_speed: String,
    /// Mean radiant temperature Tmrt (°C)
    pub mean_radiant_temperature: String,
    /// Cloud cover N (octa)
    pub cloud_cover: String,
    /// Ground albedo
    pub albedo: String,
    /// Short-wave irradiance from the sky (W/m²)
    pub shortwave_up: String,
    /// Short-wave irradiance from the ground (W/m²)
    pub shortwave_down: String,
    /// Long-wave irradiance from the sky (W/m²)
    pub longwave_up: String,
    /// Long-wave irradiance from the ground (W/m²)
    pub longwave_down: String,
    /// Globe temperature Tg (°C)
    pub globe_temperature: String,
    /// Lateral short-wave channels, in N, S, E, W order
    pub shortwave_lateral: Option<[String; 4]>,
    /// Lateral long-wave channels, in N, S, E, W order
    pub longwave_lateral: Option<[String; 4]>,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            air_temperature: "AirTC_Avg".to_string(),
            relative_humidity: "RH_Avg".to_string(),
            wind_speed: "WS_ms_Avg".to_string(),
            mean_radiant_temperature: "T_mrt".to_string(),
            cloud_cover: "N".to_string(),
            albedo: "Albedo_1_Avg".to_string(),
            shortwave_up: "SR01Up_1_Avg".to_string(),
            shortwave_down: "SR01Dn_1_Avg".to_string(),
            longwave_up: "IR01UpCo_1_Avg".to_string(),
            longwave_down: "IR01DnCo_1_Avg".to_string(),
            globe_temperature: "Tg".to_string(),
            shortwave_lateral: None,
            longwave_lateral: None,
        }
    }
}

/// Scalar field of a measurement row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    AirTemperature,
    RelativeHumidity,
    WindSpeed,
    MeanRadiantTemperature,
    CloudCover,
    Albedo,
    ShortwaveUp,
    ShortwaveDown,
    LongwaveUp,
    LongwaveDown,
    GlobeTemperature,
    ShortwaveLateral,
    LongwaveLateral,
}

impl FieldNames {
    /// Column names mapped to a field (lateral fields map to four columns)
    pub fn columns(&self, field: Field) -> Vec<&str> {
        let name = match field {
            Field::AirTemperature => &self.air_temperature,
            Field::RelativeHumidity => &self.relative_humidity,
            Field::WindSpeed => &self.wind_speed,
            Field::MeanRadiantTemperature => &self.mean_radiant_temperature,
            Field::CloudCover => &self.cloud_cover,
            Field::Albedo => &self.albedo,
            Field::ShortwaveUp => &self.shortwave_up,
            Field::ShortwaveDown => &self.shortwave_down,
            Field::LongwaveUp => &self.longwave_up,
            Field::LongwaveDown => &self.longwave_down,
            Field::GlobeTemperature => &self.globe_temperature,
            Field::ShortwaveLateral => return lateral_columns(self.shortwave_lateral.as_ref()),
            Field::LongwaveLateral => return lateral_columns(self.longwave_lateral.as_ref()),
        };
        vec![name.as_str()]
    }

    /// Check that every column behind `fields` is present in `available`
    ///
    /// Fails with [`Error::MissingField`] naming the first absent column.
    pub fn validate<'a>(
        &self,
        fields: impl IntoIterator<Item = Field>,
        available: impl IntoIterator<Item = &'a str> + Clone,
    ) -> Result<()> {
        for field in fields {
            for column in self.columns(field) {
                if !available.clone().into_iter().any(|c| c == column) {
                    return Err(Error::MissingField(column.to_string()));
                }
            }
        }
        Ok(())
    }
}

fn lateral_columns(names: Option<&[String; 4]>) -> Vec<&str> {
    names
        .map(|n| n.iter().map(String::as_str).collect())
        .unwrap_or_default()
}

/// Typed view of one measurement row; `None` means unknown
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub air_temperature: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub mean_radiant_temperature: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub albedo: Option<f64>,
    pub shortwave_up: Option<f64>,
    pub shortwave_down: Option<f64>,
    pub longwave_up: Option<f64>,
    pub longwave_down: Option<f64>,
    pub globe_temperature: Option<f64>,
    pub shortwave_lateral: Option<[f64; 4]>,
    pub longwave_lateral: Option<[f64; 4]>,
}

/// Finite value or `None`
#[inline]
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

impl Measurement {
    /// Basic record with the four scalars every index needs
    pub fn new(ta: f64, rh: f64, wv: f64, tmrt: f64) -> Self {
        Self {
            air_temperature: finite(ta),
            relative_humidity: finite(rh),
            wind_speed: finite(wv),
            mean_radiant_temperature: finite(tmrt),
            ..Self::default()
        }
    }

    /// Lift a table row into a record using the configured column names
    pub fn from_row(row: &Row, names: &FieldNames) -> Self {
        let get = |name: &String| row.get(name).copied().and_then(finite);
        let lateral = |names: &Option<[String; 4]>| -> Option<[f64; 4]> {
            let names = names.as_ref()?;
            Some([get(&names[0])?, get(&names[1])?, get(&names[2])?, get(&names[3])?])
        };
        Self {
            air_temperature: get(&names.air_temperature),
            relative_humidity: get(&names.relative_humidity),
            wind_speed: get(&names.wind_speed),
            mean_radiant_temperature: get(&names.mean_radiant_temperature),
            cloud_cover: get(&names.cloud_cover),
            albedo: get(&names.albedo),
            shortwave_up: get(&names.shortwave_up),
            shortwave_down: get(&names.shortwave_down),
            longwave_up: get(&names.longwave_up),
            longwave_down: get(&names.longwave_down),
            globe_temperature: get(&names.globe_temperature),
            shortwave_lateral: lateral(&names.shortwave_lateral),
            longwave_lateral: lateral(&names.longwave_lateral),
        }
    }

    /// (Ta, RH, Wv, Tmrt) when all four are known
    pub fn core(&self) -> Option<(f64, f64, f64, f64)> {
        Some((
            self.air_temperature?,
            self.relative_humidity?,
            self.wind_speed?,
            self.mean_radiant_temperature?,
        ))
    }

    /// Copy with another mean radiant temperature
    pub fn with_mean_radiant_temperature(self, tmrt: Option<f64>) -> Self {
        Self {
            mean_radiant_temperature: tmrt.and_then(finite),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, f64)]) -> Row {
        pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    #[test]
    fn test_from_row_uses_default_names() {
        let r = row(&[
            ("AirTC_Avg", 25.0),
            ("RH_Avg", 50.0),
            ("WS_ms_Avg", 1.0),
            ("T_mrt", f64::NAN),
        ]);
        let m = Measurement::from_row(&r, &FieldNames::default());
        assert_eq!(m.air_temperature, Some(25.0));
        assert_eq!(m.mean_radiant_temperature, None);
        assert!(m.core().is_none());
    }

    #[test]
    fn test_validate_reports_missing_column() {
        let names = FieldNames::default();
        let err = names
            .validate([Field::AirTemperature, Field::GlobeTemperature], ["AirTC_Avg"])
            .unwrap_err();
        assert!(matches!(err, Error::MissingField(c) if c == "Tg"));
    }

    #[test]
    fn test_lateral_channels_need_all_four() {
        let names = FieldNames {
            shortwave_lateral: Some(["n".into(), "s".into(), "e".into(), "w".into()]),
            ..FieldNames::default()
        };
        let partial = row(&[("n", 1.0), ("s", 2.0), ("e", 3.0)]);
        assert!(Measurement::from_row(&partial, &names).shortwave_lateral.is_none());
        let full = row(&[("n", 1.0), ("s", 2.0), ("e", 3.0), ("w", 4.0)]);
        assert_eq!(
            Measurement::from_row(&full, &names).shortwave_lateral,
            Some([1.0, 2.0, 3.0, 4.0])
        );
    }
}
