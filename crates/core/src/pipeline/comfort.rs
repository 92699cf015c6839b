//! Row driver for the thermal-comfort indices
//!
//! Each requested index is looked up in a name → routine table; every
//! routine takes the typed [`Measurement`] and the shared configuration and
//! returns named scalars. Rows are independent and evaluated in parallel.

use crate::core_types::constants::{HumanModel, PetSubject};
use crate::core_types::measurement::{Field, FieldNames, Measurement, Row};
use crate::core_types::units::Degrees;
use crate::error::{Error, Result};
use crate::physics::atmosphere::DEFAULT_SOLAR_ALTITUDE;
use crate::physics::{
    etu_detailed, perceived_temperature, pet, pmv, set, set_mist, tmrt_from_global, tmrt_from_globe,
    tmrt_from_radiometer, utci, EtuInputs, GlobalRadiationInputs, GlobeConfig, MistingConfig,
    RadiometerChannels, WindProfile,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// One output row: index name → value, `None` when undefined
pub type OutputRow = BTreeMap<&'static str, Option<f64>>;

/// Thermal index evaluated by the comfort pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ThermalIndex {
    #[serde(rename = "PET")]
    Pet,
    #[serde(rename = "PMV")]
    Pmv,
    #[serde(rename = "PT")]
    Pt,
    #[serde(rename = "SET")]
    Set,
    #[serde(rename = "SETmist")]
    SetMist,
    #[serde(rename = "UTCI")]
    Utci,
    #[serde(rename = "ETU")]
    Etu,
    /// Outdoor Tmrt from the radiation channels
    #[serde(rename = "Tmrt_OUT")]
    TmrtOutdoor,
    /// Tmrt from a globe thermometer
    #[serde(rename = "T_mrt")]
    TmrtGlobe,
}

impl ThermalIndex {
    pub const ALL: [ThermalIndex; 9] = [
        ThermalIndex::Pet,
        ThermalIndex::Pmv,
        ThermalIndex::Pt,
        ThermalIndex::Set,
        ThermalIndex::SetMist,
        ThermalIndex::Utci,
        ThermalIndex::Etu,
        ThermalIndex::TmrtOutdoor,
        ThermalIndex::TmrtGlobe,
    ];

    /// Output column name
    pub fn name(self) -> &'static str {
        match self {
            ThermalIndex::Pet => "PET",
            ThermalIndex::Pmv => "PMV",
            ThermalIndex::Pt => "PT",
            ThermalIndex::Set => "SET",
            ThermalIndex::SetMist => "SETmist",
            ThermalIndex::Utci => "UTCI",
            ThermalIndex::Etu => "ETU",
            ThermalIndex::TmrtOutdoor => "Tmrt_OUT",
            ThermalIndex::TmrtGlobe => "T_mrt",
        }
    }

    /// Every column this index writes
    pub fn outputs(self) -> &'static [&'static str] {
        match self {
            ThermalIndex::Etu => &ETU_OUTPUTS,
            ThermalIndex::Pet => &["PET"],
            ThermalIndex::Pmv => &["PMV"],
            ThermalIndex::Pt => &["PT"],
            ThermalIndex::Set => &["SET"],
            ThermalIndex::SetMist => &["SETmist"],
            ThermalIndex::Utci => &["UTCI"],
            ThermalIndex::TmrtOutdoor => &["Tmrt_OUT"],
            ThermalIndex::TmrtGlobe => &["T_mrt"],
        }
    }

    /// Measurement fields read by this index under `config`
    fn required_fields(self, config: &ComfortConfig) -> Vec<Field> {
        match self {
            ThermalIndex::TmrtOutdoor => config.outdoor_tmrt.fields(),
            ThermalIndex::TmrtGlobe => vec![
                Field::AirTemperature,
                Field::WindSpeed,
                Field::GlobeTemperature,
            ],
            _ => {
                let mut fields = vec![
                    Field::AirTemperature,
                    Field::RelativeHumidity,
                    Field::WindSpeed,
                ];
                match config.tmrt_source {
                    TmrtSource::Column => fields.push(Field::MeanRadiantTemperature),
                    TmrtSource::Outdoor => fields.extend(config.outdoor_tmrt.fields()),
                    TmrtSource::Globe => fields.push(Field::GlobeTemperature),
                }
                fields
            }
        }
    }

    fn evaluator(self) -> Evaluator {
        match self {
            ThermalIndex::Pet => eval_pet,
            ThermalIndex::Pmv => eval_pmv,
            ThermalIndex::Pt => eval_pt,
            ThermalIndex::Set => eval_set,
            ThermalIndex::SetMist => eval_set_mist,
            ThermalIndex::Utci => eval_utci,
            ThermalIndex::Etu => eval_etu,
            ThermalIndex::TmrtOutdoor => eval_tmrt_outdoor,
            ThermalIndex::TmrtGlobe => eval_tmrt_globe,
        }
    }
}

const ETU_OUTPUTS: [&str; 6] = [
    "ETU",
    "dif_NUATF",
    "dif_SERFL",
    "dif_ERFS",
    "dif_SEHF",
    "dif_EVCF",
];

impl fmt::Display for ThermalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ThermalIndex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ThermalIndex::ALL
            .into_iter()
            .find(|index| index.name() == s)
            .ok_or_else(|| Error::invalid(format!("unknown thermal index '{s}'")))
    }
}

/// Radiation closure behind `Tmrt_OUT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutdoorTmrt {
    /// Six-direction radiometer (up/down channels, optional laterals)
    #[default]
    Radiometer,
    /// Single pyranometer plus cloud cover and albedo
    GlobalRadiation,
}

impl OutdoorTmrt {
    fn fields(self) -> Vec<Field> {
        match self {
            OutdoorTmrt::Radiometer => vec![
                Field::ShortwaveUp,
                Field::ShortwaveDown,
                Field::LongwaveUp,
                Field::LongwaveDown,
                Field::ShortwaveLateral,
                Field::LongwaveLateral,
            ],
            OutdoorTmrt::GlobalRadiation => vec![
                Field::AirTemperature,
                Field::ShortwaveUp,
                Field::CloudCover,
                Field::Albedo,
            ],
        }
    }
}

/// Where the indices read Tmrt from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TmrtSource {
    /// The mean radiant temperature column
    #[default]
    Column,
    /// Computed with the `Tmrt_OUT` closure
    Outdoor,
    /// Computed from the globe thermometer
    Globe,
}

/// Configuration of the comfort pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComfortConfig {
    pub fields: FieldNames,
    pub human: HumanModel,
    pub pet_subject: PetSubject,
    pub misting: MistingConfig,
    pub wind_profile: WindProfile,
    pub globe: GlobeConfig,
    pub outdoor_tmrt: OutdoorTmrt,
    pub tmrt_source: TmrtSource,
    /// Solar altitude of the single-pyranometer closure
    pub solar_altitude: Degrees,
    /// Turn solver failures into undefined entries instead of failing the run
    pub lenient: bool,
}

impl Default for ComfortConfig {
    fn default() -> Self {
        Self {
            fields: FieldNames::default(),
            human: HumanModel::default(),
            pet_subject: PetSubject::default(),
            misting: MistingConfig::default(),
            wind_profile: WindProfile::default(),
            globe: GlobeConfig::default(),
            outdoor_tmrt: OutdoorTmrt::default(),
            tmrt_source: TmrtSource::default(),
            solar_altitude: DEFAULT_SOLAR_ALTITUDE,
            lenient: false,
        }
    }
}

type Evaluator = fn(&Measurement, &ComfortConfig) -> Result<Vec<(&'static str, Option<f64>)>>;

fn single(name: &'static str, value: Option<f64>) -> Result<Vec<(&'static str, Option<f64>)>> {
    Ok(vec![(name, value)])
}

/// Apply `f` to the four core scalars, `None` when any is unknown
fn with_core<T>(
    m: &Measurement,
    f: impl FnOnce(f64, f64, f64, f64) -> Result<T>,
) -> Result<Option<T>> {
    m.core().map(|(ta, rh, wv, tmrt)| f(ta, rh, wv, tmrt)).transpose()
}

fn eval_pet(m: &Measurement, c: &ComfortConfig) -> Result<Vec<(&'static str, Option<f64>)>> {
    single("PET", with_core(m, |ta, rh, wv, tmrt| pet(ta, rh, wv, tmrt, &c.pet_subject))?)
}

fn eval_pmv(m: &Measurement, c: &ComfortConfig) -> Result<Vec<(&'static str, Option<f64>)>> {
    single("PMV", with_core(m, |ta, rh, wv, tmrt| pmv(ta, rh, wv, tmrt, &c.human))?)
}

fn eval_pt(m: &Measurement, c: &ComfortConfig) -> Result<Vec<(&'static str, Option<f64>)>> {
    let value = with_core(m, |ta, rh, wv, tmrt| pmv(ta, rh, wv, tmrt, &c.human))?
        .and_then(|v| perceived_temperature(v, c.human.clothing));
    single("PT", value)
}

fn eval_set(m: &Measurement, c: &ComfortConfig) -> Result<Vec<(&'static str, Option<f64>)>> {
    single("SET", with_core(m, |ta, rh, wv, tmrt| set(ta, rh, wv, tmrt, &c.human))?)
}

fn eval_set_mist(m: &Measurement, c: &ComfortConfig) -> Result<Vec<(&'static str, Option<f64>)>> {
    let value = with_core(m, |ta, rh, wv, tmrt| {
        set_mist(ta, rh, wv, tmrt, &c.human, &c.misting)
    })?;
    single("SETmist", value)
}

fn eval_utci(m: &Measurement, c: &ComfortConfig) -> Result<Vec<(&'static str, Option<f64>)>> {
    let value = m
        .core()
        .and_then(|(ta, rh, wv, tmrt)| utci(ta, rh, wv, tmrt, &c.wind_profile));
    single("UTCI", value)
}

fn eval_etu(m: &Measurement, c: &ComfortConfig) -> Result<Vec<(&'static str, Option<f64>)>> {
    let result = with_core(m, |ta, rh, wv, tmrt| {
        etu_detailed(ta, rh, wv, tmrt, &EtuInputs::default(), &c.human)
    })?;
    let field = |f: fn(&crate::physics::EtuResult) -> f64| result.as_ref().map(f);
    Ok(vec![
        ("ETU", field(|r| r.etu)),
        ("dif_NUATF", field(|r| r.dif_nuatf)),
        ("dif_SERFL", field(|r| r.dif_serfl)),
        ("dif_ERFS", field(|r| r.dif_erfs)),
        ("dif_SEHF", field(|r| r.dif_sehf)),
        ("dif_EVCF", field(|r| r.dif_evcf)),
    ])
}

/// Outdoor Tmrt with the configured closure
fn outdoor_tmrt(m: &Measurement, c: &ComfortConfig) -> Option<f64> {
    match c.outdoor_tmrt {
        OutdoorTmrt::Radiometer => tmrt_from_radiometer(&RadiometerChannels {
            shortwave_up: m.shortwave_up?,
            shortwave_down: m.shortwave_down?,
            longwave_up: m.longwave_up?,
            longwave_down: m.longwave_down?,
            shortwave_lateral: m.shortwave_lateral,
            longwave_lateral: m.longwave_lateral,
        }),
        OutdoorTmrt::GlobalRadiation => {
            let mut inputs = GlobalRadiationInputs::new(
                m.air_temperature?,
                m.shortwave_up?,
                m.cloud_cover?,
                m.albedo?,
            );
            inputs.reflected = m.shortwave_down;
            inputs.longwave_sky = m.longwave_up;
            inputs.longwave_ground = m.longwave_down;
            inputs.solar_altitude = c.solar_altitude;
            tmrt_from_global(&inputs)
        }
    }
}

fn globe_tmrt(m: &Measurement, c: &ComfortConfig) -> Option<f64> {
    tmrt_from_globe(m.air_temperature?, m.globe_temperature?, m.wind_speed?, &c.globe)
}

fn eval_tmrt_outdoor(m: &Measurement, c: &ComfortConfig) -> Result<Vec<(&'static str, Option<f64>)>> {
    single("Tmrt_OUT", outdoor_tmrt(m, c))
}

fn eval_tmrt_globe(m: &Measurement, c: &ComfortConfig) -> Result<Vec<(&'static str, Option<f64>)>> {
    single("T_mrt", globe_tmrt(m, c))
}

/// Comfort pipeline over a measurement table
#[derive(Debug, Clone)]
pub struct ComfortPipeline {
    config: ComfortConfig,
    indices: Vec<ThermalIndex>,
}

impl ComfortPipeline {
    /// Pipeline evaluating `indices`, duplicates removed, in the given order
    pub fn new(config: ComfortConfig, indices: &[ThermalIndex]) -> Self {
        let mut unique = Vec::with_capacity(indices.len());
        for &index in indices {
            if !unique.contains(&index) {
                unique.push(index);
            }
        }
        Self {
            config,
            indices: unique,
        }
    }

    /// Pipeline from index names such as `"PET"` or `"Tmrt_OUT"`
    ///
    /// # Errors
    /// [`Error::InvalidInputs`] for an unknown name.
    pub fn from_names<S: AsRef<str>>(config: ComfortConfig, names: &[S]) -> Result<Self> {
        let indices = names
            .iter()
            .map(|n| n.as_ref().parse())
            .collect::<Result<Vec<ThermalIndex>>>()?;
        Ok(Self::new(config, &indices))
    }

    pub fn config(&self) -> &ComfortConfig {
        &self.config
    }

    pub fn indices(&self) -> &[ThermalIndex] {
        &self.indices
    }

    /// Check that every column the requested indices read is present
    ///
    /// # Errors
    /// [`Error::MissingField`] naming the first absent column.
    pub fn validate<'a>(&self, columns: impl IntoIterator<Item = &'a str> + Clone) -> Result<()> {
        let fields = self
            .indices
            .iter()
            .flat_map(|index| index.required_fields(&self.config));
        self.config.fields.validate(fields, columns)
    }

    /// Measurement with Tmrt taken from the configured source
    fn prepare(&self, row: &Row) -> Measurement {
        let m = Measurement::from_row(row, &self.config.fields);
        match self.config.tmrt_source {
            TmrtSource::Column => m,
            TmrtSource::Outdoor => m.with_mean_radiant_temperature(outdoor_tmrt(&m, &self.config)),
            TmrtSource::Globe => m.with_mean_radiant_temperature(globe_tmrt(&m, &self.config)),
        }
    }

    /// Evaluate all indices on one measurement
    ///
    /// # Errors
    /// Solver failures, unless the pipeline is lenient.
    pub fn evaluate(&self, m: &Measurement) -> Result<OutputRow> {
        let mut out = OutputRow::new();
        for &index in &self.indices {
            match (index.evaluator())(m, &self.config) {
                Ok(values) => out.extend(values),
                Err(err) if self.config.lenient => {
                    warn!(index = index.name(), error = %err, "index left undefined");
                    out.extend(index.outputs().iter().map(|&name| (name, None)));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(out)
    }

    /// Evaluate one table row
    pub fn evaluate_row(&self, row: &Row) -> Result<OutputRow> {
        self.evaluate(&self.prepare(row))
    }

    /// Evaluate a whole table, one output row per input row
    ///
    /// Column presence is checked against the first row before any work.
    ///
    /// # Errors
    /// [`Error::MissingField`] up front, then the first solver failure in
    /// strict mode.
    pub fn run(&self, rows: &[Row]) -> Result<Vec<OutputRow>> {
        if let Some(first) = rows.first() {
            self.validate(first.keys().map(String::as_str))?;
        }
        info!(
            rows = rows.len(),
            indices = ?self.indices.iter().map(|i| i.name()).collect::<Vec<_>>(),
            "Starting comfort pipeline"
        );
        let out = rows
            .par_iter()
            .map(|row| self.evaluate_row(row))
            .collect::<Result<Vec<_>>>()?;
        let undefined = out
            .iter()
            .filter(|r| r.values().any(Option::is_none))
            .count();
        debug!(undefined, "rows with undefined entries");
        info!(rows = out.len(), "Comfort pipeline finished");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, f64)]) -> Row {
        pairs.iter().map(|&(k, v)| (k.to_string(), v)).collect()
    }

    fn basic_row(ta: f64) -> Row {
        row(&[
            ("AirTC_Avg", ta),
            ("RH_Avg", 50.0),
            ("WS_ms_Avg", 2.0),
            ("T_mrt", 25.0),
        ])
    }

    #[test]
    fn test_names_roundtrip() {
        for index in ThermalIndex::ALL {
            assert_eq!(index.name().parse::<ThermalIndex>().unwrap(), index);
        }
        assert!("WBGT".parse::<ThermalIndex>().is_err());
    }

    #[test]
    fn test_missing_field_fails_early() {
        let pipeline = ComfortPipeline::new(ComfortConfig::default(), &[ThermalIndex::Utci]);
        let rows = vec![row(&[("AirTC_Avg", 20.0), ("RH_Avg", 50.0), ("WS_ms_Avg", 2.0)])];
        assert_eq!(
            pipeline.run(&rows),
            Err(Error::MissingField("T_mrt".to_string()))
        );
    }

    #[test]
    fn test_nan_row_is_undefined() {
        let pipeline = ComfortPipeline::new(
            ComfortConfig::default(),
            &[ThermalIndex::Utci, ThermalIndex::Pmv],
        );
        let rows = vec![basic_row(20.0), basic_row(f64::NAN)];
        let out = pipeline.run(&rows).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out[0]["UTCI"].is_some());
        assert!(out[1]["UTCI"].is_none());
        assert!(out[1]["PMV"].is_none());
    }

    #[test]
    fn test_etu_writes_diagnostics() {
        let pipeline = ComfortPipeline::new(ComfortConfig::default(), &[ThermalIndex::Etu]);
        let out = pipeline.evaluate_row(&basic_row(f64::NAN)).unwrap();
        assert_eq!(out.len(), ETU_OUTPUTS.len());
        assert!(out.values().all(Option::is_none));
    }

    #[test]
    fn test_duplicates_are_removed() {
        let pipeline = ComfortPipeline::from_names(ComfortConfig::default(), &["PMV", "PT", "PMV"]).unwrap();
        assert_eq!(pipeline.indices(), &[ThermalIndex::Pmv, ThermalIndex::Pt]);
    }

    #[test]
    fn test_globe_source_feeds_indices() {
        let config = ComfortConfig {
            tmrt_source: TmrtSource::Globe,
            ..ComfortConfig::default()
        };
        let pipeline = ComfortPipeline::new(config, &[ThermalIndex::Utci, ThermalIndex::TmrtGlobe]);
        let r = row(&[
            ("AirTC_Avg", 20.0),
            ("RH_Avg", 50.0),
            ("WS_ms_Avg", 2.0),
            ("Tg", 20.0),
        ]);
        let out = pipeline.run(&[r]).unwrap();
        let tmrt = out[0]["T_mrt"].unwrap();
        assert!((tmrt - 20.0).abs() < 1e-9);
        assert!(out[0]["UTCI"].is_some());
    }
}
