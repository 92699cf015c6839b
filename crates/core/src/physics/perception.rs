//! Thermal perception and physiological stress bands
//!
//! # References
//! - Matzarakis, A., Mayer, H. (1996). "Another kind of environmental stress:
//!   thermal stress". WHO Newsletter, 18, 7-10 (PET bands)
//! - Błażejczyk, K. et al. (2013). "An introduction to the Universal Thermal
//!   Climate Index (UTCI)". Geographia Polonica, 86(1), 5-10 (UTCI bands)

use serde::Serialize;

/// One labelled band of an index scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerceptionRange {
    /// Perception or stress label
    pub label: &'static str,
    /// Inclusive lower bound (°C), −∞ for the first band
    pub lower: f64,
    /// Exclusive upper bound (°C), +∞ for the last band
    pub upper: f64,
    /// Display colour as `#rrggbb`
    pub color: &'static str,
}

impl PerceptionRange {
    /// Whether `value` falls in [lower, upper)
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value < self.upper
    }
}

const fn band(label: &'static str, lower: f64, upper: f64, color: &'static str) -> PerceptionRange {
    PerceptionRange {
        label,
        lower,
        upper,
        color,
    }
}

const PET_RANGES: [PerceptionRange; 9] = [
    band("Very cold", f64::NEG_INFINITY, 4.0, "#2b83ba"),
    band("Cold", 4.0, 8.0, "#64abb0"),
    band("Cool", 8.0, 13.0, "#9dd3a7"),
    band("Slightly cool", 13.0, 18.0, "#c7e9ad"),
    band("Comfortable", 18.0, 23.0, "#ffffbf"),
    band("Slightly warm", 23.0, 29.0, "#fec980"),
    band("Warm", 29.0, 35.0, "#f99e59"),
    band("Hot", 35.0, 41.0, "#e85b3a"),
    band("Very hot", 41.0, f64::INFINITY, "#d7191c"),
];

const UTCI_RANGES: [PerceptionRange; 10] = [
    band("Extreme cold stress", f64::NEG_INFINITY, -40.0, "#000080"),
    band("Very strong cold stress", -40.0, -27.0, "#0000c0"),
    band("Strong cold stress", -27.0, -13.0, "#0000ff"),
    band("Moderate cold stress", -13.0, 0.0, "#0060ff"),
    band("Slight cold stress", 0.0, 9.0, "#00c0ff"),
    band("No thermal stress", 9.0, 26.0, "#00c000"),
    band("Moderate heat stress", 26.0, 32.0, "#ff9900"),
    band("Strong heat stress", 32.0, 38.0, "#ff3300"),
    band("Very strong heat stress", 38.0, 46.0, "#cc0000"),
    band("Extreme heat stress", 46.0, f64::INFINITY, "#800000"),
];

/// Index with a published perception scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerceptionScale {
    Pet,
    Utci,
}

impl PerceptionScale {
    /// Ordered bands covering the real line
    pub fn thermal_perception_ranges(self) -> &'static [PerceptionRange] {
        match self {
            PerceptionScale::Pet => &PET_RANGES,
            PerceptionScale::Utci => &UTCI_RANGES,
        }
    }

    /// Band containing `value`, `None` for NaN
    pub fn classify(self, value: f64) -> Option<&'static PerceptionRange> {
        self.thermal_perception_ranges()
            .iter()
            .find(|r| r.contains(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands_are_contiguous() {
        for scale in [PerceptionScale::Pet, PerceptionScale::Utci] {
            let ranges = scale.thermal_perception_ranges();
            assert_eq!(ranges[0].lower, f64::NEG_INFINITY);
            assert_eq!(ranges[ranges.len() - 1].upper, f64::INFINITY);
            for pair in ranges.windows(2) {
                assert_eq!(pair[0].upper, pair[1].lower);
            }
        }
    }

    #[test]
    fn test_pet_bounds() {
        let bounds: Vec<f64> = PerceptionScale::Pet
            .thermal_perception_ranges()
            .iter()
            .map(|r| r.upper)
            .collect();
        assert_eq!(
            bounds,
            vec![4.0, 8.0, 13.0, 18.0, 23.0, 29.0, 35.0, 41.0, f64::INFINITY]
        );
    }

    #[test]
    fn test_classify() {
        assert_eq!(PerceptionScale::Pet.classify(20.0).unwrap().label, "Comfortable");
        assert_eq!(PerceptionScale::Pet.classify(41.0).unwrap().label, "Very hot");
        assert_eq!(
            PerceptionScale::Utci.classify(-45.0).unwrap().label,
            "Extreme cold stress"
        );
        assert!(PerceptionScale::Utci.classify(f64::NAN).is_none());
    }
}
