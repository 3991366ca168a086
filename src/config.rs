use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::AnalysisError;
use crate::io::annotation::{Point2D, View};

/// Default physical length per pixel (mm/pixel) for both views.
pub const DEFAULT_MM_PER_PIXEL: f64 = 0.2979;

/// Physical length per pixel, always positive and finite.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct CalibrationFactor(f64);

impl CalibrationFactor {
    pub fn new(mm_per_pixel: f64) -> Result<Self, AnalysisError> {
        if mm_per_pixel.is_finite() && mm_per_pixel > 0.0 {
            Ok(CalibrationFactor(mm_per_pixel))
        } else {
            Err(AnalysisError::InvalidCalibration(mm_per_pixel.to_string()))
        }
    }

    /// Derives mm/pixel from two points marked across an object of known length.
    pub fn from_reference(
        p1: Point2D,
        p2: Point2D,
        known_length_mm: f64,
    ) -> Result<Self, AnalysisError> {
        let pixels = crate::processing::distances::distance(p1, p2);
        if !(pixels.is_finite() && pixels > 0.0) {
            return Err(AnalysisError::InvalidCalibration(format!(
                "reference points {:?} and {:?} span no pixels",
                p1, p2
            )));
        }
        if !(known_length_mm.is_finite() && known_length_mm > 0.0) {
            return Err(AnalysisError::InvalidCalibration(format!(
                "reference length {}",
                known_length_mm
            )));
        }
        Self::new(known_length_mm / pixels)
    }

    pub fn mm_per_pixel(self) -> f64 {
        self.0
    }
}

impl Default for CalibrationFactor {
    fn default() -> Self {
        CalibrationFactor(DEFAULT_MM_PER_PIXEL)
    }
}

impl FromStr for CalibrationFactor {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| AnalysisError::InvalidCalibration(s.to_string()))?;
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for CalibrationFactor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        CalibrationFactor::new(value).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for CalibrationFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mm/pixel", self.0)
    }
}

/// One factor per view family, independent of fraction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Calibration {
    pub ap: CalibrationFactor,
    pub lat: CalibrationFactor,
}

impl Calibration {
    pub fn new(ap: CalibrationFactor, lat: CalibrationFactor) -> Self {
        Calibration { ap, lat }
    }

    /// Validates raw factors at the boundary.
    pub fn from_values(ap_mm_per_pixel: f64, lat_mm_per_pixel: f64) -> Result<Self, AnalysisError> {
        Ok(Calibration {
            ap: CalibrationFactor::new(ap_mm_per_pixel)?,
            lat: CalibrationFactor::new(lat_mm_per_pixel)?,
        })
    }

    pub fn for_view(&self, view: View) -> CalibrationFactor {
        match view {
            View::Ap => self.ap,
            View::Lat => self.lat,
        }
    }

    /// Returns a new calibration with one view's factor replaced.
    pub fn with_view(self, view: View, factor: CalibrationFactor) -> Self {
        match view {
            View::Ap => Calibration { ap: factor, ..self },
            View::Lat => Calibration { lat: factor, ..self },
        }
    }
}

/// On-disk calibration configuration.
///
/// ```toml
/// ap_mm_per_pixel = 0.2979
/// lat_mm_per_pixel = 0.31
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    #[serde(default)]
    pub ap_mm_per_pixel: Option<f64>,
    #[serde(default)]
    pub lat_mm_per_pixel: Option<f64>,
}

impl CalibrationConfig {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: CalibrationConfig =
            toml::from_str(text).context("failed to parse calibration config")?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read calibration config {:?}", path))?;
        Self::from_toml_str(&text).with_context(|| format!("in {:?}", path))
    }

    /// Missing keys fall back to `DEFAULT_MM_PER_PIXEL`.
    pub fn calibration(&self) -> Result<Calibration, AnalysisError> {
        Calibration::from_values(
            self.ap_mm_per_pixel.unwrap_or(DEFAULT_MM_PER_PIXEL),
            self.lat_mm_per_pixel.unwrap_or(DEFAULT_MM_PER_PIXEL),
        )
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        toml::to_string(self).context("failed to serialize calibration config")
    }
}
