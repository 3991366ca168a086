use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::io::annotation::{ApplicatorType, Fraction, Measurement, View};

/// Reasons a view, applicator or measurement drops out of a computation.
///
/// Only `IncompleteAnatomy` is fatal to a whole (View, Fraction) distance pass;
/// the other variants mark a single applicator or measurement as unavailable.
#[derive(Debug, Error, Clone, PartialEq, Serialize)]
pub enum AnalysisError {
    #[error(
        "anatomy reference for {view} fraction {fraction} has {points} point(s), need at least 2"
    )]
    IncompleteAnatomy {
        view: View,
        fraction: Fraction,
        points: usize,
    },
    #[error("{applicator} has a {present} point but no {missing} point")]
    IncompleteLandmark {
        applicator: ApplicatorType,
        present: &'static str,
        missing: &'static str,
    },
    #[error("{applicator}: {what} missing in fraction {fraction}")]
    MissingCounterpartData {
        applicator: ApplicatorType,
        fraction: Fraction,
        what: String,
    },
    #[error("invalid calibration factor '{0}': must be a positive finite number")]
    InvalidCalibration(String),
}

/// One entry of a skip list: what was left out and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skipped {
    pub applicator: Option<ApplicatorType>,
    pub view: Option<View>,
    pub measurement: Option<Measurement>,
    pub reason: AnalysisError,
}

impl Skipped {
    pub fn new(reason: AnalysisError) -> Self {
        Skipped {
            applicator: None,
            view: None,
            measurement: None,
            reason,
        }
    }

    pub fn applicator(mut self, applicator: ApplicatorType) -> Self {
        self.applicator = Some(applicator);
        self
    }

    pub fn view(mut self, view: View) -> Self {
        self.view = Some(view);
        self
    }

    pub fn measurement(mut self, measurement: Measurement) -> Self {
        self.measurement = Some(measurement);
        self
    }
}

impl fmt::Display for Skipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut scope = Vec::new();
        if let Some(view) = self.view {
            scope.push(view.to_string());
        }
        if let Some(applicator) = self.applicator {
            scope.push(applicator.to_string());
        }
        if let Some(measurement) = self.measurement {
            scope.push(measurement.to_string());
        }
        if scope.is_empty() {
            write!(f, "{}", self.reason)
        } else {
            write!(f, "[{}] {}", scope.join(" / "), self.reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_display_includes_scope() {
        let skipped = Skipped::new(AnalysisError::MissingCounterpartData {
            applicator: ApplicatorType::LeftOvoid,
            fraction: Fraction::Second,
            what: "base point".to_string(),
        })
        .applicator(ApplicatorType::LeftOvoid)
        .view(View::Lat)
        .measurement(Measurement::BaseToEnd);

        let text = skipped.to_string();
        assert!(text.starts_with("[LAT / Left Ovoid / Base to Anatomy End]"));
        assert!(text.contains("missing in fraction 2"));
    }

    #[test]
    fn test_incomplete_anatomy_message() {
        let err = AnalysisError::IncompleteAnatomy {
            view: View::Ap,
            fraction: Fraction::First,
            points: 1,
        };
        assert_eq!(
            err.to_string(),
            "anatomy reference for AP fraction 1 has 1 point(s), need at least 2"
        );
    }
}
