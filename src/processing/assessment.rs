use serde::Serialize;
use std::fmt;

/// Clinical severity band of a maximum displacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Excellent,
    Good,
    Moderate,
    Significant,
}

/// Lower bounds (inclusive) of the Good, Moderate and Significant bands, in mm.
pub const GOOD_FROM_MM: f64 = 3.0;
pub const MODERATE_FROM_MM: f64 = 5.0;
pub const SIGNIFICANT_FROM_MM: f64 = 7.0;

impl Severity {
    /// Maps a maximum absolute displacement (mm, >= 0) to its band.
    ///
    /// Boundaries are inclusive on the upper band: 3.0 is Good, 7.0 is
    /// Significant. NaN lands in Significant.
    pub fn classify(max_abs_displacement_mm: f64) -> Severity {
        debug_assert!(
            !(max_abs_displacement_mm < 0.0),
            "displacement magnitude must be non-negative"
        );
        if max_abs_displacement_mm < GOOD_FROM_MM {
            Severity::Excellent
        } else if max_abs_displacement_mm < MODERATE_FROM_MM {
            Severity::Good
        } else if max_abs_displacement_mm < SIGNIFICANT_FROM_MM {
            Severity::Moderate
        } else {
            Severity::Significant
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Excellent => "Excellent",
            Severity::Good => "Good",
            Severity::Moderate => "Moderate",
            Severity::Significant => "Significant",
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            Severity::Excellent => {
                "Applicator position is reproducible; proceed with the treatment plan."
            }
            Severity::Good => {
                "Minor shift within tolerance; proceed and monitor at the next fraction."
            }
            Severity::Moderate => "Review applicator position against the plan before treatment.",
            Severity::Significant => {
                "Reposition the applicator or re-plan before delivering this fraction."
            }
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
