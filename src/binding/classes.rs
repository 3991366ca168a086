use pyo3::prelude::*;

use crate::error::Skipped;
use crate::processing::displacement::{DirectDisplacement, LandmarkShift, SpatialDisplacement};
use crate::processing::AnalysisReport;

/// Python representation of one measurement-level 2-D shift
///
/// Attributes:
///     measurement (str): e.g. "Tip to Anatomy Start"
///     fraction1_mm (float): Distance in fraction 1
///     fraction2_mm (float): Distance in fraction 2
///     shift_mm (float): fraction 2 minus fraction 1
#[pyclass]
#[derive(Debug, Clone)]
pub struct PyMeasurementShift {
    #[pyo3(get)]
    pub measurement: String,
    #[pyo3(get)]
    pub fraction1_mm: f64,
    #[pyo3(get)]
    pub fraction2_mm: f64,
    #[pyo3(get)]
    pub shift_mm: f64,
}

#[pymethods]
impl PyMeasurementShift {
    fn __repr__(&self) -> String {
        format!(
            "MeasurementShift({}: {:.2} -> {:.2} mm, shift={:+.2})",
            self.measurement, self.fraction1_mm, self.fraction2_mm, self.shift_mm
        )
    }
}

/// Python representation of a direct (same-view) displacement
///
/// Attributes:
///     view (str): "AP" or "LAT"
///     applicator (str): "Tandem", "Left Ovoid" or "Right Ovoid"
///     shifts (List[PyMeasurementShift]): Measurements present in both fractions
///     average_shift_mm (float): Signed mean shift
///     average_abs_shift_mm (float): Mean absolute shift
///     max_abs_shift_mm (float): Largest absolute shift
///     severity (str): Excellent, Good, Moderate or Significant
#[pyclass]
#[derive(Debug, Clone)]
pub struct PyDirectDisplacement {
    #[pyo3(get)]
    pub view: String,
    #[pyo3(get)]
    pub applicator: String,
    #[pyo3(get)]
    pub shifts: Vec<PyMeasurementShift>,
    #[pyo3(get)]
    pub average_shift_mm: f64,
    #[pyo3(get)]
    pub average_abs_shift_mm: f64,
    #[pyo3(get)]
    pub max_abs_shift_mm: f64,
    #[pyo3(get)]
    pub severity: String,
}

#[pymethods]
impl PyDirectDisplacement {
    fn __repr__(&self) -> String {
        format!(
            "DirectDisplacement({} {}, n={}, max={:.2} mm, {})",
            self.view,
            self.applicator,
            self.shifts.len(),
            self.max_abs_shift_mm,
            self.severity
        )
    }
}

impl From<&DirectDisplacement> for PyDirectDisplacement {
    fn from(d: &DirectDisplacement) -> Self {
        PyDirectDisplacement {
            view: d.view.to_string(),
            applicator: d.applicator.to_string(),
            shifts: d
                .shifts
                .iter()
                .map(|s| PyMeasurementShift {
                    measurement: s.measurement.to_string(),
                    fraction1_mm: s.fraction1_mm,
                    fraction2_mm: s.fraction2_mm,
                    shift_mm: s.shift_mm,
                })
                .collect(),
            average_shift_mm: d.average_shift_mm,
            average_abs_shift_mm: d.average_abs_shift_mm,
            max_abs_shift_mm: d.max_abs_shift_mm,
            severity: d.severity.to_string(),
        }
    }
}

/// Python representation of a 3-D applicator displacement
///
/// Attributes:
///     applicator (str): Applicator name
///     tip_mm (Optional[float]): Tip displacement magnitude
///     base_mm (Optional[float]): Base displacement magnitude
///     centroid_mm (Optional[float]): Centroid displacement magnitude
///     centroid_delta (Optional[Tuple[float, float, float]]): Centroid (dx, dy, dz)
///     max_magnitude_mm (float): Largest of the available magnitudes
///     severity (str): Severity class of `max_magnitude_mm`
///     direction (Optional[str]): e.g. "moved 5.0 mm Anterior"
#[pyclass]
#[derive(Debug, Clone)]
pub struct PySpatialDisplacement {
    #[pyo3(get)]
    pub applicator: String,
    #[pyo3(get)]
    pub tip_mm: Option<f64>,
    #[pyo3(get)]
    pub base_mm: Option<f64>,
    #[pyo3(get)]
    pub centroid_mm: Option<f64>,
    #[pyo3(get)]
    pub centroid_delta: Option<(f64, f64, f64)>,
    #[pyo3(get)]
    pub max_magnitude_mm: f64,
    #[pyo3(get)]
    pub severity: String,
    #[pyo3(get)]
    pub direction: Option<String>,
}

#[pymethods]
impl PySpatialDisplacement {
    fn __repr__(&self) -> String {
        format!(
            "SpatialDisplacement({}, max={:.2} mm, {})",
            self.applicator, self.max_magnitude_mm, self.severity
        )
    }
}

fn magnitude(shift: Option<LandmarkShift>) -> Option<f64> {
    shift.map(|s| s.magnitude_mm)
}

impl From<&SpatialDisplacement> for PySpatialDisplacement {
    fn from(s: &SpatialDisplacement) -> Self {
        PySpatialDisplacement {
            applicator: s.applicator.to_string(),
            tip_mm: magnitude(s.tip),
            base_mm: magnitude(s.base),
            centroid_mm: magnitude(s.centroid),
            centroid_delta: s.centroid.map(|c| (c.delta.x, c.delta.y, c.delta.z)),
            max_magnitude_mm: s.max_magnitude_mm,
            severity: s.severity.to_string(),
            direction: s.direction.clone(),
        }
    }
}

/// Python representation of one entry of the skip list
///
/// Attributes:
///     applicator (Optional[str]): Applicator concerned, if any
///     view (Optional[str]): View concerned, if any
///     measurement (Optional[str]): Measurement concerned, if any
///     reason (str): Why it was not evaluated
#[pyclass]
#[derive(Debug, Clone)]
pub struct PySkipped {
    #[pyo3(get)]
    pub applicator: Option<String>,
    #[pyo3(get)]
    pub view: Option<String>,
    #[pyo3(get)]
    pub measurement: Option<String>,
    #[pyo3(get)]
    pub reason: String,
}

#[pymethods]
impl PySkipped {
    fn __repr__(&self) -> String {
        format!("Skipped({})", self.reason)
    }
}

impl From<&Skipped> for PySkipped {
    fn from(s: &Skipped) -> Self {
        PySkipped {
            applicator: s.applicator.map(|a| a.to_string()),
            view: s.view.map(|v| v.to_string()),
            measurement: s.measurement.map(|m| m.to_string()),
            reason: s.reason.to_string(),
        }
    }
}

/// Result of one analysis run
///
/// Attributes:
///     direct (List[PyDirectDisplacement]): Same-view comparisons
///     spatial (List[PySpatialDisplacement]): 3-D comparisons
///     skipped (List[PySkipped]): Everything not evaluated
///     max_displacement_mm (Optional[float]): Largest displacement found
///     overall_severity (Optional[str]): Severity of `max_displacement_mm`
///     recommendation (Optional[str]): Clinical action for the overall severity
///     summary (str): Plain-text report
#[pyclass]
#[derive(Debug, Clone)]
pub struct PyAnalysisReport {
    #[pyo3(get)]
    pub direct: Vec<PyDirectDisplacement>,
    #[pyo3(get)]
    pub spatial: Vec<PySpatialDisplacement>,
    #[pyo3(get)]
    pub skipped: Vec<PySkipped>,
    #[pyo3(get)]
    pub max_displacement_mm: Option<f64>,
    #[pyo3(get)]
    pub overall_severity: Option<String>,
    #[pyo3(get)]
    pub recommendation: Option<String>,
    #[pyo3(get)]
    pub summary: String,
}

#[pymethods]
impl PyAnalysisReport {
    fn __repr__(&self) -> String {
        format!(
            "AnalysisReport(direct={}, spatial={}, skipped={}, overall={})",
            self.direct.len(),
            self.spatial.len(),
            self.skipped.len(),
            self.overall_severity.as_deref().unwrap_or("n/a")
        )
    }

    fn __str__(&self) -> String {
        self.summary.clone()
    }
}

impl From<&AnalysisReport> for PyAnalysisReport {
    fn from(report: &AnalysisReport) -> Self {
        PyAnalysisReport {
            direct: report.direct.iter().map(PyDirectDisplacement::from).collect(),
            spatial: report.spatial.iter().map(PySpatialDisplacement::from).collect(),
            skipped: report.skipped.iter().map(PySkipped::from).collect(),
            max_displacement_mm: report.max_displacement_mm,
            overall_severity: report.overall_severity.map(|s| s.to_string()),
            recommendation: report
                .overall_severity
                .map(|s| s.recommendation().to_string()),
            summary: crate::io::output::render_analysis_report(report),
        }
    }
}
