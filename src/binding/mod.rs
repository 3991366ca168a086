pub mod classes;

use classes::{PyAnalysisReport, PyDirectDisplacement, PySkipped};
use pyo3::prelude::*;

use crate::config::Calibration;
use crate::io::{analyze_distance_files, input::read_distance_records, load_session, output};
use crate::processing::{analyze, assessment::Severity};

fn runtime_err(e: impl std::fmt::Display) -> PyErr {
    pyo3::exceptions::PyRuntimeError::new_err(e.to_string())
}

/// Runs the full displacement analysis on annotation record files.
///
/// Arguments:
///
/// - ``paths`` – One JSON annotation record per (view, fraction)
/// - ``ap_mm_per_pixel`` (default: 0.2979) – AP calibration factor
/// - ``lat_mm_per_pixel`` (default: 0.2979) – LAT calibration factor
///
/// Annotation record format:
///
/// ```text
/// {"view": "AP", "fraction": 1,
///  "anatomy": [{"x": 10.0, "y": 20.0}, {"x": 40.0, "y": 80.0}],
///  "applicators": {"tandem": {"tip": {"x": 1.0, "y": 2.0}, "base": null}}}
/// ```
///
/// Returns:
///
/// A ``PyAnalysisReport``; anything that could not be evaluated is listed
/// in its ``skipped`` attribute.
///
/// Example:
///
/// ```python
/// import applicatorqa as aq
/// report = aq.analyze_annotation_files(
///     ["ap_1.json", "ap_2.json", "lat_1.json", "lat_2.json"]
/// )
/// print(report.overall_severity)
/// ```
#[pyfunction]
#[pyo3(
    signature = (
        paths,
        ap_mm_per_pixel = 0.2979f64,
        lat_mm_per_pixel = 0.2979f64,
    )
)]
pub fn analyze_annotation_files(
    paths: Vec<String>,
    ap_mm_per_pixel: f64,
    lat_mm_per_pixel: f64,
) -> PyResult<PyAnalysisReport> {
    let calibration = Calibration::from_values(ap_mm_per_pixel, lat_mm_per_pixel)
        .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))?;
    let ctx = load_session(paths.as_slice(), calibration).map_err(runtime_err)?;
    Ok(PyAnalysisReport::from(&analyze(&ctx)))
}

/// Direct displacement between two structured distance files.
///
/// Returns:
///
/// A 2-tuple ``(results, skipped)``.
#[pyfunction]
pub fn compare_distance_files(
    fraction1_path: &str,
    fraction2_path: &str,
) -> PyResult<(Vec<PyDirectDisplacement>, Vec<PySkipped>)> {
    let (results, skipped) =
        analyze_distance_files(fraction1_path, fraction2_path).map_err(runtime_err)?;
    Ok((
        results.iter().map(PyDirectDisplacement::from).collect(),
        skipped.iter().map(PySkipped::from).collect(),
    ))
}

/// Severity class of a displacement in millimetres.
///
/// Example:
///
/// ```python
/// >>> aq.classify_displacement(4.2)
/// 'Good'
/// ```
#[pyfunction]
pub fn classify_displacement(displacement_mm: f64) -> PyResult<String> {
    if displacement_mm < 0.0 {
        return Err(pyo3::exceptions::PyValueError::new_err(format!(
            "displacement must be non-negative, got {}",
            displacement_mm
        )));
    }
    Ok(Severity::classify(displacement_mm).to_string())
}

/// Human-readable distance reports of a structured distance file, one per
/// (view, fraction) it contains.
#[pyfunction]
pub fn render_distance_report(distance_path: &str) -> PyResult<Vec<String>> {
    let sheets = read_distance_records(distance_path).map_err(runtime_err)?;
    Ok(sheets.iter().map(output::render_distance_report).collect())
}
