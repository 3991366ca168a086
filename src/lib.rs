pub mod config;
pub mod error;
pub mod io;
pub mod processing;
pub mod session;
mod utils;

#[cfg(feature = "python")]
mod binding;

pub use config::{Calibration, CalibrationConfig, CalibrationFactor};
pub use error::{AnalysisError, Skipped};
pub use io::{analyze_distance_files, load_session};
pub use processing::{analyze, AnalysisReport};
pub use session::SessionContext;

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn applicatorqa(m: &Bound<'_, PyModule>) -> PyResult<()> {
    use binding::classes::{
        PyAnalysisReport, PyDirectDisplacement, PyMeasurementShift, PySkipped,
        PySpatialDisplacement,
    };

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_function(wrap_pyfunction!(binding::analyze_annotation_files, m)?)?;
    m.add_function(wrap_pyfunction!(binding::compare_distance_files, m)?)?;
    m.add_function(wrap_pyfunction!(binding::classify_displacement, m)?)?;
    m.add_function(wrap_pyfunction!(binding::render_distance_report, m)?)?;

    m.add_class::<PyAnalysisReport>()?;
    m.add_class::<PyDirectDisplacement>()?;
    m.add_class::<PyMeasurementShift>()?;
    m.add_class::<PySpatialDisplacement>()?;
    m.add_class::<PySkipped>()?;
    Ok(())
}
