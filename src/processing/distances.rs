use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{Calibration, CalibrationFactor};
use crate::error::{AnalysisError, Skipped};
use crate::io::annotation::{
    AnatomyEnd, AnatomyReference, AnnotationSet, ApplicatorLandmark, ApplicatorType, Fraction,
    Landmark, Measurement, Point2D, View,
};

/// Euclidean distance in pixels.
pub fn distance(p1: Point2D, p2: Point2D) -> f64 {
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    (dx * dx + dy * dy).sqrt()
}

/// Pixel distance scaled by the view's calibration factor, in mm.
pub fn physical_distance(p1: Point2D, p2: Point2D, factor: CalibrationFactor) -> f64 {
    distance(p1, p2) * factor.mm_per_pixel()
}

/// The four named physical distances of one applicator in one (View, Fraction).
///
/// A `None` value means "not available"; it is never a stand-in for 0 mm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceRecord {
    pub view: View,
    pub fraction: Fraction,
    pub applicator: ApplicatorType,
    pub tip_to_start: Option<f64>,
    pub tip_to_end: Option<f64>,
    pub base_to_start: Option<f64>,
    pub base_to_end: Option<f64>,
}

impl DistanceRecord {
    pub fn empty(view: View, fraction: Fraction, applicator: ApplicatorType) -> Self {
        DistanceRecord {
            view,
            fraction,
            applicator,
            tip_to_start: None,
            tip_to_end: None,
            base_to_start: None,
            base_to_end: None,
        }
    }

    pub fn get(&self, measurement: Measurement) -> Option<f64> {
        match measurement {
            Measurement::TipToStart => self.tip_to_start,
            Measurement::TipToEnd => self.tip_to_end,
            Measurement::BaseToStart => self.base_to_start,
            Measurement::BaseToEnd => self.base_to_end,
        }
    }

    /// Builder-style setter used while assembling a record from parsed input.
    pub fn with(mut self, measurement: Measurement, value: Option<f64>) -> Self {
        match measurement {
            Measurement::TipToStart => self.tip_to_start = value,
            Measurement::TipToEnd => self.tip_to_end = value,
            Measurement::BaseToStart => self.base_to_start = value,
            Measurement::BaseToEnd => self.base_to_end = value,
        }
        self
    }

    pub fn available(&self) -> impl Iterator<Item = (Measurement, f64)> + '_ {
        Measurement::ALL
            .into_iter()
            .filter_map(move |m| self.get(m).map(|v| (m, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.available().next().is_none()
    }
}

/// Computes the four distances of `landmark` against the anatomy endpoints.
///
/// Measurements of a missing tip or base stay `None`. Fails with
/// `IncompleteAnatomy` when the reference has fewer than two points.
pub fn compute_distance_record(
    landmark: &ApplicatorLandmark,
    anatomy: &AnatomyReference,
    calibration: &Calibration,
    view: View,
    fraction: Fraction,
) -> Result<DistanceRecord, AnalysisError> {
    let (start, end) = anatomy.endpoints(view, fraction)?;
    let factor = calibration.for_view(view);

    let mut record = DistanceRecord::empty(view, fraction, landmark.kind);
    for measurement in Measurement::ALL {
        let Some(point) = landmark.point(measurement.landmark()) else {
            continue;
        };
        let target = match measurement.anatomy_end() {
            AnatomyEnd::Start => start,
            AnatomyEnd::End => end,
        };
        let value = physical_distance(point, target, factor);
        debug!(
            "{} F{} {} {}: {:.2} mm",
            view, fraction, landmark.kind, measurement, value
        );
        record = record.with(measurement, Some(value));
    }
    Ok(record)
}

/// All distance records of one (View, Fraction) plus what was left out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceSheet {
    pub view: View,
    pub fraction: Fraction,
    pub records: BTreeMap<ApplicatorType, DistanceRecord>,
    pub skipped: Vec<Skipped>,
}

impl DistanceSheet {
    pub fn new(view: View, fraction: Fraction) -> Self {
        DistanceSheet {
            view,
            fraction,
            records: BTreeMap::new(),
            skipped: Vec::new(),
        }
    }

    pub fn from_records(
        view: View,
        fraction: Fraction,
        records: impl IntoIterator<Item = DistanceRecord>,
    ) -> Self {
        DistanceSheet {
            view,
            fraction,
            records: records.into_iter().map(|r| (r.applicator, r)).collect(),
            skipped: Vec::new(),
        }
    }

    pub fn record(&self, applicator: ApplicatorType) -> Option<&DistanceRecord> {
        self.records.get(&applicator)
    }
}

/// Distance pass over one annotation set.
///
/// Fail-fast: an incomplete anatomy reference yields no records at all.
/// Unannotated applicators produce no record; partial ones produce the
/// measurements of the placed point and a skip entry for the other.
pub fn compute_distance_sheet(
    set: &AnnotationSet,
    calibration: &Calibration,
) -> Result<DistanceSheet, AnalysisError> {
    let view = set.view();
    let fraction = set.fraction();
    set.anatomy().endpoints(view, fraction)?;

    let mut sheet = DistanceSheet::new(view, fraction);
    for landmark in set.landmarks() {
        if landmark.is_empty() {
            debug!("{} F{}: {} not annotated", view, fraction, landmark.kind);
            continue;
        }
        if let Some(reason) = landmark.completeness_error() {
            warn!("{} F{}: {}", view, fraction, reason);
            let missing = if landmark.tip.is_none() {
                Landmark::Tip
            } else {
                Landmark::Base
            };
            for measurement in Measurement::ALL
                .into_iter()
                .filter(|m| m.landmark() == missing)
            {
                sheet.skipped.push(
                    Skipped::new(reason.clone())
                        .applicator(landmark.kind)
                        .view(view)
                        .measurement(measurement),
                );
            }
        }
        let record = compute_distance_record(landmark, set.anatomy(), calibration, view, fraction)?;
        sheet.records.insert(landmark.kind, record);
    }
    Ok(sheet)
}
