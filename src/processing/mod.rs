pub mod assessment;
pub mod displacement;
pub mod distances;
pub mod reconstruction;

use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::Calibration;
use crate::error::Skipped;
use crate::io::annotation::{ApplicatorType, Fraction, View};
use crate::session::SessionContext;
use assessment::Severity;
use displacement::{
    direct_displacement, spatial_displacement, DirectDisplacement, SpatialDisplacement,
};
use distances::{compute_distance_sheet, DistanceSheet};
use reconstruction::{reconstruct, ReconstructedApplicator};

/// Everything one pipeline run derives from a `SessionContext`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub calibration: Calibration,
    pub sheets: Vec<DistanceSheet>,
    pub reconstructions: Vec<ReconstructedApplicator>,
    pub direct: Vec<DirectDisplacement>,
    pub spatial: Vec<SpatialDisplacement>,
    pub skipped: Vec<Skipped>,
    pub max_displacement_mm: Option<f64>,
    pub overall_severity: Option<Severity>,
}

impl AnalysisReport {
    pub fn sheet(&self, view: View, fraction: Fraction) -> Option<&DistanceSheet> {
        self.sheets
            .iter()
            .find(|s| s.view == view && s.fraction == fraction)
    }

    pub fn direct_for(
        &self,
        view: View,
        applicator: ApplicatorType,
    ) -> Option<&DirectDisplacement> {
        self.direct
            .iter()
            .find(|d| d.view == view && d.applicator == applicator)
    }

    pub fn spatial_for(&self, applicator: ApplicatorType) -> Option<&SpatialDisplacement> {
        self.spatial.iter().find(|s| s.applicator == applicator)
    }
}

/// Direct (2-D) comparison of two fractions' sheets of the same view.
pub fn compare_distance_sheets(
    first: &DistanceSheet,
    second: &DistanceSheet,
) -> (Vec<DirectDisplacement>, Vec<Skipped>) {
    debug_assert_eq!(first.view, second.view);
    let mut results = Vec::new();
    let mut skipped = Vec::new();
    for applicator in ApplicatorType::ALL {
        let (result, mut skips) = direct_displacement(
            first.record(applicator),
            second.record(applicator),
            first.view,
            applicator,
        );
        results.extend(result);
        skipped.append(&mut skips);
    }
    (results, skipped)
}

fn max_magnitude(direct: &[DirectDisplacement], spatial: &[SpatialDisplacement]) -> Option<f64> {
    direct
        .iter()
        .map(|d| d.max_abs_shift_mm)
        .chain(spatial.iter().map(|s| s.max_magnitude_mm))
        .reduce(f64::max)
}

/// Runs the full pipeline: distance sheets, direct and spatial displacement,
/// and the overall severity. Never fails as a whole; whatever could not be
/// derived is listed in `skipped`.
pub fn analyze(ctx: &SessionContext) -> AnalysisReport {
    let calibration = *ctx.calibration();
    let mut skipped = Vec::new();

    let mut sheets: BTreeMap<(View, Fraction), DistanceSheet> = BTreeMap::new();
    for view in View::ALL {
        for fraction in Fraction::ALL {
            let Some(set) = ctx.annotation_set(view, fraction) else {
                warn!("no annotation set for {} fraction {}", view, fraction);
                continue;
            };
            match compute_distance_sheet(set, &calibration) {
                Ok(sheet) => {
                    skipped.extend(sheet.skipped.iter().cloned());
                    sheets.insert((view, fraction), sheet);
                }
                Err(e) => {
                    warn!("distance pass failed: {}", e);
                    skipped.push(Skipped::new(e).view(view));
                }
            }
        }
    }

    let mut direct = Vec::new();
    for view in View::ALL {
        let empty_first = DistanceSheet::new(view, Fraction::First);
        let empty_second = DistanceSheet::new(view, Fraction::Second);
        let first = sheets.get(&(view, Fraction::First)).unwrap_or(&empty_first);
        let second = sheets.get(&(view, Fraction::Second)).unwrap_or(&empty_second);
        let (mut results, mut skips) = compare_distance_sheets(first, second);
        direct.append(&mut results);
        skipped.append(&mut skips);
    }

    let mut reconstructions: BTreeMap<(ApplicatorType, Fraction), ReconstructedApplicator> =
        BTreeMap::new();
    for fraction in Fraction::ALL {
        for applicator in ApplicatorType::ALL {
            let ap = sheets
                .get(&(View::Ap, fraction))
                .and_then(|s| s.record(applicator));
            let lat = sheets
                .get(&(View::Lat, fraction))
                .and_then(|s| s.record(applicator));
            if ap.is_none() && lat.is_none() {
                continue;
            }
            let recon = reconstruct(ap, lat, applicator, fraction);
            skipped.extend(recon.skipped.iter().cloned());
            reconstructions.insert((applicator, fraction), recon);
        }
    }

    let mut spatial = Vec::new();
    for applicator in ApplicatorType::ALL {
        let first = reconstructions.get(&(applicator, Fraction::First));
        let second = reconstructions.get(&(applicator, Fraction::Second));
        let (Some(first), Some(second)) = (first, second) else {
            continue;
        };
        let (result, mut skips) = spatial_displacement(first, second);
        spatial.extend(result);
        skipped.append(&mut skips);
    }

    let max_displacement_mm = max_magnitude(&direct, &spatial);
    let overall_severity = max_displacement_mm.map(Severity::classify);

    info!(
        "analysis: {} sheet(s), {} direct, {} spatial result(s), {} skipped, overall {}",
        sheets.len(),
        direct.len(),
        spatial.len(),
        skipped.len(),
        overall_severity.map_or("n/a", Severity::label)
    );

    AnalysisReport {
        calibration,
        sheets: sheets.into_values().collect(),
        reconstructions: reconstructions.into_values().collect(),
        direct,
        spatial,
        skipped,
        max_displacement_mm,
        overall_severity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::io::annotation::{
        AnatomyReference, AnnotationSet, ApplicatorLandmark, Measurement, Point2D,
    };
    use crate::utils::test_utils::{annotation_set, complete_landmark, straight_anatomy};
    use approx::assert_relative_eq;

    /// Session with all three applicators in both views and fractions,
    /// fraction 2 shifting every point by `dx` pixels.
    fn shifted_session(dx: f64) -> SessionContext {
        let mut ctx = SessionContext::new(Calibration::from_values(1.0, 1.0).unwrap());
        for view in View::ALL {
            for (fraction, shift) in [(Fraction::First, 0.0), (Fraction::Second, dx)] {
                let landmarks = vec![
                    complete_landmark(
                        ApplicatorType::Tandem,
                        (20.0 + shift, 40.0),
                        (20.0 + shift, 80.0),
                    ),
                    complete_landmark(
                        ApplicatorType::LeftOvoid,
                        (30.0 + shift, 60.0),
                        (40.0 + shift, 70.0),
                    ),
                    complete_landmark(
                        ApplicatorType::RightOvoid,
                        (10.0 + shift, 60.0),
                        (5.0 + shift, 70.0),
                    ),
                ];
                ctx = ctx.with_annotation_set(annotation_set(view, fraction, landmarks));
            }
        }
        ctx
    }

    #[test]
    fn test_identical_fractions_are_excellent() {
        let report = analyze(&shifted_session(0.0));
        assert_eq!(report.sheets.len(), 4);
        assert_eq!(report.direct.len(), 6);
        assert_eq!(report.spatial.len(), 3);
        assert!(report.skipped.is_empty());
        assert_relative_eq!(report.max_displacement_mm.unwrap(), 0.0);
        assert_eq!(report.overall_severity, Some(Severity::Excellent));
    }

    #[test]
    fn test_shift_is_detected() {
        let report = analyze(&shifted_session(10.0));
        assert_eq!(report.overall_severity, Some(Severity::Significant));
        let tandem = report.spatial_for(ApplicatorType::Tandem).unwrap();
        assert!(tandem.centroid.unwrap().magnitude_mm > 0.0);
        assert!(report.direct_for(View::Ap, ApplicatorType::Tandem).is_some());
    }

    #[test]
    fn test_recalibration_rescales_results() {
        let ctx = shifted_session(2.0);
        let base = analyze(&ctx);
        let doubled = analyze(&ctx.with_calibration(Calibration::from_values(2.0, 2.0).unwrap()));
        assert_relative_eq!(
            doubled.max_displacement_mm.unwrap(),
            2.0 * base.max_displacement_mm.unwrap(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_incomplete_anatomy_only_blocks_its_view() {
        let ctx = shifted_session(0.0).with_annotation_set(AnnotationSet::new(
            View::Lat,
            Fraction::Second,
            AnatomyReference::new(vec![Point2D::new(0.0, 0.0)]),
            vec![complete_landmark(ApplicatorType::Tandem, (1.0, 1.0), (2.0, 2.0))],
        ));
        let report = analyze(&ctx);

        assert_eq!(report.sheets.len(), 3);
        assert!(report.sheet(View::Lat, Fraction::Second).is_none());
        assert!(report.skipped.iter().any(|s| matches!(
            s.reason,
            AnalysisError::IncompleteAnatomy {
                view: View::Lat,
                ..
            }
        )));
        // AP comparisons are unaffected
        assert_eq!(report.direct.iter().filter(|d| d.view == View::Ap).count(), 3);
        assert_eq!(report.direct.iter().filter(|d| d.view == View::Lat).count(), 0);
        // no LAT in fraction 2 means no 3-D comparison
        assert!(report.spatial.is_empty());
        assert!(report.overall_severity.is_some());
    }

    #[test]
    fn test_partial_landmark_flows_into_skip_list() {
        let ctx = shifted_session(0.0).with_annotation_set(annotation_set(
            View::Ap,
            Fraction::Second,
            vec![
                complete_landmark(ApplicatorType::Tandem, (20.0, 40.0), (20.0, 80.0)),
                complete_landmark(ApplicatorType::LeftOvoid, (30.0, 60.0), (40.0, 70.0)),
                ApplicatorLandmark::new(
                    ApplicatorType::RightOvoid,
                    Some(Point2D::new(10.0, 60.0)),
                    None,
                ),
            ],
        ));
        let report = analyze(&ctx);

        let right_ap = report.direct_for(View::Ap, ApplicatorType::RightOvoid).unwrap();
        assert_eq!(right_ap.shifts.len(), 2);
        assert!(right_ap.shift(Measurement::TipToStart).is_some());
        assert!(right_ap.shift(Measurement::BaseToStart).is_none());

        let right = report.spatial_for(ApplicatorType::RightOvoid).unwrap();
        assert!(right.tip.is_some());
        assert!(right.base.is_none());
        assert!(right.centroid.is_none());

        assert!(report.skipped.iter().any(|s| matches!(
            s.reason,
            AnalysisError::IncompleteLandmark {
                applicator: ApplicatorType::RightOvoid,
                ..
            }
        )));
    }

    #[test]
    fn test_compare_distance_sheets() {
        let calibration = Calibration::default();
        let f1 = compute_distance_sheet(
            &annotation_set(
                View::Ap,
                Fraction::First,
                vec![complete_landmark(ApplicatorType::Tandem, (20.0, 40.0), (20.0, 80.0))],
            ),
            &calibration,
        )
        .unwrap();
        let f2 = compute_distance_sheet(
            &AnnotationSet::new(
                View::Ap,
                Fraction::Second,
                straight_anatomy(),
                vec![complete_landmark(ApplicatorType::LeftOvoid, (20.0, 40.0), (20.0, 80.0))],
            ),
            &calibration,
        )
        .unwrap();
        let (results, skipped) = compare_distance_sheets(&f1, &f2);
        assert!(results.is_empty());
        // four measurements + applicator, for each of tandem and left ovoid
        assert_eq!(skipped.len(), 10);
    }

    #[test]
    fn test_direct_results_follow_sheet_comparison() {
        let ctx = shifted_session(3.0).with_annotation_set(AnnotationSet::new(
            View::Lat,
            Fraction::Second,
            AnatomyReference::new(Vec::new()),
            Vec::new(),
        ));
        let report = analyze(&ctx);

        let (ap, ap_skips) = compare_distance_sheets(
            report.sheet(View::Ap, Fraction::First).unwrap(),
            report.sheet(View::Ap, Fraction::Second).unwrap(),
        );
        assert!(ap_skips.is_empty());
        assert_eq!(report.direct, ap);

        // a view missing one fraction compares against an empty sheet
        let (lat, lat_skips) = compare_distance_sheets(
            report.sheet(View::Lat, Fraction::First).unwrap(),
            &DistanceSheet::new(View::Lat, Fraction::Second),
        );
        assert!(lat.is_empty());
        assert_eq!(lat_skips.len(), 15);
        assert!(lat_skips.iter().all(|s| report.skipped.contains(s)));
    }
}
