use log::{debug, warn};
use nalgebra::Vector3;
use serde::Serialize;

use super::assessment::Severity;
use super::distances::DistanceRecord;
use super::reconstruction::{Point3D, ReconstructedApplicator};
use crate::error::{AnalysisError, Skipped};
use crate::io::annotation::{ApplicatorType, Fraction, Landmark, Measurement, View};

/// Axis components smaller than this are left out of direction descriptions.
pub const DIRECTION_THRESHOLD_MM: f64 = 1.0;

/// 3-D Euclidean distance between two positions of a landmark.
pub fn point_displacement(p1: Point3D, p2: Point3D) -> f64 {
    (p2.to_vector() - p1.to_vector()).norm()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeasurementShift {
    pub measurement: Measurement,
    pub fraction1_mm: f64,
    pub fraction2_mm: f64,
    /// fraction 2 minus fraction 1
    pub shift_mm: f64,
    pub abs_shift_mm: f64,
}

/// Shifts of the named 2-D distances of one applicator in one view.
///
/// Aggregates are taken over the measurements present in both fractions
/// (intersection), so partial data lowers the denominator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectDisplacement {
    pub view: View,
    pub applicator: ApplicatorType,
    pub shifts: Vec<MeasurementShift>,
    pub average_shift_mm: f64,
    pub average_abs_shift_mm: f64,
    pub max_abs_shift_mm: f64,
    pub severity: Severity,
}

impl DirectDisplacement {
    pub fn shift(&self, measurement: Measurement) -> Option<&MeasurementShift> {
        self.shifts.iter().find(|s| s.measurement == measurement)
    }
}

fn counterpart_missing(
    applicator: ApplicatorType,
    fraction: Fraction,
    what: String,
) -> AnalysisError {
    AnalysisError::MissingCounterpartData {
        applicator,
        fraction,
        what,
    }
}

/// Compares the four named distances of two fractions without 3-D fusion.
///
/// Returns `None` when no measurement is present in both fractions; every
/// measurement left out is listed in the skip list either way.
pub fn direct_displacement(
    first: Option<&DistanceRecord>,
    second: Option<&DistanceRecord>,
    view: View,
    applicator: ApplicatorType,
) -> (Option<DirectDisplacement>, Vec<Skipped>) {
    let mut shifts = Vec::new();
    let mut skipped = Vec::new();

    for measurement in Measurement::ALL {
        let v1 = first.and_then(|r| r.get(measurement));
        let v2 = second.and_then(|r| r.get(measurement));
        match (v1, v2) {
            (Some(v1), Some(v2)) => {
                let shift_mm = v2 - v1;
                shifts.push(MeasurementShift {
                    measurement,
                    fraction1_mm: v1,
                    fraction2_mm: v2,
                    shift_mm,
                    abs_shift_mm: shift_mm.abs(),
                });
            }
            (None, None) => {}
            (v1, _) => {
                let missing = if v1.is_none() {
                    Fraction::First
                } else {
                    Fraction::Second
                };
                skipped.push(
                    Skipped::new(counterpart_missing(
                        applicator,
                        missing,
                        format!("{} {} distance", view, measurement),
                    ))
                    .applicator(applicator)
                    .view(view)
                    .measurement(measurement),
                );
            }
        }
    }

    if shifts.is_empty() {
        if first.is_some() || second.is_some() {
            let missing = if first.map_or(true, DistanceRecord::is_empty) {
                Fraction::First
            } else {
                Fraction::Second
            };
            let reason = counterpart_missing(
                applicator,
                missing,
                format!("{} measurements present in both fractions", view),
            );
            warn!("skipping direct comparison: {}", reason);
            skipped.push(Skipped::new(reason).applicator(applicator).view(view));
        }
        return (None, skipped);
    }

    let n = shifts.len() as f64;
    let average_shift_mm = shifts.iter().map(|s| s.shift_mm).sum::<f64>() / n;
    let average_abs_shift_mm = shifts.iter().map(|s| s.abs_shift_mm).sum::<f64>() / n;
    let max_abs_shift_mm = shifts.iter().map(|s| s.abs_shift_mm).fold(0.0, f64::max);
    let severity = Severity::classify(max_abs_shift_mm);

    debug!(
        "{} {}: {} measurement(s), avg {:.2} mm, avg |.| {:.2} mm, max {:.2} mm -> {}",
        view,
        applicator,
        shifts.len(),
        average_shift_mm,
        average_abs_shift_mm,
        max_abs_shift_mm,
        severity
    );

    (
        Some(DirectDisplacement {
            view,
            applicator,
            shifts,
            average_shift_mm,
            average_abs_shift_mm,
            max_abs_shift_mm,
            severity,
        }),
        skipped,
    )
}

/// Displacement of one landmark (or centroid) between fractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LandmarkShift {
    pub delta: Vector3<f64>,
    pub magnitude_mm: f64,
}

impl LandmarkShift {
    pub fn between(p1: Point3D, p2: Point3D) -> Self {
        let delta = p2.to_vector() - p1.to_vector();
        LandmarkShift {
            delta,
            magnitude_mm: point_displacement(p1, p2),
        }
    }
}

/// Displacement of one applicator between fractions from fused 3-D points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpatialDisplacement {
    pub applicator: ApplicatorType,
    pub tip: Option<LandmarkShift>,
    pub base: Option<LandmarkShift>,
    pub centroid: Option<LandmarkShift>,
    pub max_magnitude_mm: f64,
    pub severity: Severity,
    pub direction: Option<String>,
}

/// Compares two fractions' reconstructions of the same applicator.
///
/// Tip and base are compared independently; the centroid needs both in both
/// fractions. Returns `None` when neither tip nor base can be compared.
pub fn spatial_displacement(
    first: &ReconstructedApplicator,
    second: &ReconstructedApplicator,
) -> (Option<SpatialDisplacement>, Vec<Skipped>) {
    debug_assert_eq!(first.applicator, second.applicator);
    let applicator = first.applicator;
    let mut skipped = Vec::new();

    let mut compare = |p1: Option<Point3D>, p2: Option<Point3D>, what: &str| {
        if let (Some(p1), Some(p2)) = (p1, p2) {
            return Some(LandmarkShift::between(p1, p2));
        }
        for (fraction, point) in [(Fraction::First, p1), (Fraction::Second, p2)] {
            if point.is_none() {
                skipped.push(
                    Skipped::new(counterpart_missing(applicator, fraction, format!("3-D {}", what)))
                        .applicator(applicator),
                );
            }
        }
        None
    };

    let tip = compare(first.point(Landmark::Tip), second.point(Landmark::Tip), "tip");
    let base = compare(first.point(Landmark::Base), second.point(Landmark::Base), "base");
    let centroid = compare(first.centroid(), second.centroid(), "centroid");

    let magnitudes: Vec<f64> = [tip, base, centroid]
        .iter()
        .flatten()
        .map(|s| s.magnitude_mm)
        .collect();
    if tip.is_none() && base.is_none() {
        warn!("{}: no landmark reconstructed in both fractions", applicator);
        return (None, skipped);
    }

    let max_magnitude_mm = magnitudes.iter().copied().fold(0.0, f64::max);
    let severity = Severity::classify(max_magnitude_mm);
    let direction = centroid.map(|c| describe_direction(&c.delta));

    debug!(
        "{}: tip {:?} base {:?} centroid {:?} -> {}",
        applicator,
        tip.map(|s| s.magnitude_mm),
        base.map(|s| s.magnitude_mm),
        centroid.map(|s| s.magnitude_mm),
        severity
    );

    (
        Some(SpatialDisplacement {
            applicator,
            tip,
            base,
            centroid,
            max_magnitude_mm,
            severity,
            direction,
        }),
        skipped,
    )
}

/// Renders a delta as e.g. "moved 4.0 mm to the Right and 2.0 mm Superior".
///
/// +X is Right, +Y Superior, +Z Anterior.
pub fn describe_direction(delta: &Vector3<f64>) -> String {
    let axes = [
        (delta.x, "to the Right", "to the Left"),
        (delta.y, "Superior", "Inferior"),
        (delta.z, "Anterior", "Posterior"),
    ];
    let parts: Vec<String> = axes
        .iter()
        .filter(|(d, _, _)| d.abs() >= DIRECTION_THRESHOLD_MM)
        .map(|(d, pos, neg)| format!("{:.1} mm {}", d.abs(), if *d > 0.0 { pos } else { neg }))
        .collect();

    match parts.as_slice() {
        [] => format!("no directional shift of {:.1} mm or more", DIRECTION_THRESHOLD_MM),
        [one] => format!("moved {}", one),
        [init @ .., last] => format!("moved {} and {}", init.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::reconstruction::reconstruct;
    use crate::utils::test_utils::record;
    use approx::assert_relative_eq;
    use rand::Rng;

    #[test]
    fn test_single_measurement_shift() {
        let f1 = DistanceRecord::empty(View::Ap, Fraction::First, ApplicatorType::Tandem)
            .with(Measurement::TipToStart, Some(40.0));
        let f2 = DistanceRecord::empty(View::Ap, Fraction::Second, ApplicatorType::Tandem)
            .with(Measurement::TipToStart, Some(43.5));
        let (result, skipped) =
            direct_displacement(Some(&f1), Some(&f2), View::Ap, ApplicatorType::Tandem);
        let result = result.unwrap();
        let shift = result.shift(Measurement::TipToStart).unwrap();
        assert_relative_eq!(shift.shift_mm, 3.5);
        assert_relative_eq!(shift.abs_shift_mm, 3.5);
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_alternating_shift_aggregates() {
        let f1 = record(
            View::Ap,
            Fraction::First,
            ApplicatorType::Tandem,
            [40.0, 50.0, 30.0, 60.0],
        );
        let f2 = record(
            View::Ap,
            Fraction::Second,
            ApplicatorType::Tandem,
            [43.0, 47.0, 33.0, 57.0],
        );
        let (result, _) =
            direct_displacement(Some(&f1), Some(&f2), View::Ap, ApplicatorType::Tandem);
        let result = result.unwrap();
        assert_relative_eq!(result.average_shift_mm, 0.0, epsilon = 1e-12);
        assert_relative_eq!(result.average_abs_shift_mm, 3.0, epsilon = 1e-12);
        assert_relative_eq!(result.max_abs_shift_mm, 3.0, epsilon = 1e-12);
        assert_eq!(result.severity, Severity::Good);
    }

    #[test]
    fn test_average_abs_bounded_by_max() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let a: [f64; 4] = std::array::from_fn(|_| rng.random_range(0.0..100.0));
            let b: [f64; 4] = std::array::from_fn(|_| rng.random_range(0.0..100.0));
            let f1 = record(View::Lat, Fraction::First, ApplicatorType::LeftOvoid, a);
            let f2 = record(View::Lat, Fraction::Second, ApplicatorType::LeftOvoid, b);
            let (result, _) =
                direct_displacement(Some(&f1), Some(&f2), View::Lat, ApplicatorType::LeftOvoid);
            let result = result.unwrap();
            assert!(result.average_abs_shift_mm >= 0.0);
            assert!(result.average_abs_shift_mm <= result.max_abs_shift_mm + 1e-12);
        }
    }

    #[test]
    fn test_missing_second_base_uses_intersection() {
        let f1 = record(
            View::Ap,
            Fraction::First,
            ApplicatorType::RightOvoid,
            [40.0, 50.0, 30.0, 60.0],
        );
        let f2 = record(
            View::Ap,
            Fraction::Second,
            ApplicatorType::RightOvoid,
            [41.0, 52.0, 0.0, 0.0],
        )
        .with(Measurement::BaseToStart, None)
        .with(Measurement::BaseToEnd, None);
        let (result, skipped) =
            direct_displacement(Some(&f1), Some(&f2), View::Ap, ApplicatorType::RightOvoid);
        let result = result.unwrap();

        assert_eq!(result.shifts.len(), 2);
        assert!(result.shift(Measurement::BaseToStart).is_none());
        assert!(result.shift(Measurement::BaseToEnd).is_none());
        // denominator is 2, not 4
        assert_relative_eq!(result.average_abs_shift_mm, 1.5);
        assert_relative_eq!(result.max_abs_shift_mm, 2.0);

        assert_eq!(skipped.len(), 2);
        assert!(skipped.iter().all(|s| matches!(
            s.reason,
            AnalysisError::MissingCounterpartData { fraction: Fraction::Second, .. }
        )));
    }

    #[test]
    fn test_applicator_missing_in_one_fraction_is_skipped() {
        let f1 = record(View::Lat, Fraction::First, ApplicatorType::Tandem, [1.0, 2.0, 3.0, 4.0]);
        let (result, skipped) =
            direct_displacement(Some(&f1), None, View::Lat, ApplicatorType::Tandem);
        assert!(result.is_none());
        // four measurements plus the applicator itself
        assert_eq!(skipped.len(), 5);
        assert_eq!(skipped[4].measurement, None);
        assert_eq!(skipped[4].applicator, Some(ApplicatorType::Tandem));
    }

    #[test]
    fn test_absent_in_both_fractions_is_silent() {
        let (result, skipped) =
            direct_displacement(None, None, View::Ap, ApplicatorType::LeftOvoid);
        assert!(result.is_none());
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_point_displacement() {
        let d = point_displacement(Point3D::new(1.0, 2.0, 3.0), Point3D::new(4.0, 6.0, 3.0));
        assert_relative_eq!(d, 5.0);
    }

    #[test]
    fn test_lat_only_shift_gives_pure_z_centroid_displacement() {
        let ap = [40.0, 60.0, 30.0, 70.0];
        let ap1 = record(View::Ap, Fraction::First, ApplicatorType::Tandem, ap);
        let ap2 = record(View::Ap, Fraction::Second, ApplicatorType::Tandem, ap);
        let lat1 = record(
            View::Lat,
            Fraction::First,
            ApplicatorType::Tandem,
            [20.0, 58.0, 25.0, 65.0],
        );
        let lat2 = record(
            View::Lat,
            Fraction::Second,
            ApplicatorType::Tandem,
            [25.0, 58.0, 30.0, 65.0],
        );

        let r1 = reconstruct(Some(&ap1), Some(&lat1), ApplicatorType::Tandem, Fraction::First);
        let r2 = reconstruct(Some(&ap2), Some(&lat2), ApplicatorType::Tandem, Fraction::Second);
        let (result, skipped) = spatial_displacement(&r1, &r2);
        let result = result.unwrap();
        assert!(skipped.is_empty());

        let centroid = result.centroid.unwrap();
        assert_relative_eq!(centroid.delta.x, 0.0);
        assert_relative_eq!(centroid.delta.y, 0.0);
        assert_relative_eq!(centroid.delta.z, 5.0);
        assert_relative_eq!(centroid.magnitude_mm, 5.0);
        assert_eq!(result.severity, Severity::Moderate);
        assert_eq!(result.direction.as_deref(), Some("moved 5.0 mm Anterior"));
    }

    #[test]
    fn test_missing_second_base_keeps_tip_shift() {
        let ap1 = record(
            View::Ap,
            Fraction::First,
            ApplicatorType::LeftOvoid,
            [40.0, 60.0, 30.0, 70.0],
        );
        let lat1 = record(
            View::Lat,
            Fraction::First,
            ApplicatorType::LeftOvoid,
            [20.0, 58.0, 25.0, 65.0],
        );
        let ap2 = record(
            View::Ap,
            Fraction::Second,
            ApplicatorType::LeftOvoid,
            [42.0, 60.0, 0.0, 0.0],
        )
        .with(Measurement::BaseToStart, None)
        .with(Measurement::BaseToEnd, None);
        let lat2 = record(
            View::Lat,
            Fraction::Second,
            ApplicatorType::LeftOvoid,
            [20.0, 58.0, 0.0, 0.0],
        )
        .with(Measurement::BaseToStart, None)
        .with(Measurement::BaseToEnd, None);

        let r1 = reconstruct(Some(&ap1), Some(&lat1), ApplicatorType::LeftOvoid, Fraction::First);
        let r2 = reconstruct(Some(&ap2), Some(&lat2), ApplicatorType::LeftOvoid, Fraction::Second);
        let (result, skipped) = spatial_displacement(&r1, &r2);
        let result = result.unwrap();

        assert_relative_eq!(result.tip.unwrap().magnitude_mm, 2.0);
        assert!(result.base.is_none());
        assert!(result.centroid.is_none());
        assert!(result.direction.is_none());
        assert_eq!(result.severity, Severity::Excellent);
        assert_eq!(skipped.len(), 2);
    }

    #[test]
    fn test_landmark_missing_in_both_fractions_names_each_fraction() {
        let tip_only = |view, fraction, values| {
            record(view, fraction, ApplicatorType::RightOvoid, values)
                .with(Measurement::BaseToStart, None)
                .with(Measurement::BaseToEnd, None)
        };
        let r1 = reconstruct(
            Some(&tip_only(View::Ap, Fraction::First, [40.0, 60.0, 0.0, 0.0])),
            Some(&tip_only(View::Lat, Fraction::First, [20.0, 58.0, 0.0, 0.0])),
            ApplicatorType::RightOvoid,
            Fraction::First,
        );
        let r2 = reconstruct(
            Some(&tip_only(View::Ap, Fraction::Second, [41.0, 60.0, 0.0, 0.0])),
            Some(&tip_only(View::Lat, Fraction::Second, [20.0, 58.0, 0.0, 0.0])),
            ApplicatorType::RightOvoid,
            Fraction::Second,
        );
        let (result, skipped) = spatial_displacement(&r1, &r2);
        assert_relative_eq!(result.unwrap().tip.unwrap().magnitude_mm, 1.0);

        // base and centroid, once per fraction
        assert_eq!(skipped.len(), 4);
        let base_fractions: Vec<Fraction> = skipped
            .iter()
            .filter_map(|s| match &s.reason {
                AnalysisError::MissingCounterpartData { fraction, what, .. } => {
                    (what == "3-D base").then_some(*fraction)
                }
                _ => None,
            })
            .collect();
        assert_eq!(base_fractions, vec![Fraction::First, Fraction::Second]);
        assert!(skipped
            .iter()
            .all(|s| !s.to_string().contains("both fractions")));
    }

    #[test]
    fn test_describe_direction() {
        assert_eq!(
            describe_direction(&Vector3::new(4.0, 2.0, 0.3)),
            "moved 4.0 mm to the Right and 2.0 mm Superior"
        );
        assert_eq!(
            describe_direction(&Vector3::new(-1.5, -2.0, -3.3)),
            "moved 1.5 mm to the Left, 2.0 mm Inferior and 3.3 mm Posterior"
        );
        assert_eq!(
            describe_direction(&Vector3::new(0.2, -0.5, 0.9)),
            "no directional shift of 1.0 mm or more"
        );
    }
}
