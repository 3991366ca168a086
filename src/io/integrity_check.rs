use anyhow::{anyhow, Result};
use log::warn;

use super::annotation::{AnnotationSet, Point2D};

/// Structural checks on a freshly loaded annotation set.
///
/// Incomplete anatomy and partial landmarks are *not* errors here; the
/// distance pass reports those as skips.
pub fn check_annotation_integrity(set: &AnnotationSet) -> Result<()> {
    let checks: &[(&str, fn(&AnnotationSet) -> Result<()>)] = &[
        ("check_finite_coordinates", check_finite_coordinates),
        ("check_anatomy_not_degenerate", check_anatomy_not_degenerate),
        ("check_tip_base_distinct", check_tip_base_distinct),
    ];

    for (name, f) in checks {
        if let Err(e) = f(set) {
            warn!(
                "Integrity check '{}' failed for {} fraction {}: {}",
                name,
                set.view(),
                set.fraction(),
                e
            );
            return Err(e);
        }
    }

    Ok(())
}

/// Every placed point must have finite coordinates
fn check_finite_coordinates(set: &AnnotationSet) -> Result<()> {
    for (i, p) in set.anatomy().points.iter().enumerate() {
        if !p.is_finite() {
            return Err(anyhow!(
                "Anatomy point {} has non-finite coordinates {:?}",
                i,
                p
            ));
        }
    }
    for landmark in set.landmarks() {
        for (which, point) in [("tip", landmark.tip), ("base", landmark.base)] {
            if let Some(p) = point {
                if !p.is_finite() {
                    return Err(anyhow!(
                        "{} {} has non-finite coordinates {:?}",
                        landmark.kind,
                        which,
                        p
                    ));
                }
            }
        }
    }
    Ok(())
}

/// A complete anatomy reference must not start and end on the same point
fn check_anatomy_not_degenerate(set: &AnnotationSet) -> Result<()> {
    let anatomy = set.anatomy();
    if let (Some(start), Some(end)) = (anatomy.start(), anatomy.end()) {
        if points_coincide(start, end) {
            return Err(anyhow!(
                "Anatomy start and end coincide at {:?} ({} points)",
                start,
                anatomy.points.len()
            ));
        }
    }
    Ok(())
}

/// Tip and base of one applicator must be different points
fn check_tip_base_distinct(set: &AnnotationSet) -> Result<()> {
    for landmark in set.landmarks() {
        if let (Some(tip), Some(base)) = (landmark.tip, landmark.base) {
            if points_coincide(tip, base) {
                return Err(anyhow!(
                    "{} tip and base are the same point {:?}",
                    landmark.kind,
                    tip
                ));
            }
        }
    }
    Ok(())
}

fn points_coincide(a: Point2D, b: Point2D) -> bool {
    const EPSILON: f64 = 1e-9;
    (a.x - b.x).abs() < EPSILON && (a.y - b.y).abs() < EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::annotation::{
        AnatomyReference, ApplicatorLandmark, ApplicatorType, Fraction, View,
    };
    use crate::utils::test_utils::{annotation_set, complete_landmark};

    #[test]
    fn test_valid_set() {
        let set = annotation_set(
            View::Ap,
            Fraction::First,
            vec![complete_landmark(ApplicatorType::Tandem, (1.0, 2.0), (3.0, 4.0))],
        );
        assert!(check_annotation_integrity(&set).is_ok());
    }

    #[test]
    fn test_incomplete_anatomy_is_not_an_integrity_error() {
        let set = AnnotationSet::new(
            View::Lat,
            Fraction::Second,
            AnatomyReference::new(vec![Point2D::new(1.0, 1.0)]),
            vec![ApplicatorLandmark::new(
                ApplicatorType::Tandem,
                Some(Point2D::new(1.0, 2.0)),
                None,
            )],
        );
        assert!(check_annotation_integrity(&set).is_ok());
    }

    #[test]
    fn test_nan_coordinate() {
        let set = annotation_set(
            View::Ap,
            Fraction::First,
            vec![ApplicatorLandmark::new(
                ApplicatorType::LeftOvoid,
                Some(Point2D::new(f64::NAN, 2.0)),
                None,
            )],
        );
        let result = check_annotation_integrity(&set);
        assert!(result.unwrap_err().to_string().contains("non-finite"));
    }

    #[test]
    fn test_degenerate_anatomy() {
        let set = AnnotationSet::new(
            View::Ap,
            Fraction::First,
            AnatomyReference::new(vec![
                Point2D::new(4.0, 4.0),
                Point2D::new(9.0, 30.0),
                Point2D::new(4.0, 4.0),
            ]),
            Vec::new(),
        );
        let result = check_annotation_integrity(&set);
        assert!(result.unwrap_err().to_string().contains("coincide"));
    }

    #[test]
    fn test_tip_equals_base() {
        let set = annotation_set(
            View::Lat,
            Fraction::First,
            vec![complete_landmark(ApplicatorType::RightOvoid, (5.0, 5.0), (5.0, 5.0))],
        );
        let result = check_annotation_integrity(&set);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Right Ovoid tip and base are the same point"));
    }
}
