use crate::io::annotation::{
    AnatomyReference, AnnotationSet, ApplicatorLandmark, ApplicatorType, Fraction, Point2D, View,
};
use crate::processing::distances::DistanceRecord;

/// Two-point anatomy reference running from (0, 0) to (0, 100).
pub fn straight_anatomy() -> AnatomyReference {
    AnatomyReference::new(vec![Point2D::new(0.0, 0.0), Point2D::new(0.0, 100.0)])
}

/// Annotation set on top of `straight_anatomy`.
pub fn annotation_set(
    view: View,
    fraction: Fraction,
    landmarks: Vec<ApplicatorLandmark>,
) -> AnnotationSet {
    AnnotationSet::new(view, fraction, straight_anatomy(), landmarks)
}

pub fn complete_landmark(
    kind: ApplicatorType,
    tip: (f64, f64),
    base: (f64, f64),
) -> ApplicatorLandmark {
    ApplicatorLandmark::new(
        kind,
        Some(Point2D::new(tip.0, tip.1)),
        Some(Point2D::new(base.0, base.1)),
    )
}

/// Distance record with all four values set, in the order
/// tip-to-start, tip-to-end, base-to-start, base-to-end.
pub fn record(
    view: View,
    fraction: Fraction,
    applicator: ApplicatorType,
    values: [f64; 4],
) -> DistanceRecord {
    let [tip_to_start, tip_to_end, base_to_start, base_to_end] = values;
    DistanceRecord {
        view,
        fraction,
        applicator,
        tip_to_start: Some(tip_to_start),
        tip_to_end: Some(tip_to_end),
        base_to_start: Some(base_to_start),
        base_to_end: Some(base_to_end),
    }
}
