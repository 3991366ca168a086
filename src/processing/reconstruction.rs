//! Fusion of the AP and LAT distance records into 3-D landmark estimates.
//!
//! Axis convention, per landmark L in {tip, base}:
//!
//! ```text
//! X (left-right)          = AP  "L to Anatomy Start"
//! Y (superior-inferior)   = LAT "L to Anatomy End"
//! Z (anterior-posterior)  = LAT "L to Anatomy Start"
//! ```
//!
//! The AP "L to Anatomy End" value is a second notion of vertical position.
//! The LAT value wins; the AP value is only kept to report how far the two
//! views disagree. The fused points are good for fraction-to-fraction
//! comparison only, not as an absolute 3-D reconstruction.

use log::{debug, warn};
use nalgebra::Vector3;
use serde::Serialize;

use super::distances::DistanceRecord;
use crate::error::{AnalysisError, Skipped};
use crate::io::annotation::{AnatomyEnd, ApplicatorType, Fraction, Landmark, Measurement, View};

/// AP and LAT vertical estimates further apart than this are logged.
pub const VERTICAL_DISAGREEMENT_WARN_MM: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Point3D { x, y, z }
    }

    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn from_vector(v: Vector3<f64>) -> Self {
        Point3D::new(v.x, v.y, v.z)
    }
}

/// A fused landmark position plus how far AP and LAT disagree on Y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point3dEstimate {
    pub point: Point3D,
    pub vertical_disagreement_mm: Option<f64>,
}

/// Tip and base estimates of one applicator in one fraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconstructedApplicator {
    pub applicator: ApplicatorType,
    pub fraction: Fraction,
    pub tip: Option<Point3dEstimate>,
    pub base: Option<Point3dEstimate>,
    pub skipped: Vec<Skipped>,
}

impl ReconstructedApplicator {
    pub fn point(&self, landmark: Landmark) -> Option<Point3D> {
        match landmark {
            Landmark::Tip => self.tip.map(|e| e.point),
            Landmark::Base => self.base.map(|e| e.point),
        }
    }

    /// Mean of tip and base; `None` unless both were reconstructed.
    pub fn centroid(&self) -> Option<Point3D> {
        Some(centroid(self.point(Landmark::Tip)?, self.point(Landmark::Base)?))
    }
}

/// Arithmetic mean of two points.
pub fn centroid(tip: Point3D, base: Point3D) -> Point3D {
    Point3D::from_vector((tip.to_vector() + base.to_vector()) / 2.0)
}

fn required(
    record: Option<&DistanceRecord>,
    view: View,
    measurement: Measurement,
    applicator: ApplicatorType,
    fraction: Fraction,
) -> Result<f64, Skipped> {
    record.and_then(|r| r.get(measurement)).ok_or_else(|| {
        Skipped::new(AnalysisError::MissingCounterpartData {
            applicator,
            fraction,
            what: format!("{} {} distance", view, measurement),
        })
        .applicator(applicator)
        .view(view)
        .measurement(measurement)
    })
}

fn fuse_landmark(
    ap: Option<&DistanceRecord>,
    lat: Option<&DistanceRecord>,
    landmark: Landmark,
    applicator: ApplicatorType,
    fraction: Fraction,
) -> Result<Point3dEstimate, Vec<Skipped>> {
    let to_start = Measurement::new(landmark, AnatomyEnd::Start);
    let to_end = Measurement::new(landmark, AnatomyEnd::End);

    let x = required(ap, View::Ap, to_start, applicator, fraction);
    let y = required(lat, View::Lat, to_end, applicator, fraction);
    let z = required(lat, View::Lat, to_start, applicator, fraction);

    let (x, y, z) = match (x, y, z) {
        (Ok(x), Ok(y), Ok(z)) => (x, y, z),
        (x, y, z) => {
            return Err([x.err(), y.err(), z.err()].into_iter().flatten().collect());
        }
    };

    let vertical_disagreement_mm = ap.and_then(|r| r.get(to_end)).map(|ap_y| (ap_y - y).abs());
    if let Some(d) = vertical_disagreement_mm {
        if d > VERTICAL_DISAGREEMENT_WARN_MM {
            warn!(
                "{} F{} {}: AP and LAT vertical estimates differ by {:.2} mm, using LAT",
                applicator,
                fraction,
                landmark.name(),
                d
            );
        }
    }

    Ok(Point3dEstimate {
        point: Point3D::new(x, y, z),
        vertical_disagreement_mm,
    })
}

/// Fuses one fraction's AP and LAT records of `applicator` into 3-D tip/base points.
///
/// A landmark missing any required measurement is left out, with the
/// missing measurements listed in `skipped`.
pub fn reconstruct(
    ap: Option<&DistanceRecord>,
    lat: Option<&DistanceRecord>,
    applicator: ApplicatorType,
    fraction: Fraction,
) -> ReconstructedApplicator {
    debug_assert!(ap.map_or(true, |r| r.applicator == applicator && r.view == View::Ap));
    debug_assert!(lat.map_or(true, |r| r.applicator == applicator && r.view == View::Lat));

    let mut skipped = Vec::new();
    let mut fuse = |landmark: Landmark| {
        match fuse_landmark(ap, lat, landmark, applicator, fraction) {
            Ok(estimate) => {
                debug!(
                    "{} F{} {}: {:?}",
                    applicator,
                    fraction,
                    landmark.name(),
                    estimate.point
                );
                Some(estimate)
            }
            Err(mut missing) => {
                warn!(
                    "{} F{} {}: not reconstructed, {} measurement(s) missing",
                    applicator,
                    fraction,
                    landmark.name(),
                    missing.len()
                );
                skipped.append(&mut missing);
                None
            }
        }
    };
    let tip = fuse(Landmark::Tip);
    let base = fuse(Landmark::Base);

    ReconstructedApplicator {
        applicator,
        fraction,
        tip,
        base,
        skipped,
    }
}

/// Fixed anterior-posterior thickness between tip and base, for 3-D display only.
///
/// This is a placeholder, not a measured quantity; it never reaches the
/// displacement computations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CosmeticOffset {
    pub z_mm: f64,
}

impl CosmeticOffset {
    pub fn for_applicator(applicator: ApplicatorType) -> Self {
        match applicator {
            ApplicatorType::Tandem => CosmeticOffset { z_mm: 3.0 },
            ApplicatorType::LeftOvoid | ApplicatorType::RightOvoid => CosmeticOffset { z_mm: 2.0 },
        }
    }
}

/// Tip and base positions for drawing, base pushed back by the cosmetic offset.
pub fn visualization_segment(recon: &ReconstructedApplicator) -> Option<(Point3D, Point3D)> {
    let tip = recon.point(Landmark::Tip)?;
    let mut base = recon.point(Landmark::Base)?;
    base.z += CosmeticOffset::for_applicator(recon.applicator).z_mm;
    Some((tip, base))
}
