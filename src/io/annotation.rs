use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::AnalysisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum View {
    #[serde(rename = "AP", alias = "ap")]
    Ap,
    #[serde(rename = "LAT", alias = "lat")]
    Lat,
}

impl View {
    pub const ALL: [View; 2] = [View::Ap, View::Lat];
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                View::Ap => "AP",
                View::Lat => "LAT",
            }
        )
    }
}

/// Treatment session. Exactly two are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Fraction {
    First,
    Second,
}

impl Fraction {
    pub const ALL: [Fraction; 2] = [Fraction::First, Fraction::Second];

    pub fn number(self) -> u8 {
        match self {
            Fraction::First => 1,
            Fraction::Second => 2,
        }
    }
}

impl TryFrom<u8> for Fraction {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Fraction::First),
            2 => Ok(Fraction::Second),
            other => Err(format!("fraction must be 1 or 2, got {}", other)),
        }
    }
}

impl From<Fraction> for u8 {
    fn from(fraction: Fraction) -> u8 {
        fraction.number()
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicatorType {
    Tandem,
    LeftOvoid,
    RightOvoid,
}

impl ApplicatorType {
    pub const ALL: [ApplicatorType; 3] = [
        ApplicatorType::Tandem,
        ApplicatorType::LeftOvoid,
        ApplicatorType::RightOvoid,
    ];

    /// Name used in human-readable reports.
    pub fn name(self) -> &'static str {
        match self {
            ApplicatorType::Tandem => "Tandem",
            ApplicatorType::LeftOvoid => "Left Ovoid",
            ApplicatorType::RightOvoid => "Right Ovoid",
        }
    }

    pub fn from_name(name: &str) -> Option<ApplicatorType> {
        ApplicatorType::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for ApplicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Landmark {
    Tip,
    Base,
}

impl Landmark {
    pub fn name(self) -> &'static str {
        match self {
            Landmark::Tip => "Tip",
            Landmark::Base => "Base",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnatomyEnd {
    Start,
    End,
}

impl AnatomyEnd {
    pub fn name(self) -> &'static str {
        match self {
            AnatomyEnd::Start => "Start",
            AnatomyEnd::End => "End",
        }
    }
}

/// The four named distances measured per applicator and view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measurement {
    TipToStart,
    TipToEnd,
    BaseToStart,
    BaseToEnd,
}

impl Measurement {
    pub const ALL: [Measurement; 4] = [
        Measurement::TipToStart,
        Measurement::TipToEnd,
        Measurement::BaseToStart,
        Measurement::BaseToEnd,
    ];

    pub fn new(landmark: Landmark, end: AnatomyEnd) -> Self {
        match (landmark, end) {
            (Landmark::Tip, AnatomyEnd::Start) => Measurement::TipToStart,
            (Landmark::Tip, AnatomyEnd::End) => Measurement::TipToEnd,
            (Landmark::Base, AnatomyEnd::Start) => Measurement::BaseToStart,
            (Landmark::Base, AnatomyEnd::End) => Measurement::BaseToEnd,
        }
    }

    pub fn landmark(self) -> Landmark {
        match self {
            Measurement::TipToStart | Measurement::TipToEnd => Landmark::Tip,
            Measurement::BaseToStart | Measurement::BaseToEnd => Landmark::Base,
        }
    }

    pub fn anatomy_end(self) -> AnatomyEnd {
        match self {
            Measurement::TipToStart | Measurement::BaseToStart => AnatomyEnd::Start,
            Measurement::TipToEnd | Measurement::BaseToEnd => AnatomyEnd::End,
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to Anatomy {}",
            self.landmark().name(),
            self.anatomy_end().name()
        )
    }
}

/// Pixel coordinates in one view's image space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Point2D { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Clinician-drawn polyline; only its first and last points are used.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnatomyReference {
    pub points: Vec<Point2D>,
}

impl AnatomyReference {
    pub fn new(points: Vec<Point2D>) -> Self {
        AnatomyReference { points }
    }

    pub fn is_complete(&self) -> bool {
        self.points.len() >= 2
    }

    pub fn start(&self) -> Option<Point2D> {
        if self.is_complete() {
            self.points.first().copied()
        } else {
            None
        }
    }

    pub fn end(&self) -> Option<Point2D> {
        if self.is_complete() {
            self.points.last().copied()
        } else {
            None
        }
    }

    /// Start and end of the polyline, or `IncompleteAnatomy` for fewer than two points.
    pub fn endpoints(
        &self,
        view: View,
        fraction: Fraction,
    ) -> Result<(Point2D, Point2D), AnalysisError> {
        match (self.start(), self.end()) {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(AnalysisError::IncompleteAnatomy {
                view,
                fraction,
                points: self.points.len(),
            }),
        }
    }

    pub fn endpoint(&self, end: AnatomyEnd) -> Option<Point2D> {
        match end {
            AnatomyEnd::Start => self.start(),
            AnatomyEnd::End => self.end(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ApplicatorLandmark {
    pub kind: ApplicatorType,
    pub tip: Option<Point2D>,
    pub base: Option<Point2D>,
}

impl ApplicatorLandmark {
    pub fn new(kind: ApplicatorType, tip: Option<Point2D>, base: Option<Point2D>) -> Self {
        ApplicatorLandmark { kind, tip, base }
    }

    pub fn point(&self, landmark: Landmark) -> Option<Point2D> {
        match landmark {
            Landmark::Tip => self.tip,
            Landmark::Base => self.base,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.tip.is_some() && self.base.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.tip.is_none() && self.base.is_none()
    }

    /// `IncompleteLandmark` when exactly one of tip/base was placed.
    pub fn completeness_error(&self) -> Option<AnalysisError> {
        match (self.tip, self.base) {
            (Some(_), None) => Some(AnalysisError::IncompleteLandmark {
                applicator: self.kind,
                present: "tip",
                missing: "base",
            }),
            (None, Some(_)) => Some(AnalysisError::IncompleteLandmark {
                applicator: self.kind,
                present: "base",
                missing: "tip",
            }),
            _ => None,
        }
    }
}

/// All annotations of one (View, Fraction) session.
///
/// Built once when an annotation session ends; a new session replaces the set
/// instead of patching it, so there are no mutating accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationSet {
    view: View,
    fraction: Fraction,
    anatomy: AnatomyReference,
    landmarks: BTreeMap<ApplicatorType, ApplicatorLandmark>,
}

impl AnnotationSet {
    pub fn new(
        view: View,
        fraction: Fraction,
        anatomy: AnatomyReference,
        landmarks: impl IntoIterator<Item = ApplicatorLandmark>,
    ) -> Self {
        let landmarks = landmarks.into_iter().map(|l| (l.kind, l)).collect();
        AnnotationSet {
            view,
            fraction,
            anatomy,
            landmarks,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn fraction(&self) -> Fraction {
        self.fraction
    }

    pub fn key(&self) -> (View, Fraction) {
        (self.view, self.fraction)
    }

    pub fn anatomy(&self) -> &AnatomyReference {
        &self.anatomy
    }

    pub fn landmark(&self, kind: ApplicatorType) -> Option<&ApplicatorLandmark> {
        self.landmarks.get(&kind)
    }

    /// Landmarks in applicator order.
    pub fn landmarks(&self) -> impl Iterator<Item = &ApplicatorLandmark> {
        self.landmarks.values()
    }
}
