use std::collections::BTreeMap;

use crate::config::Calibration;
use crate::io::annotation::{AnnotationSet, Fraction, View};

/// Immutable snapshot of everything a pipeline run reads.
///
/// Updates return a new context, so a re-run after a corrected annotation never
/// mixes stale and fresh values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionContext {
    calibration: Calibration,
    annotations: BTreeMap<(View, Fraction), AnnotationSet>,
}

impl SessionContext {
    pub fn new(calibration: Calibration) -> Self {
        SessionContext {
            calibration,
            annotations: BTreeMap::new(),
        }
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn annotation_set(&self, view: View, fraction: Fraction) -> Option<&AnnotationSet> {
        self.annotations.get(&(view, fraction))
    }

    pub fn annotation_sets(&self) -> impl Iterator<Item = &AnnotationSet> {
        self.annotations.values()
    }

    pub fn with_calibration(&self, calibration: Calibration) -> Self {
        SessionContext {
            calibration,
            annotations: self.annotations.clone(),
        }
    }

    /// Replaces the set stored under the same (View, Fraction) wholesale.
    pub fn with_annotation_set(&self, set: AnnotationSet) -> Self {
        let mut annotations = self.annotations.clone();
        annotations.insert(set.key(), set);
        SessionContext {
            calibration: self.calibration,
            annotations,
        }
    }
}
