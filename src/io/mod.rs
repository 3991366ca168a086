pub mod annotation;
pub mod input;
pub mod integrity_check;
pub mod output;

use anyhow::{anyhow, Context};
use log::info;
use std::path::Path;

use crate::config::Calibration;
use crate::error::Skipped;
use crate::processing::compare_distance_sheets;
use crate::processing::displacement::DirectDisplacement;
use crate::processing::distances::DistanceSheet;
use crate::session::SessionContext;
use input::{read_annotation_record, read_distance_records};

/// Builds a session from annotation record files.
///
/// A later file for the same (View, Fraction) replaces an earlier one.
pub fn load_session<P: AsRef<Path>>(
    paths: &[P],
    calibration: Calibration,
) -> anyhow::Result<SessionContext> {
    let mut ctx = SessionContext::new(calibration);
    for path in paths {
        let set = read_annotation_record(path)?;
        info!(
            "loaded {} fraction {} from {}",
            set.view(),
            set.fraction(),
            path.as_ref().display()
        );
        ctx = ctx.with_annotation_set(set);
    }
    Ok(ctx)
}

/// Direct displacement from two persisted structured distance files, one per fraction.
///
/// Views present in only one file show up as skipped applicators.
pub fn analyze_distance_files<P: AsRef<Path>>(
    first: P,
    second: P,
) -> anyhow::Result<(Vec<DirectDisplacement>, Vec<Skipped>)> {
    let first_sheets = read_distance_records(&first)
        .with_context(|| format!("fraction 1 distances {:?}", first.as_ref()))?;
    let second_sheets = read_distance_records(&second)
        .with_context(|| format!("fraction 2 distances {:?}", second.as_ref()))?;

    for (label, sheets, expected) in [
        ("first", &first_sheets, annotation::Fraction::First),
        ("second", &second_sheets, annotation::Fraction::Second),
    ] {
        if let Some(sheet) = sheets.iter().find(|s| s.fraction != expected) {
            return Err(anyhow!(
                "{} distance file holds fraction {}, expected {}",
                label,
                sheet.fraction,
                expected
            ));
        }
    }

    let mut results = Vec::new();
    let mut skipped = Vec::new();
    for view in annotation::View::ALL {
        let empty_first = DistanceSheet::new(view, annotation::Fraction::First);
        let empty_second = DistanceSheet::new(view, annotation::Fraction::Second);
        let f1 = first_sheets
            .iter()
            .find(|s| s.view == view)
            .unwrap_or(&empty_first);
        let f2 = second_sheets
            .iter()
            .find(|s| s.view == view)
            .unwrap_or(&empty_second);
        let (mut r, mut s) = compare_distance_sheets(f1, f2);
        results.append(&mut r);
        skipped.append(&mut s);
    }
    Ok((results, skipped))
}
