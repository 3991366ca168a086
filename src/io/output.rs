use anyhow::Context;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use super::annotation::{Measurement, View};
use super::input::DistanceRow;
use crate::processing::distances::DistanceSheet;
use crate::processing::AnalysisReport;

fn create_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Could not create output directory: {:?}", parent))?;
        }
    }
    Ok(())
}

/// Rows of the structured distance file, four per record, absent values included.
pub fn distance_rows(sheets: &[DistanceSheet]) -> Vec<DistanceRow> {
    sheets
        .iter()
        .flat_map(|sheet| sheet.records.values())
        .flat_map(|record| {
            Measurement::ALL.into_iter().map(move |measurement| DistanceRow {
                view: record.view,
                fraction: record.fraction,
                applicator: record.applicator,
                measurement,
                value_mm: record.get(measurement),
            })
        })
        .collect()
}

/// Writes the structured (CSV) distance file read back by `read_distance_records`.
pub fn write_distance_records<P: AsRef<Path>>(
    path: P,
    sheets: &[DistanceSheet],
) -> anyhow::Result<()> {
    let path = path.as_ref();
    create_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create distance file {:?}", path))?;
    for row in distance_rows(sheets) {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn view_title(view: View) -> &'static str {
    match view {
        View::Ap => "AP View",
        View::Lat => "LAT View",
    }
}

/// Human-readable distance report of one sheet.
///
/// ```text
/// AP View - Fraction 1
///
/// Tandem Tip to Anatomy Start: 40.00 mm
/// Tandem Base to Anatomy Start: not available
/// ```
pub fn render_distance_report(sheet: &DistanceSheet) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} - Fraction {}", view_title(sheet.view), sheet.fraction);
    for record in sheet.records.values() {
        let _ = writeln!(out);
        for measurement in Measurement::ALL {
            let label = format!("{} {}", record.applicator, measurement);
            let _ = match record.get(measurement) {
                Some(value) => writeln!(out, "{}: {:.2} mm", label, value),
                None => writeln!(out, "{}: not available", label),
            };
        }
    }
    out
}

pub fn write_distance_report<P: AsRef<Path>>(
    path: P,
    sheet: &DistanceSheet,
) -> anyhow::Result<()> {
    let path = path.as_ref();
    create_parent_dir(path)?;
    let file = File::create(path)
        .with_context(|| format!("failed to create distance report {:?}", path))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(render_distance_report(sheet).as_bytes())?;
    writer.flush()?;
    Ok(())
}

fn format_magnitude(magnitude_mm: Option<f64>) -> String {
    magnitude_mm.map_or("n/a".to_string(), |v| format!("{:.2} mm", v))
}

/// Plain-text summary of a pipeline run for the reporting layer.
pub fn render_analysis_report(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Calibration: AP {}, LAT {}",
        report.calibration.ap, report.calibration.lat
    );

    if !report.direct.is_empty() {
        let _ = writeln!(out, "\nDistance shifts (fraction 2 - fraction 1):");
    }
    for d in &report.direct {
        let _ = writeln!(
            out,
            "  {} {}: avg {:+.2} mm, avg |shift| {:.2} mm, max |shift| {:.2} mm (n={}) -> {}",
            d.view,
            d.applicator,
            d.average_shift_mm,
            d.average_abs_shift_mm,
            d.max_abs_shift_mm,
            d.shifts.len(),
            d.severity
        );
    }

    if !report.spatial.is_empty() {
        let _ = writeln!(out, "\n3-D displacement:");
    }
    for s in &report.spatial {
        let _ = writeln!(
            out,
            "  {}: tip {}, base {}, centroid {} -> {}",
            s.applicator,
            format_magnitude(s.tip.map(|t| t.magnitude_mm)),
            format_magnitude(s.base.map(|b| b.magnitude_mm)),
            format_magnitude(s.centroid.map(|c| c.magnitude_mm)),
            s.severity
        );
        if let Some(direction) = &s.direction {
            let _ = writeln!(out, "    {}", direction);
        }
    }

    match (report.max_displacement_mm, report.overall_severity) {
        (Some(max), Some(severity)) => {
            let _ = writeln!(out, "\nMaximum displacement: {:.2} mm ({})", max, severity);
            let _ = writeln!(out, "{}", severity.recommendation());
        }
        _ => {
            let _ = writeln!(out, "\nNo displacement could be computed.");
        }
    }

    if !report.skipped.is_empty() {
        let _ = writeln!(out, "\nNot evaluated:");
        for s in &report.skipped {
            let _ = writeln!(out, "  {}", s);
        }
    }
    out
}

pub fn write_analysis_json<P: AsRef<Path>>(
    path: P,
    report: &AnalysisReport,
) -> anyhow::Result<()> {
    let path = path.as_ref();
    create_parent_dir(path)?;
    let file = File::create(path)
        .with_context(|| format!("failed to create analysis report {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)
        .context("failed to serialize analysis report")?;
    writer
        .flush()
        .with_context(|| format!("failed to flush analysis report {:?}", path))?;
    Ok(())
}
