use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::annotation::{
    AnatomyReference, AnnotationSet, ApplicatorLandmark, ApplicatorType, Fraction, Measurement,
    Point2D, View,
};
use super::integrity_check::check_annotation_integrity;
use crate::processing::distances::{DistanceRecord, DistanceSheet};

/// Raw annotation record as written by the annotation UI, one per (View, Fraction).
///
/// ```text
/// {"view": "AP", "fraction": 1,
///  "anatomy": [{"x": 10.0, "y": 20.0}, {"x": 40.0, "y": 80.0}],
///  "applicators": {"tandem": {"tip": {"x": 1.0, "y": 2.0}, "base": null}}}
/// ```
///
/// Applicator keys outside tandem / left_ovoid / right_ovoid are rejected.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnnotationRecord {
    pub view: View,
    pub fraction: Fraction,
    #[serde(default)]
    pub anatomy: Vec<Point2D>,
    #[serde(default)]
    pub applicators: BTreeMap<ApplicatorType, LandmarkRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct LandmarkRecord {
    #[serde(default)]
    pub tip: Option<Point2D>,
    #[serde(default)]
    pub base: Option<Point2D>,
}

impl From<AnnotationRecord> for AnnotationSet {
    fn from(record: AnnotationRecord) -> Self {
        AnnotationSet::new(
            record.view,
            record.fraction,
            AnatomyReference::new(record.anatomy),
            record
                .applicators
                .into_iter()
                .map(|(kind, l)| ApplicatorLandmark::new(kind, l.tip, l.base)),
        )
    }
}

pub fn parse_annotation_record(text: &str) -> Result<AnnotationSet> {
    let record: AnnotationRecord =
        serde_json::from_str(text).context("failed to parse annotation record")?;
    let set = AnnotationSet::from(record);
    check_annotation_integrity(&set)?;
    Ok(set)
}

/// Reads and checks one annotation record file.
pub fn read_annotation_record<P: AsRef<Path>>(path: P) -> Result<AnnotationSet> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to open annotation record {:?}", path))?;
    parse_annotation_record(&text).with_context(|| format!("reading {}", path.display()))
}

/// Utility: detect whether the file uses comma or tab as delimiter.
fn detect_delimiter<P: AsRef<Path>>(path: P) -> Result<u8> {
    let file = File::open(&path).with_context(|| {
        format!(
            "failed to open file for delimiter sniffing: {:?}",
            path.as_ref()
        )
    })?;
    let mut reader = BufReader::new(file);
    let mut first_line = String::new();
    reader
        .read_line(&mut first_line)
        .with_context(|| "failed to read first line for delimiter detection")?;

    let tabs = first_line.matches('\t').count();
    let commas = first_line.matches(',').count();

    if tabs > commas {
        Ok(b'\t')
    } else {
        Ok(b',')
    }
}

/// One row of the structured distance file.
///
/// ```text
/// view,fraction,applicator,measurement,value_mm
/// AP,1,tandem,tip_to_start,40.0
/// AP,1,tandem,base_to_start,
/// ```
///
/// An empty `value_mm` is an absent measurement.
#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
pub struct DistanceRow {
    pub view: View,
    pub fraction: Fraction,
    pub applicator: ApplicatorType,
    pub measurement: Measurement,
    pub value_mm: Option<f64>,
}

/// Groups rows into one sheet per (View, Fraction), in key order.
pub fn sheets_from_rows(rows: impl IntoIterator<Item = DistanceRow>) -> Vec<DistanceSheet> {
    let mut records: BTreeMap<(View, Fraction), BTreeMap<ApplicatorType, DistanceRecord>> =
        BTreeMap::new();
    for row in rows {
        let record = records
            .entry((row.view, row.fraction))
            .or_default()
            .entry(row.applicator)
            .or_insert_with(|| DistanceRecord::empty(row.view, row.fraction, row.applicator));
        *record = record.with(row.measurement, row.value_mm);
    }
    records
        .into_iter()
        .map(|((view, fraction), by_applicator)| {
            DistanceSheet::from_records(view, fraction, by_applicator.into_values())
        })
        .collect()
}

/// Reads a structured distance file written by `write_distance_records`.
pub fn read_distance_records<P: AsRef<Path>>(path: P) -> Result<Vec<DistanceSheet>> {
    let path = path.as_ref();
    let delim = detect_delimiter(path)?;
    let file = File::open(path)
        .with_context(|| format!("failed to open distance records {:?}", path))?;
    let mut reader = ReaderBuilder::new()
        .delimiter(delim)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut rows = Vec::new();
    for (i, result) in reader.deserialize().enumerate() {
        let row: DistanceRow =
            result.with_context(|| format!("invalid distance row {} in {:?}", i + 1, path))?;
        rows.push(row);
    }
    Ok(sheets_from_rows(rows))
}

fn parse_report_line(line: &str) -> Result<Option<(ApplicatorType, Measurement, Option<f64>)>> {
    let Some((label, value)) = line.split_once(':') else {
        return Ok(None);
    };
    let label = label.trim();
    let Some((applicator, rest)) = ApplicatorType::ALL.into_iter().find_map(|a| {
        label
            .strip_prefix(a.name())
            .filter(|rest| rest.starts_with(' '))
            .map(|rest| (a, rest.trim()))
    }) else {
        return Ok(None);
    };
    let Some(measurement) = Measurement::ALL
        .into_iter()
        .find(|m| m.to_string() == rest)
    else {
        return Ok(None);
    };

    let value = value.trim();
    if value.eq_ignore_ascii_case("not available") {
        return Ok(Some((applicator, measurement, None)));
    }
    let number = value
        .strip_suffix("mm")
        .ok_or_else(|| anyhow!("expected '<value> mm', got '{}'", value))?
        .trim()
        .parse::<f64>()
        .with_context(|| format!("invalid distance value '{}'", value))?;
    Ok(Some((applicator, measurement, Some(number))))
}

/// Parses the human-readable distance report of one (View, Fraction).
///
/// Only lines matching `"<Applicator> <Tip|Base> to Anatomy <Start|End>: <value> mm"`
/// or `"...: not available"` are read; headers and other text are ignored.
pub fn parse_distance_report(text: &str, view: View, fraction: Fraction) -> Result<DistanceSheet> {
    let mut rows = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let parsed = parse_report_line(line).with_context(|| format!("line {}", n + 1))?;
        if let Some((applicator, measurement, value_mm)) = parsed {
            rows.push(DistanceRow {
                view,
                fraction,
                applicator,
                measurement,
                value_mm,
            });
        }
    }
    Ok(sheets_from_rows(rows)
        .into_iter()
        .next()
        .unwrap_or_else(|| DistanceSheet::new(view, fraction)))
}

pub fn read_distance_report<P: AsRef<Path>>(
    path: P,
    view: View,
    fraction: Fraction,
) -> Result<DistanceSheet> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to open distance report {:?}", path))?;
    parse_distance_report(&text, view, fraction).with_context(|| format!("in {:?}", path))
}
