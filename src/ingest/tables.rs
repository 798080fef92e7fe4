//! CSV readers for the segment table, the sample stream and frame times.
//!
//! Row numbers in errors count data rows from 1, the header excluded.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{PipelineError, PipelineResult};
use crate::models::{Sample, SegmentTable};

#[derive(Debug, Deserialize)]
struct SegmentRow {
    #[serde(rename = "segmentName")]
    name: String,
    /// Seconds.
    #[serde(rename = "segmentStart")]
    start: f64,
    /// Seconds.
    #[serde(rename = "segmentEnd")]
    end: f64,
}

#[derive(Debug, Deserialize)]
struct SampleRow {
    times: f64,
    diameters: f64,
}

#[derive(Debug, Deserialize)]
struct TimeRow {
    times: f64,
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> PipelineResult<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|err| PipelineError::csv(path, err))?;

    let mut rows = Vec::new();
    for (idx, result) in reader.deserialize::<T>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(err) if err.is_io_error() => return Err(PipelineError::csv(path, err)),
            Err(err) => return Err(PipelineError::malformed(path, idx + 1, err.to_string())),
        }
    }
    Ok(rows)
}

fn require_finite(path: &Path, row: usize, column: &str, value: f64) -> PipelineResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PipelineError::malformed(
            path,
            row,
            format!("`{column}` is not a finite number ({value})"),
        ))
    }
}

/// Segment table with `segmentName, segmentStart, segmentEnd` in seconds.
pub fn read_segment_table(path: &Path) -> PipelineResult<SegmentTable> {
    let rows: Vec<SegmentRow> = read_rows(path)?;
    let mut triples = Vec::with_capacity(rows.len());
    for (idx, row) in rows.into_iter().enumerate() {
        let start = require_finite(path, idx + 1, "segmentStart", row.start)?;
        let end = require_finite(path, idx + 1, "segmentEnd", row.end)?;
        triples.push((row.name, start, end));
    }
    SegmentTable::from_seconds(triples)
}

/// Sample stream with `times` (ms) and `diameters`, in file order.
pub fn read_samples(path: &Path) -> PipelineResult<Vec<Sample>> {
    let rows: Vec<SampleRow> = read_rows(path)?;
    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| {
            let time = require_finite(path, idx + 1, "times", row.times)?;
            let value = require_finite(path, idx + 1, "diameters", row.diameters)?;
            Ok(Sample::new(time, value))
        })
        .collect()
}

/// Frame timestamps from a single `times` column (ms).
pub fn read_frame_times(path: &Path) -> PipelineResult<Vec<f64>> {
    let rows: Vec<TimeRow> = read_rows(path)?;
    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| require_finite(path, idx + 1, "times", row.times))
        .collect()
}
