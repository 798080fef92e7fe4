use crate::error::{PipelineError, PipelineResult};
use crate::models::{Sample, Segment, SegmentTable};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Samples attributed to one segment, timed relative to the segment start.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesEntry {
    pub segment: Segment,
    pub relative_times: Vec<f64>,
    pub values: Vec<f64>,
}

impl SeriesEntry {
    fn open(segment: &Segment) -> Self {
        Self {
            segment: segment.clone(),
            relative_times: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.segment.name
    }

    pub fn len(&self) -> usize {
        self.relative_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relative_times.is_empty()
    }

    fn push(&mut self, sample: &Sample) {
        self.relative_times
            .push(sample.time_ms - self.segment.start_ms);
        self.values.push(sample.value);
    }
}

/// Per-segment series for one recording, in table order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentSeries {
    entries: Vec<SeriesEntry>,
}

impl SegmentSeries {
    pub fn from_entries(entries: Vec<SeriesEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[SeriesEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<SeriesEntry> {
        self.entries
    }

    /// First entry carrying `name`.
    pub fn get(&self, name: &str) -> Option<&SeriesEntry> {
        self.entries.iter().find(|entry| entry.name() == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_points(&self) -> usize {
        self.entries.iter().map(SeriesEntry::len).sum()
    }
}

/// Split a time-ordered sample stream into per-segment series.
///
/// One forward pass: the cursor only advances when a sample's time exceeds
/// the current segment's end, so a sample exactly on a boundary belongs to
/// the earlier segment. Segments the cursor steps over get empty entries,
/// and segments after the last sample are still opened so the result
/// mirrors the table. A sample past the last segment's end is an error.
pub fn segment_stream(samples: &[Sample], table: &SegmentTable) -> PipelineResult<SegmentSeries> {
    let mut cursor = table.cursor();
    let mut entries = Vec::with_capacity(table.len());
    entries.push(SeriesEntry::open(cursor.current()));

    for sample in samples {
        while sample.time_ms > cursor.current().end_ms {
            let last = cursor.current();
            match cursor.advance() {
                Some(next) => entries.push(SeriesEntry::open(next)),
                None => {
                    return Err(PipelineError::SegmentOverflow {
                        time_ms: sample.time_ms,
                        last_segment: last.name.clone(),
                        last_end_ms: last.end_ms,
                    })
                }
            }
        }

        // The loop above always leaves the entry for the cursor's segment last.
        if let Some(entry) = entries.last_mut() {
            entry.push(sample);
        }
    }

    while let Some(next) = cursor.advance() {
        entries.push(SeriesEntry::open(next));
    }

    log_debug!(
        "segmented {} samples into {} segments",
        samples.len(),
        entries.len()
    );

    Ok(SegmentSeries { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn table(rows: &[(&str, f64, f64)]) -> SegmentTable {
        SegmentTable::new(
            rows.iter()
                .map(|(name, start, end)| Segment::new(*name, *start, *end))
                .collect(),
        )
        .unwrap()
    }

    fn samples(times: &[f64]) -> Vec<Sample> {
        times.iter().map(|&t| Sample::new(t, t / 10.0)).collect()
    }

    #[test]
    fn boundary_sample_stays_in_earlier_segment() {
        let table = table(&[("a", 0.0, 100.0), ("b", 100.0, 200.0)]);
        let series = segment_stream(&samples(&[50.0, 100.0, 150.0]), &table).unwrap();

        assert_eq!(series.get("a").unwrap().relative_times, vec![50.0, 100.0]);
        assert_eq!(series.get("b").unwrap().relative_times, vec![50.0]);
    }

    #[test]
    fn relative_times_subtract_segment_start() {
        let table = table(&[("a", 1000.0, 2000.0)]);
        let series = segment_stream(&samples(&[1250.0, 1500.5]), &table).unwrap();
        let entry = series.get("a").unwrap();
        assert_abs_diff_eq!(entry.relative_times[0], 250.0);
        assert_abs_diff_eq!(entry.relative_times[1], 500.5);
        assert_eq!(entry.values, vec![125.0, 150.05]);
    }

    #[test]
    fn skipped_segments_yield_empty_entries() {
        let table = table(&[("a", 0.0, 10.0), ("b", 10.0, 20.0), ("c", 20.0, 30.0)]);
        let series = segment_stream(&samples(&[5.0, 25.0]), &table).unwrap();

        let lens: Vec<usize> = series.entries().iter().map(SeriesEntry::len).collect();
        assert_eq!(lens, vec![1, 0, 1]);
    }

    #[test]
    fn trailing_segments_are_opened() {
        let table = table(&[("a", 0.0, 10.0), ("b", 10.0, 20.0)]);
        let series = segment_stream(&samples(&[1.0]), &table).unwrap();
        assert_eq!(series.len(), 2);
        assert!(series.get("b").unwrap().is_empty());
    }

    #[test]
    fn sample_past_last_segment_overflows() {
        let table = table(&[("a", 0.0, 10.0)]);
        let err = segment_stream(&samples(&[5.0, 11.0]), &table).unwrap_err();
        match err {
            PipelineError::SegmentOverflow {
                time_ms,
                last_segment,
                last_end_ms,
            } => {
                assert_eq!(time_ms, 11.0);
                assert_eq!(last_segment, "a");
                assert_eq!(last_end_ms, 10.0);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn empty_stream_gives_empty_entries() {
        let table = table(&[("a", 0.0, 10.0), ("b", 10.0, 20.0)]);
        let series = segment_stream(&[], &table).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.total_points(), 0);
    }

    #[test]
    fn repeated_names_keep_separate_entries() {
        let table = table(&[
            ("transition", 0.0, 10.0),
            ("1.mp4", 10.0, 20.0),
            ("transition", 20.0, 30.0),
        ]);
        let series = segment_stream(&samples(&[5.0, 15.0, 25.0, 26.0]), &table).unwrap();
        let lens: Vec<usize> = series.entries().iter().map(SeriesEntry::len).collect();
        assert_eq!(lens, vec![1, 1, 2]);
    }
}
