//! Stimulus segments for one recording.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// One named stimulus interval, in milliseconds from the recording start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub name: String,
    pub start_ms: f64,
    pub end_ms: f64,
}

impl Segment {
    pub fn new(name: impl Into<String>, start_ms: f64, end_ms: f64) -> Self {
        Self {
            name: name.into(),
            start_ms,
            end_ms,
        }
    }

    pub fn duration_ms(&self) -> f64 {
        self.end_ms - self.start_ms
    }
}

/// Ordered, non-overlapping segments of a single recording.
///
/// Ordering is checked once here so the segmenter can walk the table with a
/// single forward cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentTable {
    segments: Vec<Segment>,
}

impl SegmentTable {
    pub fn new(segments: Vec<Segment>) -> PipelineResult<Self> {
        if segments.is_empty() {
            return Err(PipelineError::InvalidSegmentTable(
                "table has no segments".into(),
            ));
        }

        for (idx, segment) in segments.iter().enumerate() {
            if !segment.start_ms.is_finite() || !segment.end_ms.is_finite() {
                return Err(PipelineError::InvalidSegmentTable(format!(
                    "segment {idx} (`{}`) has a non-finite bound",
                    segment.name
                )));
            }
            if segment.end_ms < segment.start_ms {
                return Err(PipelineError::InvalidSegmentTable(format!(
                    "segment {idx} (`{}`) ends at {} ms before it starts at {} ms",
                    segment.name, segment.end_ms, segment.start_ms
                )));
            }
        }

        for (idx, pair) in segments.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.start_ms < prev.start_ms {
                return Err(PipelineError::InvalidSegmentTable(format!(
                    "segment {} (`{}`) starts before segment {idx} (`{}`)",
                    idx + 1,
                    next.name,
                    prev.name
                )));
            }
            if next.start_ms < prev.end_ms {
                return Err(PipelineError::InvalidSegmentTable(format!(
                    "segment {} (`{}`) overlaps segment {idx} (`{}`)",
                    idx + 1,
                    next.name,
                    prev.name
                )));
            }
        }

        Ok(Self { segments })
    }

    /// Build from rows given in seconds, as the segment export writes them.
    pub fn from_seconds<I, S>(rows: I) -> PipelineResult<Self>
    where
        I: IntoIterator<Item = (S, f64, f64)>,
        S: Into<String>,
    {
        let segments = rows
            .into_iter()
            .map(|(name, start, end)| Segment::new(name, start * 1000.0, end * 1000.0))
            .collect();
        Self::new(segments)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    pub fn cursor(&self) -> SegmentCursor<'_> {
        SegmentCursor {
            table: self,
            position: 0,
        }
    }
}

impl<'a> IntoIterator for &'a SegmentTable {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

/// Forward-only position in a [`SegmentTable`].
#[derive(Debug, Clone)]
pub struct SegmentCursor<'a> {
    table: &'a SegmentTable,
    position: usize,
}

impl<'a> SegmentCursor<'a> {
    pub fn current(&self) -> &'a Segment {
        &self.table.segments[self.position]
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_last(&self) -> bool {
        self.position + 1 == self.table.segments.len()
    }

    /// Move to the next segment. Returns `None` when already on the last one.
    pub fn advance(&mut self) -> Option<&'a Segment> {
        if self.is_last() {
            return None;
        }
        self.position += 1;
        Some(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_are_converted_to_milliseconds() {
        let table = SegmentTable::from_seconds([("1.mp4", 0.0, 10.0), ("2.mp4", 10.0, 20.5)])
            .expect("valid table");
        let bounds: Vec<(f64, f64)> = table.iter().map(|s| (s.start_ms, s.end_ms)).collect();
        assert_eq!(bounds, vec![(0.0, 10_000.0), (10_000.0, 20_500.0)]);
    }

    #[test]
    fn rejects_out_of_order_segments() {
        let err = SegmentTable::new(vec![
            Segment::new("b", 10.0, 20.0),
            Segment::new("a", 0.0, 5.0),
        ])
        .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSegmentTable(_)));
    }

    #[test]
    fn rejects_overlapping_segments() {
        let err = SegmentTable::new(vec![
            Segment::new("a", 0.0, 15.0),
            Segment::new("b", 10.0, 20.0),
        ])
        .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSegmentTable(_)));
    }

    #[test]
    fn rejects_inverted_and_empty() {
        assert!(SegmentTable::new(vec![Segment::new("a", 5.0, 1.0)]).is_err());
        assert!(SegmentTable::new(Vec::new()).is_err());
    }

    #[test]
    fn gaps_between_segments_are_allowed() {
        let table = SegmentTable::new(vec![
            Segment::new("a", 0.0, 5.0),
            Segment::new("b", 8.0, 9.0),
        ]);
        assert!(table.is_ok());
    }

    #[test]
    fn cursor_stops_at_last_segment() {
        let table = SegmentTable::new(vec![
            Segment::new("a", 0.0, 5.0),
            Segment::new("b", 5.0, 9.0),
        ])
        .unwrap();
        let mut cursor = table.cursor();
        assert_eq!(cursor.current().name, "a");
        assert_eq!(cursor.advance().map(|s| s.name.as_str()), Some("b"));
        assert!(cursor.is_last());
        assert!(cursor.advance().is_none());
        assert_eq!(cursor.position(), 1);
    }
}
