use crate::models::Segment;
use crate::segmentation::algorithm::SegmentSeries;

/// Result of dropping excluded segments: what is kept for fitting and what
/// was removed, in table order.
pub struct ExclusionResult {
    pub retained: SegmentSeries,
    pub excluded: Vec<Segment>,
}

/// True if `name` contains any fragment as a case-sensitive substring.
pub fn is_excluded(name: &str, fragments: &[String]) -> bool {
    fragments
        .iter()
        .any(|fragment| name.contains(fragment.as_str()))
}

/// Remove every entry whose segment name contains an excluded fragment.
/// Retained entries are passed through untouched.
pub fn filter_excluded(series: SegmentSeries, fragments: &[String]) -> ExclusionResult {
    let mut retained = Vec::new();
    let mut excluded = Vec::new();

    for entry in series.into_entries() {
        if is_excluded(entry.name(), fragments) {
            excluded.push(entry.segment);
        } else {
            retained.push(entry);
        }
    }

    ExclusionResult {
        retained: SegmentSeries::from_entries(retained),
        excluded,
    }
}
