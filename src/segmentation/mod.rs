pub mod algorithm;
pub mod config;
pub mod exclusion;

pub use algorithm::{segment_stream, SegmentSeries, SeriesEntry};
pub use config::SegmentationConfig;
pub use exclusion::{filter_excluded, is_excluded, ExclusionResult};
