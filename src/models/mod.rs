pub mod frame;
pub mod key;
pub mod run;
pub mod sample;
pub mod segment;

pub use frame::{format_time_ms, FrameName, FrameRecord, JoinedRecord};
pub use key::InterpolantKey;
pub use run::{RecordingRun, RunStatus};
pub use sample::Sample;
pub use segment::{Segment, SegmentCursor, SegmentTable};
