pub mod frames;
pub mod recordings;
pub mod tables;

pub use frames::{load_frame_records, FrameLoadOptions, FrameSource};
pub use recordings::{DirectoryRecordingSource, Recording, RecordingSource};
pub use tables::{read_frame_times, read_samples, read_segment_table};
