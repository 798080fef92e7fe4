//! Error types for the segmentation, fitting and join stages.
//!
//! Component functions return [`PipelineResult`]. The database layer and the
//! batch orchestration work in `anyhow::Result` and wrap these with context.

use std::path::PathBuf;

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A table or stream row could not be parsed. Fatal for the current
    /// recording only.
    #[error("malformed input in `{path}` (row {row}): {message}")]
    MalformedInput {
        path: PathBuf,
        row: usize,
        message: String,
    },

    /// Segment rows parsed but violate ordering or overlap rules.
    #[error("invalid segment table: {0}")]
    InvalidSegmentTable(String),

    /// A sample lies beyond the end of the last segment.
    #[error("sample at {time_ms} ms is past `{last_segment}`, which ends at {last_end_ms} ms")]
    SegmentOverflow {
        time_ms: f64,
        last_segment: String,
        last_end_ms: f64,
    },

    /// Fewer than two usable points to build an interpolant.
    #[error("insufficient data for segment `{segment}`: {reason}")]
    InsufficientData { segment: String, reason: String },

    #[error("no interpolant stored for participant `{participant}`, emotion `{emotion}`")]
    NotFound {
        participant: String,
        emotion: String,
    },

    #[error("invalid value for `{field}`: {reason}")]
    Config { field: &'static str, reason: String },

    #[error("I/O error at `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in `{path}`: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn malformed<S: Into<String>>(path: impl Into<PathBuf>, row: usize, msg: S) -> Self {
        PipelineError::MalformedInput {
            path: path.into(),
            row,
            message: msg.into(),
        }
    }

    pub fn insufficient<S: Into<String>, R: Into<String>>(segment: S, reason: R) -> Self {
        PipelineError::InsufficientData {
            segment: segment.into(),
            reason: reason.into(),
        }
    }

    pub fn config<S: Into<String>>(field: &'static str, reason: S) -> Self {
        PipelineError::Config {
            field,
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        PipelineError::Csv {
            path: path.into(),
            source,
        }
    }

    /// Recording-fatal errors abort the recording; the others only skip
    /// the affected segment or join group.
    pub fn is_recording_fatal(&self) -> bool {
        !matches!(
            self,
            PipelineError::InsufficientData { .. } | PipelineError::NotFound { .. }
        )
    }
}

/// Why a spline could not be fitted to a set of points.
#[derive(Debug, Error, PartialEq)]
pub enum FitError {
    #[error("need at least 2 points, got {count}")]
    TooFewPoints { count: usize },

    #[error("{times} times but {values} values")]
    LengthMismatch { times: usize, values: usize },

    #[error("non-finite point at index {index}")]
    NonFinite { index: usize },

    #[error("times not strictly increasing at index {index}")]
    NotIncreasing { index: usize },
}
