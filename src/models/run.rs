//! Audit model for one processed recording.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "Completed",
            RunStatus::Failed => "Failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingRun {
    pub run_id: String,
    pub participant: String,
    pub status: RunStatus,
    pub sample_count: u64,
    pub segment_count: u64,
    pub stored_count: u64,
    pub skipped_count: u64,
    pub error: Option<String>,
    pub processed_at: DateTime<Utc>,
}
