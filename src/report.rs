//! Structured record of everything the pipeline dropped.
//!
//! Individual skips never raise, but each one is logged where it happens and
//! collected here so the totals are visible at the end of a run.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::RecordingRun;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Fit,
    Join,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    ExcludedSegment,
    UnmappedSegment,
    InsufficientData,
    MissingInterpolant,
    InsufficientHistory,
    LabelMismatch,
    MissingImage,
    UnreadableFrames,
    RecordingFailed,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::ExcludedSegment => "excluded segment",
            SkipReason::UnmappedSegment => "unmapped segment",
            SkipReason::InsufficientData => "insufficient data",
            SkipReason::MissingInterpolant => "missing interpolant",
            SkipReason::InsufficientHistory => "insufficient history",
            SkipReason::LabelMismatch => "label mismatch",
            SkipReason::MissingImage => "missing image",
            SkipReason::UnreadableFrames => "unreadable frames",
            SkipReason::RecordingFailed => "recording failed",
        }
    }

    /// Routine skips are logged at `info`, the rest at `warn`.
    fn is_routine(&self) -> bool {
        matches!(
            self,
            SkipReason::ExcludedSegment | SkipReason::InsufficientHistory
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkipEvent {
    pub stage: Stage,
    pub reason: SkipReason,
    pub participant: String,
    pub emotion: Option<String>,
    pub segment: Option<String>,
    pub detail: String,
}

impl SkipEvent {
    pub fn new(stage: Stage, reason: SkipReason, participant: impl Into<String>) -> Self {
        Self {
            stage,
            reason,
            participant: participant.into(),
            emotion: None,
            segment: None,
            detail: String::new(),
        }
    }

    pub fn emotion(mut self, emotion: impl Into<String>) -> Self {
        self.emotion = Some(emotion.into());
        self
    }

    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segment = Some(segment.into());
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }
}

/// Collects skip events, logging each as it arrives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkipLog {
    events: Vec<SkipEvent>,
}

impl SkipLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: SkipEvent) {
        let what = match (&event.emotion, &event.segment) {
            (Some(emotion), _) => format!("{}/{}", event.participant, emotion),
            (None, Some(segment)) => format!("{} segment `{}`", event.participant, segment),
            (None, None) if event.participant.is_empty() => "run".to_string(),
            (None, None) => event.participant.clone(),
        };
        if event.reason.is_routine() {
            log_info!("skip ({}) {what}: {}", event.reason.as_str(), event.detail);
        } else {
            log_warn!("skip ({}) {what}: {}", event.reason.as_str(), event.detail);
        }
        self.events.push(event);
    }

    pub fn extend(&mut self, other: SkipLog) {
        self.events.extend(other.events);
    }

    pub fn events(&self) -> &[SkipEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn count(&self, reason: SkipReason) -> usize {
        self.events.iter().filter(|e| e.reason == reason).count()
    }

    pub fn counts(&self) -> BTreeMap<SkipReason, usize> {
        let mut counts = BTreeMap::new();
        for event in &self.events {
            *counts.entry(event.reason).or_insert(0) += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub recordings: Vec<RecordingRun>,
    pub stored_interpolants: usize,
    pub joined_records: usize,
    pub skip_counts: BTreeMap<SkipReason, usize>,
    pub skips: Vec<SkipEvent>,
}

impl PipelineReport {
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            recordings: Vec::new(),
            stored_interpolants: 0,
            joined_records: 0,
            skip_counts: BTreeMap::new(),
            skips: Vec::new(),
        }
    }

    pub fn finish(&mut self, skips: &SkipLog) {
        self.finished_at = Some(Utc::now());
        self.skip_counts = skips.counts();
        self.skips = skips.events().to_vec();
    }

    pub fn log_summary(&self) {
        let failed = self
            .recordings
            .iter()
            .filter(|r| r.status == crate::models::RunStatus::Failed)
            .count();
        log_info!(
            "run {}: {} recordings ({} failed), {} interpolants stored, {} joined records",
            self.run_id,
            self.recordings.len(),
            failed,
            self.stored_interpolants,
            self.joined_records
        );
        for (reason, count) in &self.skip_counts {
            log_info!("  skipped {count} x {}", reason.as_str());
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(path, serialized)
            .with_context(|| format!("failed to write report to {}", path.display()))
    }
}
