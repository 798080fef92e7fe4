//! Batch orchestration: fit every recording, then join frames against the
//! stored interpolants.

pub mod fit;
pub mod join;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::db::Database;
use crate::ingest::{DirectoryRecordingSource, RecordingSource};
use crate::report::{PipelineReport, SkipLog};
use crate::settings::Settings;

pub use fit::{fit_all, persist_recording, process_recording, RecordingFit};
pub use join::{join_stage, read_joined, write_joined};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Fit every recording from `source` and persist the results.
pub async fn fit_stage(
    settings: &Settings,
    source: Arc<dyn RecordingSource>,
    db: &Database,
    report: &mut PipelineReport,
    skips: &mut SkipLog,
) -> Result<()> {
    let run_id = report.run_id.to_string();
    let plot = settings.plot();

    for (participant, fit) in fit_all(source, &settings.segmentation()).await? {
        let run = persist_recording(db, &run_id, &participant, fit, &plot, skips).await?;
        report.stored_interpolants += run.stored_count as usize;
        report.recordings.push(run);
    }
    Ok(())
}

/// Full batch run over the directories named in `settings`.
pub async fn run_pipeline(settings: &Settings) -> Result<PipelineReport> {
    let source: Arc<dyn RecordingSource> =
        Arc::new(DirectoryRecordingSource::new(settings.pupil_dir.clone()));
    run_with_source(settings, source).await
}

pub async fn run_with_source(
    settings: &Settings,
    source: Arc<dyn RecordingSource>,
) -> Result<PipelineReport> {
    std::fs::create_dir_all(&settings.output_dir).with_context(|| {
        format!("failed to create output directory {}", settings.output_dir.display())
    })?;
    let db = Database::new(settings.database_path.clone())?;

    let mut report = PipelineReport::start();
    let mut skips = SkipLog::new();
    log_info!("run {} started", report.run_id);

    fit_stage(settings, source, &db, &mut report, &mut skips).await?;

    let outcome = join::join_stage(settings, &db, &mut skips).await?;
    report.joined_records = outcome.records.len();

    report.finish(&skips);
    report.write_json(&settings.report_path())?;
    report.log_summary();
    Ok(report)
}
