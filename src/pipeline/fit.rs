//! Segment, filter, label and fit one recording; fan out over a batch.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;

use crate::db::Database;
use crate::diagnostics::{write_plot, PlotConfig};
use crate::error::PipelineResult;
use crate::ingest::{Recording, RecordingSource};
use crate::interpolation::{fit_entry, FittedInterpolant};
use crate::models::{InterpolantKey, RecordingRun, RunStatus};
use crate::report::{SkipEvent, SkipLog, SkipReason, Stage};
use crate::segmentation::{filter_excluded, segment_stream, SegmentationConfig};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Everything the fitting stage produced for one recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingFit {
    pub interpolants: Vec<FittedInterpolant>,
    pub sample_count: usize,
    pub segment_count: usize,
    pub skips: SkipLog,
}

/// Segment a recording's samples and fit one interpolant per retained,
/// labelled segment.
///
/// Excluded, unlabelled and too-short segments are recorded in the
/// returned skip log; only recording-fatal errors are returned as `Err`.
pub fn process_recording(
    recording: &Recording,
    config: &SegmentationConfig,
) -> PipelineResult<RecordingFit> {
    let participant = recording.participant.as_str();
    let mut skips = SkipLog::new();

    let series = segment_stream(&recording.samples, &recording.table)?;
    let filtered = filter_excluded(series, &config.exclusion_fragments);
    for segment in &filtered.excluded {
        skips.record(
            SkipEvent::new(Stage::Fit, SkipReason::ExcludedSegment, participant)
                .segment(&segment.name)
                .detail("name matches an exclusion fragment"),
        );
    }

    let mut interpolants: Vec<FittedInterpolant> = Vec::new();
    for entry in filtered.retained.entries() {
        let Some(emotion) = config.emotion_for(entry.name()) else {
            skips.record(
                SkipEvent::new(Stage::Fit, SkipReason::UnmappedSegment, participant)
                    .segment(entry.name())
                    .detail("no emotion mapped to this segment name"),
            );
            continue;
        };

        let spline = match fit_entry(entry) {
            Ok(spline) => spline,
            Err(err) if !err.is_recording_fatal() => {
                skips.record(
                    SkipEvent::new(Stage::Fit, SkipReason::InsufficientData, participant)
                        .emotion(emotion)
                        .segment(entry.name())
                        .detail(err.to_string()),
                );
                continue;
            }
            Err(err) => return Err(err),
        };

        let key = InterpolantKey::new(participant, emotion);
        if let Some(existing) = interpolants.iter_mut().find(|fitted| fitted.key == key) {
            log_warn!(
                "{key}: segment `{}` maps to an emotion already fitted; keeping the later one",
                entry.name()
            );
            existing.spline = spline;
        } else {
            interpolants.push(FittedInterpolant::new(key, spline));
        }
    }

    log_info!(
        "{participant}: {} samples in {} segments, {} interpolants fitted, {} skipped",
        recording.samples.len(),
        recording.table.len(),
        interpolants.len(),
        skips.len()
    );

    Ok(RecordingFit {
        interpolants,
        sample_count: recording.samples.len(),
        segment_count: recording.table.len(),
        skips,
    })
}

/// Load and fit every recording the source lists, each on the blocking
/// pool. Results come back in participant order.
pub async fn fit_all(
    source: Arc<dyn RecordingSource>,
    config: &SegmentationConfig,
) -> Result<Vec<(String, Result<RecordingFit>)>> {
    let participants = source
        .participants()
        .context("failed to list recordings")?;
    log_info!("fitting {} recordings", participants.len());

    let mut handles = Vec::with_capacity(participants.len());
    for participant in participants {
        let source = Arc::clone(&source);
        let config = config.clone();
        let task_participant = participant.clone();
        let handle = tokio::task::spawn_blocking(move || -> PipelineResult<RecordingFit> {
            let recording = source.load(&task_participant)?;
            process_recording(&recording, &config)
        });
        handles.push((participant, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (participant, handle) in handles {
        let result = match handle.await {
            Ok(fit) => fit.map_err(anyhow::Error::new),
            Err(join_err) => Err(anyhow!("fitting worker failed: {join_err}")),
        };
        results.push((participant, result));
    }
    Ok(results)
}

/// Store one recording's interpolants, render plots when enabled, and write
/// its audit row.
pub async fn persist_recording(
    db: &Database,
    run_id: &str,
    participant: &str,
    fit: Result<RecordingFit>,
    plot: &PlotConfig,
    skips: &mut SkipLog,
) -> Result<RecordingRun> {
    let mut run = RecordingRun {
        run_id: run_id.to_string(),
        participant: participant.to_string(),
        status: RunStatus::Completed,
        sample_count: 0,
        segment_count: 0,
        stored_count: 0,
        skipped_count: 0,
        error: None,
        processed_at: Utc::now(),
    };

    let outcome = match fit {
        Ok(fit) => store_fit(db, fit, plot, &mut run, skips).await,
        Err(err) => Err(err),
    };

    if let Err(err) = outcome {
        log_error!("{participant}: recording failed: {err:#}");
        skips.record(
            SkipEvent::new(Stage::Fit, SkipReason::RecordingFailed, participant)
                .detail(format!("{err:#}")),
        );
        run.status = RunStatus::Failed;
        run.error = Some(format!("{err:#}"));
    }

    db.insert_recording_run(&run)
        .await
        .with_context(|| format!("failed to record run for {participant}"))?;
    Ok(run)
}

/// Writes the recording's interpolants in one transaction, so a failed
/// recording leaves none of its keys behind.
async fn store_fit(
    db: &Database,
    fit: RecordingFit,
    plot: &PlotConfig,
    run: &mut RecordingRun,
    skips: &mut SkipLog,
) -> Result<()> {
    run.sample_count = fit.sample_count as u64;
    run.segment_count = fit.segment_count as u64;
    run.skipped_count = fit.skips.len() as u64;
    skips.extend(fit.skips);

    let stored = db
        .put_interpolants(&fit.interpolants)
        .await
        .with_context(|| format!("failed to store interpolants for {}", run.participant))?;
    run.stored_count = stored as u64;

    if plot.enabled {
        write_plots(fit.interpolants, plot.clone()).await;
    }
    Ok(())
}

async fn write_plots(interpolants: Vec<FittedInterpolant>, plot: PlotConfig) {
    let rendered = tokio::task::spawn_blocking(move || {
        interpolants
            .into_iter()
            .map(|fitted| {
                let outcome = write_plot(&fitted.key, &fitted.spline, &plot);
                (fitted.key, outcome)
            })
            .collect::<Vec<_>>()
    })
    .await;

    match rendered {
        Ok(outcomes) => {
            for (key, outcome) in outcomes {
                match outcome {
                    Ok(path) => log_info!("plot for {key} written to {}", path.display()),
                    Err(err) => log_warn!("plot for {key} failed: {err:#}"),
                }
            }
        }
        Err(err) => log_warn!("plot worker failed: {err}"),
    }
}
