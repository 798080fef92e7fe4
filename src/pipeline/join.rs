use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::db::Database;
use crate::ingest::load_frame_records;
use crate::join::{join_records, JoinOutcome};
use crate::models::JoinedRecord;
use crate::report::SkipLog;
use crate::settings::Settings;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Load the stored interpolants and frame records, join them, and write the
/// joined dataset.
///
/// Directory scanning, CSV parsing and the JSON lines write run on the
/// blocking pool; skips found there are merged into `skips`.
pub async fn join_stage(
    settings: &Settings,
    db: &Database,
    skips: &mut SkipLog,
) -> Result<JoinOutcome> {
    let classes = settings.class_map().context("invalid class configuration")?;
    let cache = db
        .load_interpolants()
        .await
        .context("failed to load stored interpolants")?;
    log_info!("loaded {} interpolants for joining", cache.len());

    let face_dir = settings.face_dir.clone();
    let frames = settings.frames();
    let window = settings.window();
    let path = settings.joined_path();

    let (outcome, join_skips) = tokio::task::spawn_blocking(move || -> Result<_> {
        let mut skips = SkipLog::new();
        let records = load_frame_records(&face_dir, &frames, &mut skips).with_context(|| {
            format!("failed to load frame records from {}", face_dir.display())
        })?;

        let outcome = join_records(records, &cache, &classes, window, &mut skips);

        write_joined(&path, &outcome.records)?;
        log_info!("wrote {} joined records to {}", outcome.records.len(), path.display());
        Ok((outcome, skips))
    })
    .await
    .context("join worker failed")??;

    skips.extend(join_skips);
    Ok(outcome)
}

/// One JSON object per line.
pub fn write_joined(path: &Path, records: &[JoinedRecord]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Read back a file written by [`write_joined`].
pub fn read_joined(path: &Path) -> Result<Vec<JoinedRecord>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(idx, line)| {
            serde_json::from_str(line).with_context(|| {
                format!("{} line {}: invalid joined record", path.display(), idx + 1)
            })
        })
        .collect()
}
