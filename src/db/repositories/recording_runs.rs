use anyhow::{anyhow, Result};
use rusqlite::{params, Row};

use crate::db::{
    helpers::{count_from_sql, count_to_sql, timestamp_from_sql},
    Database,
};
use crate::models::{RecordingRun, RunStatus};

fn parse_status(value: &str) -> Result<RunStatus> {
    match value {
        "Completed" => Ok(RunStatus::Completed),
        "Failed" => Ok(RunStatus::Failed),
        other => Err(anyhow!("unknown recording run status {other}")),
    }
}

fn row_to_run(row: &Row) -> Result<RecordingRun> {
    let status: String = row.get("status")?;
    let processed_at: String = row.get("processed_at")?;

    Ok(RecordingRun {
        run_id: row.get("run_id")?,
        participant: row.get("participant")?,
        status: parse_status(&status)?,
        sample_count: count_from_sql(row.get("sample_count")?, "sample_count")?,
        segment_count: count_from_sql(row.get("segment_count")?, "segment_count")?,
        stored_count: count_from_sql(row.get("stored_count")?, "stored_count")?,
        skipped_count: count_from_sql(row.get("skipped_count")?, "skipped_count")?,
        error: row.get("error")?,
        processed_at: timestamp_from_sql(&processed_at, "processed_at")?,
    })
}

impl Database {
    pub async fn insert_recording_run(&self, run: &RecordingRun) -> Result<()> {
        let record = run.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO recording_runs (
                    run_id,
                    participant,
                    status,
                    sample_count,
                    segment_count,
                    stored_count,
                    skipped_count,
                    error,
                    processed_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.run_id,
                    record.participant,
                    record.status.as_str(),
                    count_to_sql(record.sample_count, "sample_count")?,
                    count_to_sql(record.segment_count, "segment_count")?,
                    count_to_sql(record.stored_count, "stored_count")?,
                    count_to_sql(record.skipped_count, "skipped_count")?,
                    record.error,
                    record.processed_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Audit rows for one pipeline run, in insertion order.
    pub async fn list_recording_runs(&self, run_id: &str) -> Result<Vec<RecordingRun>> {
        let run_id = run_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT run_id, participant, status, sample_count, segment_count,
                        stored_count, skipped_count, error, processed_at
                 FROM recording_runs
                 WHERE run_id = ?1
                 ORDER BY id",
            )?;
            let mut rows = stmt.query(params![run_id])?;
            let mut runs = Vec::new();
            while let Some(row) = rows.next()? {
                runs.push(row_to_run(row)?);
            }
            Ok(runs)
        })
        .await
    }
}
