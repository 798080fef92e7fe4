use std::collections::BTreeSet;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{helpers::to_sql_error, Database};
use crate::error::PipelineError;
use crate::interpolation::{CubicSpline, FittedInterpolant};
use crate::join::InterpolantCache;
use crate::models::InterpolantKey;

fn row_to_key(row: &Row) -> Result<InterpolantKey, rusqlite::Error> {
    Ok(InterpolantKey {
        participant: row.get("participant")?,
        emotion: row.get("emotion")?,
    })
}

fn row_to_entry(row: &Row) -> Result<(InterpolantKey, CubicSpline), rusqlite::Error> {
    let key = row_to_key(row)?;
    let spline_json: String = row.get("spline_json")?;
    let spline = decode_spline(&key, &spline_json).map_err(to_sql_error)?;
    Ok((key, spline))
}

fn decode_spline(key: &InterpolantKey, spline_json: &str) -> Result<CubicSpline> {
    serde_json::from_str(spline_json)
        .with_context(|| format!("failed to decode stored interpolant {}", key.artifact_name()))
}

const UPSERT_INTERPOLANT: &str = "INSERT INTO interpolants (
        participant,
        emotion,
        artifact_name,
        knot_count,
        domain_start_ms,
        domain_end_ms,
        spline_json,
        created_at,
        updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
    ON CONFLICT(participant, emotion) DO UPDATE SET
        artifact_name = excluded.artifact_name,
        knot_count = excluded.knot_count,
        domain_start_ms = excluded.domain_start_ms,
        domain_end_ms = excluded.domain_end_ms,
        spline_json = excluded.spline_json,
        updated_at = excluded.updated_at";

/// Column values for one interpolant row, prepared off the worker thread.
struct InterpolantRow {
    key: InterpolantKey,
    knot_count: i64,
    domain: (f64, f64),
    spline_json: String,
}

impl InterpolantRow {
    fn encode(key: &InterpolantKey, spline: &CubicSpline) -> Result<Self> {
        let spline_json = serde_json::to_string(spline)
            .with_context(|| format!("failed to serialize interpolant {key}"))?;
        Ok(Self {
            key: key.clone(),
            knot_count: i64::try_from(spline.knot_count())
                .with_context(|| format!("too many knots in interpolant {key}"))?,
            domain: spline.domain(),
            spline_json,
        })
    }
}

/// Upsert `rows` inside one transaction: either every row lands or none do.
fn upsert_rows(conn: &mut Connection, rows: &[InterpolantRow]) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(UPSERT_INTERPOLANT)?;
        for row in rows {
            stmt.execute(params![
                row.key.participant,
                row.key.emotion,
                row.key.artifact_name(),
                row.knot_count,
                row.domain.0,
                row.domain.1,
                row.spline_json,
                now,
            ])
            .with_context(|| format!("failed to store interpolant {}", row.key))?;
        }
    }
    tx.commit().context("failed to commit interpolants")?;
    Ok(())
}

impl Database {
    /// Insert or replace the interpolant for `key`.
    pub async fn put_interpolant(&self, key: &InterpolantKey, spline: &CubicSpline) -> Result<()> {
        let row = InterpolantRow::encode(key, spline)?;
        self.execute(move |conn| upsert_rows(conn, std::slice::from_ref(&row)))
            .await
    }

    /// Insert or replace a batch of interpolants atomically. If any row is
    /// rejected the store is left as it was.
    pub async fn put_interpolants(&self, fitted: &[FittedInterpolant]) -> Result<usize> {
        let rows = fitted
            .iter()
            .map(|entry| InterpolantRow::encode(&entry.key, &entry.spline))
            .collect::<Result<Vec<_>>>()?;
        let count = rows.len();
        self.execute(move |conn| upsert_rows(conn, &rows)).await?;
        Ok(count)
    }

    /// Fetch one interpolant. A missing key surfaces as
    /// [`PipelineError::NotFound`] inside the `anyhow` error.
    pub async fn get_interpolant(&self, key: &InterpolantKey) -> Result<CubicSpline> {
        let key = key.clone();
        self.execute(move |conn| {
            let spline_json: Option<String> = conn
                .query_row(
                    "SELECT spline_json FROM interpolants
                     WHERE participant = ?1 AND emotion = ?2",
                    params![key.participant, key.emotion],
                    |row| row.get(0),
                )
                .optional()?;

            match spline_json {
                Some(json) => decode_spline(&key, &json),
                None => Err(PipelineError::NotFound {
                    participant: key.participant,
                    emotion: key.emotion,
                }
                .into()),
            }
        })
        .await
    }

    pub async fn list_interpolant_keys(&self) -> Result<BTreeSet<InterpolantKey>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare("SELECT participant, emotion FROM interpolants")?;
            let keys = stmt
                .query_map([], row_to_key)?
                .collect::<Result<BTreeSet<_>, _>>()?;
            Ok(keys)
        })
        .await
    }

    /// Snapshot every stored interpolant into an in-memory cache.
    pub async fn load_interpolants(&self) -> Result<InterpolantCache> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT participant, emotion, spline_json FROM interpolants
                 ORDER BY participant, emotion",
            )?;
            let cache = stmt
                .query_map([], row_to_entry)?
                .collect::<Result<InterpolantCache, _>>()?;
            Ok(cache)
        })
        .await
    }
}
