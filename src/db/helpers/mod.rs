use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

/// Audit counters are unsigned in memory and `INTEGER` in SQLite.
pub fn count_to_sql(count: u64, column: &str) -> Result<i64> {
    i64::try_from(count).map_err(|_| anyhow!("{column} = {count} does not fit a SQLite INTEGER"))
}

pub fn count_from_sql(stored: i64, column: &str) -> Result<u64> {
    u64::try_from(stored).map_err(|_| anyhow!("{column} holds a negative count ({stored})"))
}

/// Timestamps are stored as RFC 3339 text.
pub fn timestamp_from_sql(stored: &str, column: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(stored)
        .with_context(|| format!("{column} is not an RFC 3339 timestamp: {stored}"))?;
    Ok(parsed.with_timezone(&Utc))
}

/// Wrap an `anyhow` error so it can leave a `rusqlite` row mapper.
pub fn to_sql_error(err: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        err.to_string(),
    )))
}
