//! Schema versions tracked through SQLite's `user_version`.

use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// Schema scripts in order; entry `i` upgrades version `i` to `i + 1`.
const SCHEMAS: &[(&str, &str)] = &[
    ("schema_v1.sql", include_str!("schemas/schema_v1.sql")),
    ("schema_v2.sql", include_str!("schemas/schema_v2.sql")),
];

fn schema_version(conn: &Connection) -> Result<usize> {
    let stored: i64 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read the store's schema version")?;
    usize::try_from(stored).with_context(|| format!("invalid schema version {stored}"))
}

/// Bring the store up to the newest schema in one transaction.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let latest = SCHEMAS.len();
    let found = schema_version(conn)?;

    if found > latest {
        bail!("interpolant store has schema version {found}, newest known is {latest}");
    }
    let pending = &SCHEMAS[found..];
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to start schema upgrade")?;
    for (name, script) in pending {
        tx.execute_batch(script)
            .with_context(|| format!("failed to apply {name}"))?;
    }
    tx.pragma_update(None, "user_version", latest as i64)
        .context("failed to record the new schema version")?;
    tx.commit().context("failed to commit schema upgrade")?;

    log::info!("interpolant store upgraded from schema {found} to {latest}");
    Ok(())
}
