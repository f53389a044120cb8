//! Ordered schema steps for the `team` and `member` tables.
//!
//! # Invariants
//! - Step versions start at 1 and increase by exactly one.
//! - A run applies every pending step in one transaction; `user_version`
//!   only moves when the whole run commits.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::{Connection, Transaction};
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "init",
        sql: include_str!("0001_init.sql"),
    },
    Migration {
        version: 2,
        name: "member_lookup_indexes",
        sql: include_str!("0002_member_lookup_indexes.sql"),
    },
];

/// Highest schema version this build can produce.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |step| step.version)
}

/// Schema version recorded in the connected database.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

/// Brings the connected database up to [`latest_version`].
///
/// # Contract
/// - Already current: no writes.
/// - Newer than this build: `UnsupportedSchemaVersion`, no writes.
/// - A failing step yields `DbError::Migration` naming it; the run rolls back.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    run(conn, MIGRATIONS)
}

pub(crate) fn run(conn: &mut Connection, steps: &[Migration]) -> DbResult<()> {
    let from = schema_version(conn)?;
    let latest = steps.last().map_or(0, |step| step.version);
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = steps.iter().filter(|step| step.version > from).collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in pending {
        apply_step(&tx, step)?;
    }
    tx.commit()?;
    info!("event=migration module=db status=done from={from} to={latest}");
    Ok(())
}

fn apply_step(tx: &Transaction<'_>, step: &Migration) -> DbResult<()> {
    let started_at = Instant::now();
    let outcome = tx
        .execute_batch(step.sql)
        .and_then(|()| tx.pragma_update(None, "user_version", step.version));
    match outcome {
        Ok(()) => {
            info!(
                "event=migration module=db status=ok version={} name={} duration_ms={}",
                step.version,
                step.name,
                started_at.elapsed().as_millis()
            );
            Ok(())
        }
        Err(source) => {
            error!(
                "event=migration module=db status=error version={} name={} error={source}",
                step.version, step.name
            );
            Err(DbError::Migration {
                version: step.version,
                name: step.name,
                source,
            })
        }
    }
}
