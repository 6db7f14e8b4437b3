//! Versioned schema for the deal store.
//!
//! Steps are SQL files compiled into the binary. `schema_version` records
//! which have run; a database stamped past the last step is refused.

use rusqlite::{Connection, DatabaseName};
use thiserror::Error;

/// (version, sql) in ascending version order.
const STEPS: &[(i32, &str)] = &[(1, include_str!("migrations/001_baseline.sql"))];

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("database is at schema v{found}, this build only knows up to v{known}; upgrade dealgraph")]
    TooNew { found: i32, known: i32 },

    #[error("schema step v{version}: {source}")]
    Step {
        version: i32,
        #[source]
        source: rusqlite::Error,
    },

    #[error("schema bookkeeping: {0}")]
    Bookkeeping(#[from] rusqlite::Error),
}

fn latest_known() -> i32 {
    STEPS.last().map(|(v, _)| *v).unwrap_or(0)
}

fn stamped_version(conn: &Connection) -> rusqlite::Result<i32> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| {
        row.get(0)
    })
}

/// Hot copy to `<db>.v<from>.bak` ahead of an upgrade. No-op for in-memory databases.
fn snapshot_before_upgrade(conn: &Connection, from: i32) -> rusqlite::Result<()> {
    let Some(path) = conn.path().filter(|p| !p.is_empty()) else {
        return Ok(());
    };
    let target = format!("{}.v{}.bak", path, from);
    conn.backup(DatabaseName::Main, &target, None)?;
    log::info!("Saved schema v{} copy to {}", from, target);
    Ok(())
}

/// Bring the schema up to date. Returns how many steps ran.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    let found = stamped_version(conn)?;
    let known = latest_known();
    if found > known {
        return Err(MigrationError::TooNew { found, known });
    }

    let pending: Vec<_> = STEPS.iter().filter(|(v, _)| *v > found).collect();
    if pending.is_empty() {
        return Ok(0);
    }
    if found > 0 {
        snapshot_before_upgrade(conn, found)?;
    }

    for &&(version, sql) in &pending {
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)
            .map_err(|source| MigrationError::Step { version, source })?;
        tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
        tx.commit()?;
        log::info!("Schema now at v{}", version);
    }
    Ok(pending.len())
}
