//! SQLite-backed store for workspaces, stakeholders, activities and sync state.
//!
//! The database lives at `~/.dealgraph/dealgraph.db` unless the config points
//! elsewhere. Collections are read and written whole: a reconciliation pass
//! loads a [`WorkspaceSnapshot`], works in memory, and commits everything in
//! one transaction so a failed pass never leaves partial rows behind.
//!
//! Row order within a workspace is kept in a `position` column. The identity
//! resolver breaks ties by collection order, so order is part of the data.

use std::path::PathBuf;

use rusqlite::Connection;

pub mod types;
pub use types::DbError;

mod activities;
mod snapshot;
mod stakeholders;
mod sync_state;
mod workspaces;

pub use crate::reconcile::snapshot::{IdCounters, WorkspaceSnapshot};

pub struct DealDb {
    conn: Connection,
}

impl DealDb {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    pub fn with_transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<DbError>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| E::from(DbError::Sqlite(e)))?;
        match f(self) {
            Ok(val) => {
                if let Err(e) = self.conn.execute_batch("COMMIT") {
                    let _ = self.conn.execute_batch("ROLLBACK");
                    return Err(E::from(DbError::Sqlite(e)));
                }
                Ok(val)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Open (or create) the database at the default location.
    pub fn open() -> Result<Self, DbError> {
        Self::open_at(Self::default_path()?)
    }

    /// Open a database at an explicit path and apply pending migrations.
    pub fn open_at(path: PathBuf) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let applied = crate::migrations::run_migrations(&conn)?;
        if applied > 0 {
            log::info!("Database at {} migrated ({} step(s))", path.display(), applied);
        }

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(Self { conn })
    }

    /// Resolve the default database path: `~/.dealgraph/dealgraph.db`.
    pub fn default_path() -> Result<PathBuf, DbError> {
        let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
        Ok(home.join(".dealgraph").join("dealgraph.db"))
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::DealDb;
    use crate::types::Workspace;

    /// Create a temporary database for testing.
    ///
    /// We leak the `TempDir` so the directory persists for the duration of the test.
    /// Test temp dirs are cleaned up by the OS. FK enforcement is disabled so that
    /// unit tests can insert rows without creating the owning workspace first.
    pub fn test_db() -> DealDb {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("test.db");
        std::mem::forget(dir);
        let db = DealDb::open_at(path).expect("Failed to open test database");
        db.conn_ref()
            .execute_batch("PRAGMA foreign_keys = OFF;")
            .expect("disable FK for tests");
        db
    }

    pub fn make_workspace(id: &str) -> Workspace {
        Workspace {
            id: id.to_string(),
            name: id.to_uppercase(),
            description: String::new(),
            deal_context: String::new(),
            deal_summary: String::new(),
            renewal_info: String::new(),
            teams: Vec::new(),
            color: "emerald".to_string(),
        }
    }
}
