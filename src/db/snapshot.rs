use rusqlite::params;

use super::{DbError, DealDb, IdCounters, WorkspaceSnapshot};
use crate::types::SyncState;

const KIND_STAKEHOLDER: &str = "stakeholder";
const KIND_ACTIVITY: &str = "activity";

impl DealDb {
    // =========================================================================
    // Snapshots and ID counters
    // =========================================================================

    /// Stored counters for a workspace, or `None` if never committed.
    pub fn load_counters(&self, workspace_id: &str) -> Result<Option<IdCounters>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT kind, next_value FROM id_counters WHERE workspace_id = ?1")?;
        let rows = stmt.query_map(params![workspace_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counters = IdCounters::default();
        let mut found = false;
        for row in rows {
            let (kind, value) = row?;
            let value = value.max(1) as u64;
            match kind.as_str() {
                KIND_STAKEHOLDER => counters.next_stakeholder = value,
                KIND_ACTIVITY => counters.next_activity = value,
                other => log::warn!("Ignoring unknown id counter kind {:?}", other),
            }
            found = true;
        }
        Ok(found.then_some(counters))
    }

    /// Raise stored counters. A lower value than the stored one is ignored.
    fn save_counters(&self, workspace_id: &str, counters: IdCounters) -> Result<(), DbError> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO id_counters (workspace_id, kind, next_value) VALUES (?1, ?2, ?3)
             ON CONFLICT(workspace_id, kind) DO UPDATE SET
                next_value = MAX(id_counters.next_value, excluded.next_value)",
        )?;
        stmt.execute(params![
            workspace_id,
            KIND_STAKEHOLDER,
            counters.next_stakeholder as i64
        ])?;
        stmt.execute(params![
            workspace_id,
            KIND_ACTIVITY,
            counters.next_activity as i64
        ])?;
        Ok(())
    }

    /// Load both collections and the ID counters of a workspace.
    ///
    /// Counters missing from the store are seeded from the highest ID suffix
    /// present; they are persisted on the next commit.
    pub fn load_snapshot(&self, workspace_id: &str) -> Result<WorkspaceSnapshot, DbError> {
        let stakeholders = self.load_stakeholders(workspace_id)?;
        let activities = self.load_activities(workspace_id)?;
        let counters = self.load_counters(workspace_id)?.unwrap_or_default();
        Ok(WorkspaceSnapshot::new(
            workspace_id,
            stakeholders,
            activities,
            counters,
        ))
    }

    /// Write a snapshot back in one transaction, optionally with the sync
    /// state of the pass that produced it.
    pub fn commit_snapshot(
        &self,
        snapshot: &WorkspaceSnapshot,
        sync: Option<&SyncState>,
    ) -> Result<(), DbError> {
        self.with_transaction(|db| {
            db.write_stakeholders(&snapshot.workspace_id, &snapshot.stakeholders)?;
            db.write_activities(&snapshot.workspace_id, &snapshot.activities)?;
            db.save_counters(&snapshot.workspace_id, snapshot.counters)?;
            if let Some(state) = sync {
                db.write_sync_state(&snapshot.workspace_id, state)?;
            }
            Ok(())
        })
    }
}
