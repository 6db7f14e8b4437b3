use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::{DbError, DealDb};
use crate::types::{SyncResult, SyncSource, SyncState};

impl DealDb {
    // =========================================================================
    // Sync state
    // =========================================================================

    pub fn get_sync_state(
        &self,
        workspace_id: &str,
        source: SyncSource,
    ) -> Result<Option<SyncState>, DbError> {
        let row: Option<(Option<String>, Option<String>)> = self
            .conn
            .query_row(
                "SELECT last_sync, last_result_json FROM sync_state
                 WHERE workspace_id = ?1 AND source = ?2",
                params![workspace_id, source.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(row.map(|(last_sync, last_result)| SyncState {
            source,
            last_sync: last_sync.as_deref().and_then(parse_timestamp),
            // A result written by an older build that no longer parses is
            // dropped rather than failing the status query.
            last_result: last_result
                .as_deref()
                .and_then(|json| serde_json::from_str::<SyncResult>(json).ok()),
        }))
    }

    pub fn write_sync_state(&self, workspace_id: &str, state: &SyncState) -> Result<(), DbError> {
        let result_json = state
            .last_result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        self.conn.execute(
            "INSERT INTO sync_state (workspace_id, source, last_sync, last_result_json)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(workspace_id, source) DO UPDATE SET
                last_sync = excluded.last_sync,
                last_result_json = excluded.last_result_json",
            params![
                workspace_id,
                state.source.as_str(),
                state.last_sync.map(|t| t.to_rfc3339()),
                result_json,
            ],
        )?;
        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
