use rusqlite::{params, OptionalExtension};

use super::types::{string_list_column, string_list_to_sql};
use super::{DbError, DealDb};
use crate::types::Workspace;

impl DealDb {
    // =========================================================================
    // Workspaces
    // =========================================================================

    pub fn insert_workspace(&self, workspace: &Workspace) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO workspaces (
                id, name, description, deal_context, deal_summary, renewal_info,
                teams_json, color
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                workspace.id,
                workspace.name,
                workspace.description,
                workspace.deal_context,
                workspace.deal_summary,
                workspace.renewal_info,
                string_list_to_sql(&workspace.teams)?,
                workspace.color,
            ],
        )?;
        Ok(())
    }

    /// Insert or overwrite a workspace's descriptive fields.
    pub fn upsert_workspace(&self, workspace: &Workspace) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO workspaces (
                id, name, description, deal_context, deal_summary, renewal_info,
                teams_json, color
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                deal_context = excluded.deal_context,
                deal_summary = excluded.deal_summary,
                renewal_info = excluded.renewal_info,
                teams_json = excluded.teams_json,
                color = excluded.color,
                updated_at = datetime('now')",
            params![
                workspace.id,
                workspace.name,
                workspace.description,
                workspace.deal_context,
                workspace.deal_summary,
                workspace.renewal_info,
                string_list_to_sql(&workspace.teams)?,
                workspace.color,
            ],
        )?;
        Ok(())
    }

    pub fn get_workspace(&self, id: &str) -> Result<Option<Workspace>, DbError> {
        let workspace = self
            .conn
            .query_row(
                "SELECT id, name, description, deal_context, deal_summary, renewal_info,
                        teams_json, color
                 FROM workspaces WHERE id = ?1",
                params![id],
                Self::map_workspace_row,
            )
            .optional()?;
        Ok(workspace)
    }

    pub fn workspace_exists(&self, id: &str) -> Result<bool, DbError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM workspaces WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// All workspaces, oldest first.
    pub fn list_workspaces(&self) -> Result<Vec<Workspace>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, deal_context, deal_summary, renewal_info,
                    teams_json, color
             FROM workspaces
             ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map([], Self::map_workspace_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn map_workspace_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Workspace> {
        Ok(Workspace {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            deal_context: row.get(3)?,
            deal_summary: row.get(4)?,
            renewal_info: row.get(5)?,
            teams: string_list_column(row, 6)?,
            color: row.get(7)?,
        })
    }
}
