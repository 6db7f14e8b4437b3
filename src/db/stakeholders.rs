use rusqlite::params;

use super::types::{
    date_to_sql, enum_column, optional_date_column, string_list_column, string_list_to_sql,
};
use super::{DbError, DealDb};
use crate::types::Stakeholder;

impl DealDb {
    // =========================================================================
    // Stakeholders
    // =========================================================================

    /// Load every stakeholder of a workspace in collection order.
    pub fn load_stakeholders(&self, workspace_id: &str) -> Result<Vec<Stakeholder>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, title, team, role, priority, last_contact_date,
                    relationship_strength, key_priorities, notes, email
             FROM stakeholders
             WHERE workspace_id = ?1
             ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![workspace_id], Self::map_stakeholder_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Replace the whole stakeholder collection of a workspace.
    pub fn replace_stakeholders(
        &self,
        workspace_id: &str,
        stakeholders: &[Stakeholder],
    ) -> Result<(), DbError> {
        self.with_transaction(|db| db.write_stakeholders(workspace_id, stakeholders))
    }

    /// Delete-and-insert without opening a transaction. Callers own the
    /// transaction boundary.
    pub(super) fn write_stakeholders(
        &self,
        workspace_id: &str,
        stakeholders: &[Stakeholder],
    ) -> Result<(), DbError> {
        self.conn.execute(
            "DELETE FROM stakeholders WHERE workspace_id = ?1",
            params![workspace_id],
        )?;

        let mut stmt = self.conn.prepare(
            "INSERT INTO stakeholders (
                workspace_id, id, position, name, title, team, role, priority,
                last_contact_date, relationship_strength, key_priorities, notes, email
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, LOWER(?13))",
        )?;
        for (position, s) in stakeholders.iter().enumerate() {
            stmt.execute(params![
                workspace_id,
                s.id,
                position as i64,
                s.name,
                s.title,
                s.team,
                s.role.as_str(),
                s.priority.as_str(),
                s.last_contact_date.map(date_to_sql),
                s.relationship_strength.as_str(),
                string_list_to_sql(&s.key_priorities)?,
                s.notes,
                s.email.as_deref().filter(|e| !e.trim().is_empty()),
            ])?;
        }
        Ok(())
    }

    fn map_stakeholder_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Stakeholder> {
        Ok(Stakeholder {
            id: row.get(0)?,
            name: row.get(1)?,
            title: row.get(2)?,
            team: row.get(3)?,
            role: enum_column(row, 4)?,
            priority: enum_column(row, 5)?,
            last_contact_date: optional_date_column(row, 6)?,
            relationship_strength: enum_column(row, 7)?,
            key_priorities: string_list_column(row, 8)?,
            notes: row.get(9)?,
            email: row.get(10)?,
        })
    }
}
