use rusqlite::params;

use super::types::{date_column, date_to_sql, enum_column, string_list_column, string_list_to_sql};
use super::{DbError, DealDb};
use crate::types::Activity;

impl DealDb {
    // =========================================================================
    // Activities
    // =========================================================================

    /// Load every activity of a workspace in collection order.
    pub fn load_activities(&self, workspace_id: &str) -> Result<Vec<Activity>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, stakeholder_ids, activity_type, summary
             FROM activities
             WHERE workspace_id = ?1
             ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![workspace_id], |row| {
            Ok(Activity {
                id: row.get(0)?,
                date: date_column(row, 1)?,
                stakeholder_ids: string_list_column(row, 2)?,
                activity_type: enum_column(row, 3)?,
                summary: row.get(4)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Replace the whole activity collection of a workspace.
    pub fn replace_activities(
        &self,
        workspace_id: &str,
        activities: &[Activity],
    ) -> Result<(), DbError> {
        self.with_transaction(|db| db.write_activities(workspace_id, activities))
    }

    pub(super) fn write_activities(
        &self,
        workspace_id: &str,
        activities: &[Activity],
    ) -> Result<(), DbError> {
        self.conn.execute(
            "DELETE FROM activities WHERE workspace_id = ?1",
            params![workspace_id],
        )?;

        let mut stmt = self.conn.prepare(
            "INSERT INTO activities (
                workspace_id, id, position, date, activity_type, summary, stakeholder_ids
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for (position, a) in activities.iter().enumerate() {
            stmt.execute(params![
                workspace_id,
                a.id,
                position as i64,
                date_to_sql(a.date),
                a.activity_type.as_str(),
                a.summary,
                string_list_to_sql(&a.stakeholder_ids)?,
            ])?;
        }
        Ok(())
    }
}
