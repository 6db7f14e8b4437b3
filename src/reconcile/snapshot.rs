//! In-memory copy of one workspace's collections.
//!
//! A reconciliation pass loads a snapshot, mutates it freely, and hands it
//! back to the store for a single all-or-nothing commit. ID allocation lives
//! here so a pass can create several records before anything is written.

use crate::types::{Activity, NewStakeholder, Stakeholder};

/// Next numeric suffix for each generated ID kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdCounters {
    pub next_stakeholder: u64,
    pub next_activity: u64,
}

impl Default for IdCounters {
    fn default() -> Self {
        Self {
            next_stakeholder: 1,
            next_activity: 1,
        }
    }
}

fn numeric_suffix(id: &str, prefix: char) -> Option<u64> {
    id.strip_prefix(prefix)?.parse().ok()
}

impl IdCounters {
    /// Counters one past the highest `s<n>` / `a<n>` suffix in use.
    pub fn seed(stakeholders: &[Stakeholder], activities: &[Activity]) -> Self {
        let max_s = stakeholders
            .iter()
            .filter_map(|s| numeric_suffix(&s.id, 's'))
            .max()
            .unwrap_or(0);
        let max_a = activities
            .iter()
            .filter_map(|a| numeric_suffix(&a.id, 'a'))
            .max()
            .unwrap_or(0);
        Self {
            next_stakeholder: max_s + 1,
            next_activity: max_a + 1,
        }
    }

    /// Component-wise maximum. Counters never move backward.
    pub fn max(self, other: IdCounters) -> Self {
        Self {
            next_stakeholder: self.next_stakeholder.max(other.next_stakeholder),
            next_activity: self.next_activity.max(other.next_activity),
        }
    }
}

/// Result of removing a stakeholder with activity cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedStakeholder {
    pub stakeholder: Stakeholder,
    /// Activities that lost their last participant and were deleted.
    pub activities_removed: Vec<String>,
    /// Activities that kept other participants.
    pub activities_trimmed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceSnapshot {
    pub workspace_id: String,
    pub stakeholders: Vec<Stakeholder>,
    pub activities: Vec<Activity>,
    pub counters: IdCounters,
}

impl WorkspaceSnapshot {
    /// Build a snapshot. Stored counters are raised to cover any ID already
    /// present, so imported data can't collide with fresh allocations.
    pub fn new(
        workspace_id: impl Into<String>,
        stakeholders: Vec<Stakeholder>,
        activities: Vec<Activity>,
        counters: IdCounters,
    ) -> Self {
        let counters = counters.max(IdCounters::seed(&stakeholders, &activities));
        Self {
            workspace_id: workspace_id.into(),
            stakeholders,
            activities,
            counters,
        }
    }

    pub fn empty(workspace_id: impl Into<String>) -> Self {
        Self::new(workspace_id, Vec::new(), Vec::new(), IdCounters::default())
    }

    pub fn allocate_stakeholder_id(&mut self) -> String {
        loop {
            let id = format!("s{}", self.counters.next_stakeholder);
            self.counters.next_stakeholder += 1;
            if self.stakeholder(&id).is_none() {
                return id;
            }
        }
    }

    pub fn allocate_activity_id(&mut self) -> String {
        loop {
            let id = format!("a{}", self.counters.next_activity);
            self.counters.next_activity += 1;
            if self.activity(&id).is_none() {
                return id;
            }
        }
    }

    pub fn stakeholder(&self, id: &str) -> Option<&Stakeholder> {
        self.stakeholders.iter().find(|s| s.id == id)
    }

    pub fn stakeholder_mut(&mut self, id: &str) -> Option<&mut Stakeholder> {
        self.stakeholders.iter_mut().find(|s| s.id == id)
    }

    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == id)
    }

    /// Stakeholder holding `email` (case-insensitive), if any.
    pub fn stakeholder_by_email(&self, email: &str) -> Option<&Stakeholder> {
        let key = email.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        self.stakeholders
            .iter()
            .find(|s| s.email_key().as_deref() == Some(key.as_str()))
    }

    /// True when another stakeholder than `except_id` already owns `email`.
    pub fn email_taken(&self, email: &str, except_id: Option<&str>) -> bool {
        self.stakeholder_by_email(email)
            .is_some_and(|s| Some(s.id.as_str()) != except_id)
    }

    /// Append a new stakeholder with a freshly allocated ID and return the ID.
    ///
    /// Callers check email uniqueness first; this only allocates and stores.
    pub fn insert_stakeholder(&mut self, new: NewStakeholder) -> String {
        let id = self.allocate_stakeholder_id();
        self.stakeholders.push(new.into_stakeholder(id.clone()));
        id
    }

    /// Remove a stakeholder and cascade to activities.
    ///
    /// The ID is dropped from every participant list; activities left with
    /// no participants are deleted.
    pub fn remove_stakeholder(&mut self, id: &str) -> Option<RemovedStakeholder> {
        let idx = self.stakeholders.iter().position(|s| s.id == id)?;
        let stakeholder = self.stakeholders.remove(idx);

        let mut activities_removed = Vec::new();
        let mut activities_trimmed = 0;
        self.activities.retain_mut(|activity| {
            if !activity.involves(id) {
                return true;
            }
            activity.stakeholder_ids.retain(|sid| sid != id);
            if activity.stakeholder_ids.is_empty() {
                activities_removed.push(activity.id.clone());
                false
            } else {
                activities_trimmed += 1;
                true
            }
        });

        Some(RemovedStakeholder {
            stakeholder,
            activities_removed,
            activities_trimmed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActivityType, DealRole, Priority, RelationshipStrength};
    use chrono::NaiveDate;

    fn make_stakeholder(id: &str, name: &str, email: Option<&str>) -> Stakeholder {
        Stakeholder {
            id: id.to_string(),
            name: name.to_string(),
            title: String::new(),
            team: "Finance".to_string(),
            role: DealRole::Influencer,
            priority: Priority::P2,
            last_contact_date: None,
            relationship_strength: RelationshipStrength::Neutral,
            key_priorities: Vec::new(),
            notes: String::new(),
            email: email.map(str::to_string),
        }
    }

    fn make_activity(id: &str, ids: &[&str]) -> Activity {
        Activity {
            id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            stakeholder_ids: ids.iter().map(|s| s.to_string()).collect(),
            activity_type: ActivityType::Meeting,
            summary: "Sync".to_string(),
        }
    }

    fn make_snapshot() -> WorkspaceSnapshot {
        WorkspaceSnapshot::new(
            "acme",
            vec![
                make_stakeholder("s1", "Dana Park", Some("dana@acme.com")),
                make_stakeholder("s2", "Lee Wong", None),
                make_stakeholder("s7", "Chris Ito", None),
            ],
            vec![
                make_activity("a1", &["s1"]),
                make_activity("a2", &["s1", "s2"]),
                make_activity("a3", &["s2"]),
            ],
            IdCounters::default(),
        )
    }

    #[test]
    fn test_counters_seed_from_max_suffix() {
        let snap = make_snapshot();
        assert_eq!(snap.counters.next_stakeholder, 8);
        assert_eq!(snap.counters.next_activity, 4);
    }

    #[test]
    fn test_stored_counters_are_not_lowered() {
        let snap = WorkspaceSnapshot::new(
            "acme",
            vec![make_stakeholder("s1", "Dana", None)],
            Vec::new(),
            IdCounters {
                next_stakeholder: 20,
                next_activity: 5,
            },
        );
        assert_eq!(snap.counters.next_stakeholder, 20);
        assert_eq!(snap.counters.next_activity, 5);
    }

    #[test]
    fn test_ids_never_reused_after_delete() {
        let mut snap = make_snapshot();
        snap.remove_stakeholder("s7").unwrap();
        assert_eq!(snap.allocate_stakeholder_id(), "s8");
        assert_eq!(snap.allocate_stakeholder_id(), "s9");
    }

    #[test]
    fn test_remove_cascades_to_activities() {
        let mut snap = make_snapshot();
        let removed = snap.remove_stakeholder("s1").unwrap();

        assert_eq!(removed.activities_removed, vec!["a1".to_string()]);
        assert_eq!(removed.activities_trimmed, 1);
        assert!(snap.activity("a1").is_none());
        assert_eq!(snap.activity("a2").unwrap().stakeholder_ids, vec!["s2"]);
        assert!(snap.activities.iter().all(|a| !a.stakeholder_ids.is_empty()));
    }

    #[test]
    fn test_remove_last_participant_deletes_activity() {
        let mut snap = make_snapshot();
        snap.remove_stakeholder("s1").unwrap();
        let removed = snap.remove_stakeholder("s2").unwrap();
        assert_eq!(removed.activities_removed.len(), 2);
        assert!(snap.activities.is_empty());
    }

    #[test]
    fn test_remove_unknown_returns_none() {
        let mut snap = make_snapshot();
        assert!(snap.remove_stakeholder("s99").is_none());
        assert_eq!(snap.stakeholders.len(), 3);
    }

    #[test]
    fn test_email_lookup_is_case_insensitive() {
        let snap = make_snapshot();
        assert_eq!(snap.stakeholder_by_email(" DANA@acme.com").unwrap().id, "s1");
        assert!(snap.email_taken("dana@ACME.com", None));
        assert!(!snap.email_taken("dana@acme.com", Some("s1")));
        assert!(snap.stakeholder_by_email("").is_none());
    }
}
