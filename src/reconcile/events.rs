//! Event reconciliation: decide whether a detected interaction is new.
//!
//! An interaction is already recorded when an existing activity has the same
//! date, the same type and at least one participant in common. Partial overlap
//! is enough so the same meeting seen from two attendees' calendars is logged
//! once. Existing activities are never updated; a duplicate is skipped.

use chrono::NaiveDate;

use super::snapshot::WorkspaceSnapshot;
use crate::types::{Activity, ActivityType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileDecision {
    pub should_create: bool,
    /// Existing activity that suppressed creation, if any.
    pub duplicate_of: Option<String>,
}

/// A detected interaction, already resolved to stakeholder IDs.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityCandidate {
    pub date: NaiveDate,
    pub activity_type: ActivityType,
    pub participant_ids: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Created(String),
    Duplicate(String),
    /// No participants; nothing to link the activity to.
    Skipped,
}

impl RecordOutcome {
    pub fn created(&self) -> bool {
        matches!(self, RecordOutcome::Created(_))
    }

    /// ID of the created or duplicate activity.
    pub fn activity_id(&self) -> Option<&str> {
        match self {
            RecordOutcome::Created(id) | RecordOutcome::Duplicate(id) => Some(id),
            RecordOutcome::Skipped => None,
        }
    }
}

pub fn reconcile(
    date: NaiveDate,
    activity_type: ActivityType,
    participant_ids: &[String],
    existing: &[Activity],
) -> ReconcileDecision {
    if participant_ids.is_empty() {
        return ReconcileDecision {
            should_create: false,
            duplicate_of: None,
        };
    }

    let duplicate = existing.iter().find(|a| {
        a.date == date
            && a.activity_type == activity_type
            && participant_ids.iter().any(|id| a.involves(id))
    });

    match duplicate {
        Some(a) => ReconcileDecision {
            should_create: false,
            duplicate_of: Some(a.id.clone()),
        },
        None => ReconcileDecision {
            should_create: true,
            duplicate_of: None,
        },
    }
}

/// Reconcile a candidate against the snapshot and append it when new.
pub fn record_activity(snapshot: &mut WorkspaceSnapshot, candidate: ActivityCandidate) -> RecordOutcome {
    let mut participants: Vec<String> = Vec::with_capacity(candidate.participant_ids.len());
    for id in candidate.participant_ids {
        if !participants.contains(&id) {
            participants.push(id);
        }
    }

    let decision = reconcile(
        candidate.date,
        candidate.activity_type,
        &participants,
        &snapshot.activities,
    );
    if !decision.should_create {
        return match decision.duplicate_of {
            Some(id) => {
                log::debug!(
                    "Skipping duplicate {} on {} (matches {})",
                    candidate.activity_type,
                    candidate.date,
                    id
                );
                RecordOutcome::Duplicate(id)
            }
            None => RecordOutcome::Skipped,
        };
    }

    let id = snapshot.allocate_activity_id();
    snapshot.activities.push(Activity {
        id: id.clone(),
        date: candidate.date,
        stakeholder_ids: participants,
        activity_type: candidate.activity_type,
        summary: candidate.summary,
    });
    RecordOutcome::Created(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn make_activity(id: &str, d: u32, kind: ActivityType, participants: &[&str]) -> Activity {
        Activity {
            id: id.to_string(),
            date: day(d),
            stakeholder_ids: ids(participants),
            activity_type: kind,
            summary: String::new(),
        }
    }

    fn make_candidate(d: u32, kind: ActivityType, participants: &[&str]) -> ActivityCandidate {
        ActivityCandidate {
            date: day(d),
            activity_type: kind,
            participant_ids: ids(participants),
            summary: "QBR".to_string(),
        }
    }

    #[test]
    fn test_partial_overlap_is_duplicate() {
        let existing = vec![make_activity("a1", 3, ActivityType::Meeting, &["s1", "s2"])];
        let d = reconcile(day(3), ActivityType::Meeting, &ids(&["s2", "s9"]), &existing);
        assert!(!d.should_create);
        assert_eq!(d.duplicate_of.as_deref(), Some("a1"));
    }

    #[test]
    fn test_different_date_type_or_people_creates() {
        let existing = vec![make_activity("a1", 3, ActivityType::Meeting, &["s1"])];
        assert!(reconcile(day(4), ActivityType::Meeting, &ids(&["s1"]), &existing).should_create);
        assert!(reconcile(day(3), ActivityType::Email, &ids(&["s1"]), &existing).should_create);
        assert!(reconcile(day(3), ActivityType::Meeting, &ids(&["s2"]), &existing).should_create);
    }

    #[test]
    fn test_empty_participants_never_create() {
        let d = reconcile(day(3), ActivityType::Call, &[], &[]);
        assert!(!d.should_create);
        assert!(d.duplicate_of.is_none());
    }

    #[test]
    fn test_record_is_idempotent() {
        let mut snap = WorkspaceSnapshot::empty("acme");
        let first = record_activity(&mut snap, make_candidate(5, ActivityType::Meeting, &["s1", "s2"]));
        let second = record_activity(&mut snap, make_candidate(5, ActivityType::Meeting, &["s2"]));

        assert_eq!(first, RecordOutcome::Created("a1".to_string()));
        assert_eq!(second, RecordOutcome::Duplicate("a1".to_string()));
        assert_eq!(snap.activities.len(), 1);
    }

    #[test]
    fn test_record_dedupes_participant_list() {
        let mut snap = WorkspaceSnapshot::empty("acme");
        record_activity(&mut snap, make_candidate(5, ActivityType::Call, &["s1", "s1", "s2"]));
        assert_eq!(snap.activities[0].stakeholder_ids, ids(&["s1", "s2"]));
    }

    #[test]
    fn test_record_skips_empty() {
        let mut snap = WorkspaceSnapshot::empty("acme");
        let outcome = record_activity(&mut snap, make_candidate(5, ActivityType::Slack, &[]));
        assert_eq!(outcome, RecordOutcome::Skipped);
        assert!(outcome.activity_id().is_none());
        assert!(snap.activities.is_empty());
        assert_eq!(snap.counters.next_activity, 1, "no ID consumed");
    }
}
