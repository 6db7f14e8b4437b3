// Stakeholder service: direct CRUD on a workspace's roster.
//
// Email is the strongest identity key, so every write path refuses an email
// that another stakeholder in the workspace already holds.

use crate::error::DealError;
use crate::reconcile::{apply_patch, RemovedStakeholder};
use crate::state::{read_workspace, with_workspace, AppState};
use crate::types::{NewStakeholder, Stakeholder, StakeholderPatch};

pub(crate) fn email_in_use(email: &str) -> DealError {
    DealError::validation(format!(
        "A stakeholder with email {} already exists.",
        email.trim().to_lowercase()
    ))
}

pub fn list_stakeholders(state: &AppState, workspace_id: &str) -> Result<Vec<Stakeholder>, DealError> {
    Ok(read_workspace(state, workspace_id)?.stakeholders)
}

pub fn get_stakeholder(state: &AppState, workspace_id: &str, id: &str) -> Result<Stakeholder, DealError> {
    read_workspace(state, workspace_id)?
        .stakeholder(id)
        .cloned()
        .ok_or_else(|| DealError::not_found("stakeholder", id))
}

pub fn add_stakeholder(
    state: &AppState,
    workspace_id: &str,
    new: NewStakeholder,
) -> Result<Stakeholder, DealError> {
    if new.name.trim().is_empty() {
        return Err(DealError::validation("Name is required"));
    }
    with_workspace(state, workspace_id, |snapshot| {
        if let Some(email) = new.email.as_deref() {
            if snapshot.email_taken(email, None) {
                return Err(email_in_use(email));
            }
        }
        let id = snapshot.insert_stakeholder(new);
        let created = snapshot
            .stakeholder(&id)
            .cloned()
            .ok_or_else(|| DealError::not_found("stakeholder", id.as_str()))?;
        log::info!("Added stakeholder {} ({}) to {}", created.id, created.name, workspace_id);
        Ok(created)
    })
}

/// Direct edit. Present fields win; the ID never changes.
pub fn update_stakeholder(
    state: &AppState,
    workspace_id: &str,
    id: &str,
    patch: &StakeholderPatch,
) -> Result<Stakeholder, DealError> {
    with_workspace(state, workspace_id, |snapshot| {
        let existing = snapshot
            .stakeholder(id)
            .ok_or_else(|| DealError::not_found("stakeholder", id))?;
        if let Some(email) = patch.email.as_deref().filter(|e| !e.trim().is_empty()) {
            if snapshot.email_taken(email, Some(id)) {
                return Err(email_in_use(email));
            }
        }

        let updated = apply_patch(existing, patch);
        if let Some(slot) = snapshot.stakeholder_mut(id) {
            *slot = updated.clone();
        }
        Ok(updated)
    })
}

/// Delete a stakeholder, dropping them from every activity and deleting
/// activities left without participants.
pub fn delete_stakeholder(
    state: &AppState,
    workspace_id: &str,
    id: &str,
) -> Result<RemovedStakeholder, DealError> {
    with_workspace(state, workspace_id, |snapshot| {
        let removed = snapshot
            .remove_stakeholder(id)
            .ok_or_else(|| DealError::not_found("stakeholder", id))?;
        log::info!(
            "Deleted stakeholder {} from {} ({} activities removed, {} trimmed)",
            id,
            workspace_id,
            removed.activities_removed.len(),
            removed.activities_trimmed
        );
        Ok(removed)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::activities::{list_activities, log_activity, NewActivity};
    use crate::state::test_utils::test_state;
    use crate::types::{ActivityType, DealRole, Priority};
    use chrono::NaiveDate;

    fn make_new(name: &str, email: Option<&str>) -> NewStakeholder {
        let mut new: NewStakeholder =
            serde_json::from_value(serde_json::json!({ "name": name })).unwrap();
        new.email = email.map(str::to_string);
        new
    }

    fn make_activity(ids: &[&str]) -> NewActivity {
        NewActivity {
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            activity_type: ActivityType::Call,
            stakeholder_ids: ids.iter().map(|s| s.to_string()).collect(),
            summary: "Pricing call".to_string(),
        }
    }

    #[test]
    fn test_add_and_get() {
        let state = test_state();
        let s = add_stakeholder(&state, "ws", make_new(" Dana Park ", Some("Dana@Acme.com"))).unwrap();
        assert_eq!(s.id, "s1");
        assert_eq!(s.name, "Dana Park");
        assert_eq!(s.email.as_deref(), Some("dana@acme.com"));
        assert_eq!(s.role, DealRole::Influencer);
        assert_eq!(s.priority, Priority::P2);
        assert_eq!(get_stakeholder(&state, "ws", "s1").unwrap(), s);
        assert!(matches!(
            get_stakeholder(&state, "ws", "s9"),
            Err(DealError::NotFound { kind: "stakeholder", .. })
        ));
    }

    #[test]
    fn test_add_requires_name() {
        let state = test_state();
        let err = add_stakeholder(&state, "ws", make_new("  ", None)).unwrap_err();
        assert!(matches!(err, DealError::Validation(_)));
    }

    #[test]
    fn test_add_rejects_duplicate_email_case_insensitive() {
        let state = test_state();
        add_stakeholder(&state, "ws", make_new("Dana Park", Some("dana@acme.com"))).unwrap();
        let err = add_stakeholder(&state, "ws", make_new("D. Park", Some("DANA@acme.com"))).unwrap_err();
        assert!(matches!(err, DealError::Validation(_)));
        assert_eq!(list_stakeholders(&state, "ws").unwrap().len(), 1);
    }

    #[test]
    fn test_update_patch_semantics() {
        let state = test_state();
        add_stakeholder(&state, "ws", make_new("Dana Park", None)).unwrap();
        add_stakeholder(&state, "ws", make_new("Lee Wong", Some("lee@acme.com"))).unwrap();

        let patch = StakeholderPatch {
            title: Some("VP Finance".into()),
            role: Some(DealRole::EconomicBuyer),
            ..StakeholderPatch::default()
        };
        let updated = update_stakeholder(&state, "ws", "s1", &patch).unwrap();
        assert_eq!(updated.id, "s1");
        assert_eq!(updated.title, "VP Finance");
        assert_eq!(updated.role, DealRole::EconomicBuyer);
        assert_eq!(updated.name, "Dana Park");

        let steal = StakeholderPatch {
            email: Some("Lee@acme.com".into()),
            ..StakeholderPatch::default()
        };
        assert!(matches!(
            update_stakeholder(&state, "ws", "s1", &steal),
            Err(DealError::Validation(_))
        ));

        let keep_own = StakeholderPatch {
            email: Some("lee@acme.com".into()),
            ..StakeholderPatch::default()
        };
        assert!(update_stakeholder(&state, "ws", "s2", &keep_own).is_ok());
    }

    #[test]
    fn test_delete_cascades_to_activities() {
        let state = test_state();
        add_stakeholder(&state, "ws", make_new("Dana Park", None)).unwrap();
        add_stakeholder(&state, "ws", make_new("Lee Wong", None)).unwrap();
        log_activity(&state, "ws", make_activity(&["s1"])).unwrap();
        let mut shared = make_activity(&["s1", "s2"]);
        shared.activity_type = ActivityType::Meeting;
        log_activity(&state, "ws", shared).unwrap();

        let removed = delete_stakeholder(&state, "ws", "s1").unwrap();
        assert_eq!(removed.activities_removed, vec!["a1"]);
        assert_eq!(removed.activities_trimmed, 1);

        let remaining = list_activities(&state, "ws").unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].stakeholder_ids, vec!["s2"]);

        assert!(matches!(
            delete_stakeholder(&state, "ws", "s1"),
            Err(DealError::NotFound { .. })
        ));
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let state = test_state();
        add_stakeholder(&state, "ws", make_new("Dana Park", None)).unwrap();
        add_stakeholder(&state, "ws", make_new("Lee Wong", None)).unwrap();
        delete_stakeholder(&state, "ws", "s2").unwrap();
        let next = add_stakeholder(&state, "ws", make_new("Ana Ruiz", None)).unwrap();
        assert_eq!(next.id, "s3");
    }
}
