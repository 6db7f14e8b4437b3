// Activity service: manual logging and timelines.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DealError;
use crate::reconcile::{record_activity, ActivityCandidate, RecordOutcome};
use crate::state::{read_workspace, with_workspace, AppState};
use crate::types::{Activity, ActivityType};

/// Request body for logging an interaction by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub stakeholder_ids: Vec<String>,
    #[serde(default)]
    pub summary: String,
}

/// The stored activity, and whether this call created it.
///
/// When `created` is false the interaction was already on record and
/// `activity` is the existing entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedActivity {
    pub activity: Activity,
    pub created: bool,
}

pub fn log_activity(
    state: &AppState,
    workspace_id: &str,
    new: NewActivity,
) -> Result<LoggedActivity, DealError> {
    if new.stakeholder_ids.iter().all(|id| id.trim().is_empty()) {
        return Err(DealError::validation("Select at least one stakeholder."));
    }

    with_workspace(state, workspace_id, |snapshot| {
        let participant_ids: Vec<String> = new
            .stakeholder_ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        if let Some(missing) = participant_ids.iter().find(|id| snapshot.stakeholder(id).is_none()) {
            return Err(DealError::not_found("stakeholder", missing.as_str()));
        }

        let outcome = record_activity(
            snapshot,
            ActivityCandidate {
                date: new.date,
                activity_type: new.activity_type,
                participant_ids,
                summary: new.summary.trim().to_string(),
            },
        );
        let created = outcome.created();
        let activity = match &outcome {
            RecordOutcome::Created(id) | RecordOutcome::Duplicate(id) => snapshot.activity(id).cloned(),
            RecordOutcome::Skipped => None,
        }
        .ok_or_else(|| DealError::validation("Select at least one stakeholder."))?;

        if created {
            log::info!("Logged {} {} on {}", activity.activity_type, activity.id, activity.date);
        } else {
            log::info!("Activity already recorded as {}", activity.id);
        }
        Ok(LoggedActivity { activity, created })
    })
}

/// Newest first. Activities on the same date keep their stored order.
pub fn list_activities(state: &AppState, workspace_id: &str) -> Result<Vec<Activity>, DealError> {
    let mut activities = read_workspace(state, workspace_id)?.activities;
    activities.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(activities)
}

/// One stakeholder's activities, newest first.
pub fn stakeholder_timeline(
    state: &AppState,
    workspace_id: &str,
    stakeholder_id: &str,
) -> Result<Vec<Activity>, DealError> {
    let snapshot = read_workspace(state, workspace_id)?;
    if snapshot.stakeholder(stakeholder_id).is_none() {
        return Err(DealError::not_found("stakeholder", stakeholder_id));
    }
    let mut timeline: Vec<Activity> = snapshot
        .activities
        .into_iter()
        .filter(|a| a.involves(stakeholder_id))
        .collect();
    timeline.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(timeline)
}
