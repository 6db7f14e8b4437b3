// JSON import/export of a workspace in the flat `stakeholders.json` /
// `activities.json` layout (camelCase, pretty-printed).

use std::collections::HashSet;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::DealError;
use crate::reconcile::IdCounters;
use crate::state::{read_workspace, with_workspace, AppState};
use crate::types::{Activity, Stakeholder};
use crate::util::atomic_write_str;

pub const STAKEHOLDERS_FILE: &str = "stakeholders.json";
pub const ACTIVITIES_FILE: &str = "activities.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSummary {
    pub stakeholders: usize,
    pub activities: usize,
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), DealError> {
    let content = serde_json::to_string_pretty(value)
        .map_err(|e| DealError::Validation(format!("Failed to serialize {}: {}", path.display(), e)))?;
    atomic_write_str(path, &content)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, DealError> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| DealError::Validation(format!("Invalid {}: {}", path.display(), e)))
}

pub fn export_workspace_json(
    state: &AppState,
    workspace_id: &str,
    dir: &Path,
) -> Result<TransferSummary, DealError> {
    let snapshot = read_workspace(state, workspace_id)?;
    write_json(&dir.join(STAKEHOLDERS_FILE), &snapshot.stakeholders)?;
    write_json(&dir.join(ACTIVITIES_FILE), &snapshot.activities)?;
    log::info!(
        "Exported {} stakeholders and {} activities from {} to {}",
        snapshot.stakeholders.len(),
        snapshot.activities.len(),
        workspace_id,
        dir.display()
    );
    Ok(TransferSummary {
        stakeholders: snapshot.stakeholders.len(),
        activities: snapshot.activities.len(),
    })
}

/// Check roster invariants and drop dangling activity references.
fn validate_import(
    stakeholders: &[Stakeholder],
    activities: Vec<Activity>,
) -> Result<Vec<Activity>, DealError> {
    let mut ids = HashSet::new();
    let mut emails = HashSet::new();
    for s in stakeholders {
        if s.id.trim().is_empty() || s.name.trim().is_empty() {
            return Err(DealError::validation("Every stakeholder needs an id and a name."));
        }
        if !ids.insert(s.id.as_str()) {
            return Err(DealError::validation(format!("Duplicate stakeholder id: {}", s.id)));
        }
        if let Some(email) = s.email_key() {
            if !emails.insert(email.clone()) {
                return Err(DealError::validation(format!("Duplicate stakeholder email: {}", email)));
            }
        }
    }

    let mut activity_ids = HashSet::new();
    let mut kept = Vec::with_capacity(activities.len());
    for mut activity in activities {
        if !activity_ids.insert(activity.id.clone()) {
            return Err(DealError::validation(format!("Duplicate activity id: {}", activity.id)));
        }
        activity.stakeholder_ids.retain(|id| ids.contains(id.as_str()));
        if activity.stakeholder_ids.is_empty() {
            log::warn!("Dropping activity {} with no known participants", activity.id);
            continue;
        }
        kept.push(activity);
    }
    Ok(kept)
}

/// Replace a workspace's collections with the files in `dir`.
///
/// A missing activities file imports an empty timeline.
pub fn import_workspace_json(
    state: &AppState,
    workspace_id: &str,
    dir: &Path,
) -> Result<TransferSummary, DealError> {
    let stakeholders: Vec<Stakeholder> = read_json(&dir.join(STAKEHOLDERS_FILE))?;
    let activities_path = dir.join(ACTIVITIES_FILE);
    let activities: Vec<Activity> = if activities_path.exists() {
        read_json(&activities_path)?
    } else {
        Vec::new()
    };
    let stakeholders: Vec<Stakeholder> = stakeholders
        .into_iter()
        .map(|mut s| {
            s.email = s.email_key();
            s
        })
        .collect();
    let activities = validate_import(&stakeholders, activities)?;

    with_workspace(state, workspace_id, |snapshot| {
        // Counters only move forward, so IDs used before the import stay retired.
        snapshot.counters = snapshot.counters.max(IdCounters::seed(&stakeholders, &activities));
        snapshot.stakeholders = stakeholders;
        snapshot.activities = activities;
        log::info!(
            "Imported {} stakeholders and {} activities into {}",
            snapshot.stakeholders.len(),
            snapshot.activities.len(),
            workspace_id
        );
        Ok(TransferSummary {
            stakeholders: snapshot.stakeholders.len(),
            activities: snapshot.activities.len(),
        })
    })
}
