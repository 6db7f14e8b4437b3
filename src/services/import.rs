// Smart import: oracle extraction from a transcript, then user-confirmed
// creation, merge and activity logging.
//
// Parsing never writes. Nothing reaches the store until the user confirms a
// payload, and confirmation is a single workspace pass.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DealError;
use crate::intelligence::{
    build_import_prompt, parse_import_response, ActionItem, ExtractedStakeholder, ProposedActivity,
    SentimentSignal,
};
use crate::pty::Oracle;
use crate::reconcile::{
    merge, record_activity, resolve, ActivityCandidate, MergeSource, Provenance, RecordOutcome,
    StakeholderUpdate, WorkspaceSnapshot,
};
use crate::services::stakeholders::email_in_use;
use crate::state::{read_workspace, with_workspace, AppState};
use crate::types::{Activity, ActivityType, DealRole, NewStakeholder, Priority, RelationshipStrength, Stakeholder};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Existing,
    New,
}

/// An extracted person annotated with the identity resolver's verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportCandidate {
    #[serde(flatten)]
    pub extracted: ExtractedStakeholder,
    pub match_status: MatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_stakeholder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_confidence: Option<u8>,
}

/// What `parse_import` hands back for review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedImport {
    pub stakeholders: Vec<ImportCandidate>,
    pub action_items: Vec<ActionItem>,
    pub sentiment_signals: Vec<SentimentSignal>,
    pub proposed_activity: Option<ProposedActivity>,
}

/// A reviewed change to an existing stakeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportUpdate {
    pub id: String,
    #[serde(flatten)]
    pub update: StakeholderUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportActivity {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub summary: String,
}

/// The reviewed selection the user confirms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPayload {
    pub stakeholders: Vec<ImportCandidate>,
    #[serde(default)]
    pub stakeholder_updates: Vec<ImportUpdate>,
    pub activity: ImportActivity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResult {
    pub created_stakeholders: Vec<Stakeholder>,
    pub updated_stakeholders: Vec<Stakeholder>,
    /// The recorded activity, or the existing one it duplicated.
    pub activity: Option<Activity>,
    pub activity_created: bool,
}

// =============================================================================
// Parse
// =============================================================================

/// Ask the oracle to extract people and an activity, then mark each person
/// as an existing stakeholder or a new one.
pub fn parse_import(
    state: &AppState,
    oracle: &dyn Oracle,
    workspace_id: &str,
    transcript: &str,
    source_type: ActivityType,
    today: NaiveDate,
) -> Result<ParsedImport, DealError> {
    if transcript.trim().is_empty() {
        return Err(DealError::validation(
            "Please provide a transcript or email content to analyze.",
        ));
    }

    let snapshot = read_workspace(state, workspace_id)?;
    let workspace = state.db.lock().get_workspace(workspace_id)?;
    let prompt = build_import_prompt(
        transcript,
        source_type,
        workspace.as_ref(),
        &snapshot.stakeholders,
        today,
    );

    let response = oracle.complete(&prompt)?;
    let extraction = parse_import_response(&response)?;

    let stakeholders = extraction
        .stakeholders
        .into_iter()
        .map(|extracted| enrich(extracted, &snapshot.stakeholders))
        .collect::<Vec<_>>();

    log::info!(
        "Smart import parsed {} people ({} matched) for {}",
        stakeholders.len(),
        stakeholders
            .iter()
            .filter(|c| c.match_status == MatchStatus::Existing)
            .count(),
        workspace_id
    );

    Ok(ParsedImport {
        stakeholders,
        action_items: extraction.action_items,
        sentiment_signals: extraction.sentiment_signals,
        proposed_activity: extraction.proposed_activity,
    })
}

fn enrich(mut extracted: ExtractedStakeholder, roster: &[Stakeholder]) -> ImportCandidate {
    let Some(found) = resolve(&extracted.name, extracted.email.as_deref(), roster) else {
        return ImportCandidate {
            extracted,
            match_status: MatchStatus::New,
            matched_stakeholder_id: None,
            match_confidence: None,
        };
    };
    if let Some(existing) = roster.iter().find(|s| s.id == found.id) {
        extracted.name = existing.name.clone();
    }
    ImportCandidate {
        extracted,
        match_status: MatchStatus::Existing,
        matched_stakeholder_id: Some(found.id),
        match_confidence: Some(found.confidence),
    }
}

// =============================================================================
// Confirm
// =============================================================================

/// Apply a reviewed import in one pass.
pub fn confirm_import(
    state: &AppState,
    workspace_id: &str,
    payload: &ConfirmPayload,
) -> Result<ConfirmResult, DealError> {
    if payload.stakeholders.is_empty() {
        return Err(DealError::validation("Select at least one stakeholder to import."));
    }

    with_workspace(state, workspace_id, |snapshot| {
        let result = apply_confirmation(snapshot, payload)?;
        log::info!(
            "Smart import confirmed for {}: {} created, {} updated, activity {}",
            workspace_id,
            result.created_stakeholders.len(),
            result.updated_stakeholders.len(),
            match (&result.activity, result.activity_created) {
                (Some(a), true) => format!("{} created", a.id),
                (Some(a), false) => format!("matched {}", a.id),
                (None, _) => "skipped".to_string(),
            }
        );
        Ok(result)
    })
}

fn new_stakeholder_from(candidate: &ExtractedStakeholder, contact_date: NaiveDate) -> NewStakeholder {
    NewStakeholder {
        name: candidate.name.clone(),
        title: candidate.title.clone().unwrap_or_default(),
        team: candidate.team.clone().unwrap_or_default(),
        role: candidate.role.unwrap_or(DealRole::Influencer),
        priority: candidate.priority.unwrap_or(Priority::P2),
        last_contact_date: Some(contact_date),
        relationship_strength: candidate
            .relationship_strength
            .unwrap_or(RelationshipStrength::Unknown),
        key_priorities: candidate.key_priorities.clone(),
        notes: candidate.notes.clone().unwrap_or_default(),
        email: candidate.email.clone(),
    }
}

pub(crate) fn apply_confirmation(
    snapshot: &mut WorkspaceSnapshot,
    payload: &ConfirmPayload,
) -> Result<ConfirmResult, DealError> {
    let date = payload.activity.date;
    let provenance = Provenance::new(MergeSource::SmartImport, date);
    let mut result = ConfirmResult::default();
    let mut participants: Vec<String> = Vec::new();

    for candidate in &payload.stakeholders {
        let id = match (candidate.match_status, candidate.matched_stakeholder_id.as_deref()) {
            (MatchStatus::Existing, Some(id)) => {
                if snapshot.stakeholder(id).is_none() {
                    return Err(DealError::not_found("stakeholder", id));
                }
                id.to_string()
            }
            (MatchStatus::Existing, None) => {
                log::warn!("Import candidate {} has no matched ID, skipping", candidate.extracted.name);
                continue;
            }
            (MatchStatus::New, _) => {
                let owner = candidate
                    .extracted
                    .email
                    .as_deref()
                    .and_then(|e| snapshot.stakeholder_by_email(e))
                    .map(|s| s.id.clone());
                match owner {
                    // Email already on file: same person, no duplicate.
                    Some(id) => {
                        let update = StakeholderUpdate {
                            last_contact_date: Some(date),
                            ..StakeholderUpdate::default()
                        };
                        apply_merge(snapshot, &id, &update, provenance, &mut result)?;
                        id
                    }
                    None => {
                        let id = snapshot.insert_stakeholder(new_stakeholder_from(&candidate.extracted, date));
                        if let Some(created) = snapshot.stakeholder(&id) {
                            result.created_stakeholders.push(created.clone());
                        }
                        id
                    }
                }
            }
        };
        if !participants.contains(&id) {
            participants.push(id);
        }
    }

    for item in &payload.stakeholder_updates {
        if snapshot.stakeholder(&item.id).is_none() {
            log::warn!("Import update for unknown stakeholder {}, skipping", item.id);
            continue;
        }
        apply_merge(snapshot, &item.id, &item.update, provenance, &mut result)?;
    }

    let outcome = record_activity(
        snapshot,
        ActivityCandidate {
            date,
            activity_type: payload.activity.activity_type,
            participant_ids: participants,
            summary: format!("[Smart Import] {}", payload.activity.summary.trim()),
        },
    );
    result.activity_created = outcome.created();
    result.activity = match outcome {
        RecordOutcome::Created(id) | RecordOutcome::Duplicate(id) => snapshot.activity(&id).cloned(),
        RecordOutcome::Skipped => None,
    };
    Ok(result)
}

fn apply_merge(
    snapshot: &mut WorkspaceSnapshot,
    id: &str,
    update: &StakeholderUpdate,
    provenance: Provenance,
    result: &mut ConfirmResult,
) -> Result<(), DealError> {
    if let Some(email) = update.email.as_deref().filter(|e| !e.trim().is_empty()) {
        if snapshot.email_taken(email, Some(id)) {
            return Err(email_in_use(email));
        }
    }
    let Some(existing) = snapshot.stakeholder(id) else {
        return Ok(());
    };
    let outcome = merge(existing, update, provenance);
    if !outcome.is_changed() {
        return Ok(());
    }
    log::debug!("Smart import updated {} ({})", id, outcome.changed.join(", "));
    if let Some(slot) = snapshot.stakeholder_mut(id) {
        *slot = outcome.stakeholder.clone();
    }
    result.updated_stakeholders.retain(|s| s.id != id);
    result.updated_stakeholders.push(outcome.stakeholder);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pty::StaticOracle;
    use crate::services::stakeholders::{add_stakeholder, get_stakeholder};
    use crate::state::test_utils::test_state;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 20).unwrap()
    }

    fn seed(state: &AppState) {
        let dana: NewStakeholder = serde_json::from_value(serde_json::json!({
            "name": "Dana Park",
            "role": "Economic Buyer",
            "priority": "P0",
            "lastContactDate": "2026-03-01",
            "keyPriorities": ["cost"],
            "notes": "Owns budget"
        }))
        .unwrap();
        add_stakeholder(state, "ws", dana).unwrap();
    }

    const ORACLE_RESPONSE: &str = r#"```json
{
  "stakeholders": [
    {"name": "dana park", "title": "CFO", "keyPriorities": ["security"]},
    {"name": "Lee Wong", "title": "Staff Engineer", "team": "Engineering Infrastructure",
     "role": "Technical Buyer", "priority": "P1", "email": "Lee@acme.com"}
  ],
  "actionItems": [{"description": "Send SOC2 report", "owner": "us"}],
  "sentimentSignals": [],
  "proposedActivity": {"date": "2026-03-18", "type": "Meeting",
                       "summary": "Security review", "stakeholderNames": ["Dana Park", "Lee Wong"]}
}
```"#;

    #[test]
    fn test_parse_import_enriches_matches() {
        let state = test_state();
        seed(&state);
        let oracle = StaticOracle::new(ORACLE_RESPONSE);

        let parsed = parse_import(&state, &oracle, "ws", "transcript text", ActivityType::Meeting, today())
            .unwrap();
        assert_eq!(parsed.stakeholders.len(), 2);

        let dana = &parsed.stakeholders[0];
        assert_eq!(dana.match_status, MatchStatus::Existing);
        assert_eq!(dana.matched_stakeholder_id.as_deref(), Some("s1"));
        assert_eq!(dana.match_confidence, Some(100));
        assert_eq!(dana.extracted.name, "Dana Park", "display name taken from roster");

        let lee = &parsed.stakeholders[1];
        assert_eq!(lee.match_status, MatchStatus::New);
        assert!(lee.matched_stakeholder_id.is_none());
        assert_eq!(parsed.action_items.len(), 1);
        assert!(parsed.proposed_activity.is_some());
    }

    #[test]
    fn test_parse_import_validation_and_parse_error() {
        let state = test_state();
        let oracle = StaticOracle::new("not json at all");
        let err = parse_import(&state, &oracle, "ws", "   ", ActivityType::Call, today()).unwrap_err();
        assert!(matches!(err, DealError::Validation(_)));

        let err = parse_import(&state, &oracle, "ws", "hello", ActivityType::Call, today()).unwrap_err();
        assert!(matches!(err, DealError::Parse(_)));
    }

    #[test]
    fn test_candidate_json_is_flat() {
        let candidate = ImportCandidate {
            extracted: serde_json::from_value(serde_json::json!({"name": "Lee Wong"})).unwrap(),
            match_status: MatchStatus::New,
            matched_stakeholder_id: None,
            match_confidence: None,
        };
        let v = serde_json::to_value(&candidate).unwrap();
        assert_eq!(v["name"], "Lee Wong");
        assert_eq!(v["matchStatus"], "new");
        assert!(v.get("matchedStakeholderId").is_none());
    }

    fn make_payload(state: &AppState) -> ConfirmPayload {
        let oracle = StaticOracle::new(ORACLE_RESPONSE);
        let parsed = parse_import(state, &oracle, "ws", "transcript", ActivityType::Meeting, today()).unwrap();
        ConfirmPayload {
            stakeholders: parsed.stakeholders,
            stakeholder_updates: vec![ImportUpdate {
                id: "s1".to_string(),
                update: StakeholderUpdate {
                    last_contact_date: NaiveDate::from_ymd_opt(2026, 3, 18),
                    key_priorities: vec!["security".to_string()],
                    relationship_strength: Some(RelationshipStrength::Neutral),
                    notes: Some("Wants SOC2 before signing".to_string()),
                    ..StakeholderUpdate::default()
                },
            }],
            activity: ImportActivity {
                date: NaiveDate::from_ymd_opt(2026, 3, 18).unwrap(),
                activity_type: ActivityType::Meeting,
                summary: "Security review".to_string(),
            },
        }
    }

    #[test]
    fn test_confirm_import_creates_merges_and_logs() {
        let state = test_state();
        seed(&state);
        let payload = make_payload(&state);

        let result = confirm_import(&state, "ws", &payload).unwrap();
        assert_eq!(result.created_stakeholders.len(), 1);
        let lee = &result.created_stakeholders[0];
        assert_eq!(lee.id, "s2");
        assert_eq!(lee.email.as_deref(), Some("lee@acme.com"));
        assert_eq!(lee.last_contact_date, NaiveDate::from_ymd_opt(2026, 3, 18));
        assert_eq!(lee.relationship_strength, RelationshipStrength::Unknown);

        let dana = get_stakeholder(&state, "ws", "s1").unwrap();
        assert_eq!(dana.last_contact_date, NaiveDate::from_ymd_opt(2026, 3, 18));
        assert_eq!(dana.key_priorities, vec!["cost", "security"]);
        assert_eq!(dana.relationship_strength, RelationshipStrength::Neutral);
        assert_eq!(
            dana.notes,
            "Owns budget\n\n[Smart Import 2026-03-18] Wants SOC2 before signing"
        );
        assert_eq!(result.updated_stakeholders.len(), 1);

        let activity = result.activity.unwrap();
        assert!(result.activity_created);
        assert_eq!(activity.summary, "[Smart Import] Security review");
        assert_eq!(activity.stakeholder_ids, vec!["s1", "s2"]);
    }

    #[test]
    fn test_confirm_twice_does_not_duplicate_activity_or_email() {
        let state = test_state();
        seed(&state);
        let payload = make_payload(&state);
        confirm_import(&state, "ws", &payload).unwrap();

        let again = confirm_import(&state, "ws", &payload).unwrap();
        assert!(again.created_stakeholders.is_empty(), "email already on file");
        assert!(!again.activity_created);
        assert_eq!(again.activity.unwrap().id, "a1");
        assert_eq!(
            crate::services::stakeholders::list_stakeholders(&state, "ws").unwrap().len(),
            2
        );
    }

    #[test]
    fn test_confirm_never_moves_contact_backward() {
        let state = test_state();
        seed(&state);
        let mut payload = make_payload(&state);
        payload.stakeholder_updates[0].update.last_contact_date = NaiveDate::from_ymd_opt(2026, 2, 1);
        payload.activity.date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        confirm_import(&state, "ws", &payload).unwrap();

        let dana = get_stakeholder(&state, "ws", "s1").unwrap();
        assert_eq!(dana.last_contact_date, NaiveDate::from_ymd_opt(2026, 3, 1));
    }

    #[test]
    fn test_confirm_empty_selection_and_stale_match() {
        let state = test_state();
        seed(&state);
        let mut payload = make_payload(&state);
        payload.stakeholders.clear();
        assert!(matches!(
            confirm_import(&state, "ws", &payload),
            Err(DealError::Validation(_))
        ));

        let mut payload = make_payload(&state);
        payload.stakeholders[0].matched_stakeholder_id = Some("s77".to_string());
        assert!(matches!(
            confirm_import(&state, "ws", &payload),
            Err(DealError::NotFound { .. })
        ));
        assert_eq!(
            crate::services::stakeholders::list_stakeholders(&state, "ws").unwrap().len(),
            1,
            "failed confirmation writes nothing"
        );
    }

    #[test]
    fn test_confirm_rejects_update_to_email_held_by_another() {
        let state = test_state();
        let make = |name: &str, email: Option<&str>| -> NewStakeholder {
            serde_json::from_value(serde_json::json!({ "name": name, "email": email })).unwrap()
        };
        add_stakeholder(&state, "ws", make("Dana Park", Some("dana@acme.com"))).unwrap();
        add_stakeholder(&state, "ws", make("Lee Wong", None)).unwrap();

        let payload = ConfirmPayload {
            stakeholders: vec![ImportCandidate {
                extracted: serde_json::from_value(serde_json::json!({"name": "Lee Wong"})).unwrap(),
                match_status: MatchStatus::Existing,
                matched_stakeholder_id: Some("s2".to_string()),
                match_confidence: Some(100),
            }],
            stakeholder_updates: vec![ImportUpdate {
                id: "s2".to_string(),
                update: StakeholderUpdate {
                    email: Some("DANA@acme.com".to_string()),
                    ..StakeholderUpdate::default()
                },
            }],
            activity: ImportActivity {
                date: NaiveDate::from_ymd_opt(2026, 3, 18).unwrap(),
                activity_type: ActivityType::Call,
                summary: "Intro".to_string(),
            },
        };

        assert!(matches!(
            confirm_import(&state, "ws", &payload),
            Err(DealError::Validation(_))
        ));
        let snapshot = read_workspace(&state, "ws").unwrap();
        let lee = snapshot.stakeholder("s2").unwrap();
        assert!(lee.email.is_none());
        assert!(snapshot.activities.is_empty());

        let holders = snapshot
            .stakeholders
            .iter()
            .filter(|s| s.email.as_deref() == Some("dana@acme.com"))
            .count();
        assert_eq!(holders, 1);
    }
}
