// Gmail and Calendar sync passes.
//
// Each pass fetches and normalizes first, then runs the reconciliation over
// a locked in-memory snapshot and commits it together with the sync state.
// A fetch failure returns before the workspace is touched.

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::error::DealError;
use crate::google_api::calendar::{fetch_events, EventCandidate};
use crate::google_api::gmail::{fetch_recent_messages, EmailCandidate};
use crate::google_api::{self, load_token};
use crate::reconcile::{
    domain_allows_auto_create, merge, record_activity, resolve, ActivityCandidate, MergeSource,
    Provenance, RecordOutcome, StakeholderUpdate, WorkspaceSnapshot,
};
use crate::state::{read_workspace, with_workspace_sync, AppState};
use crate::types::{
    ActivityType, Config, DealRole, NewStakeholder, Priority, RelationshipStrength, SyncResult,
    SyncSource, SyncState,
};
use crate::util::truncate_chars;

/// Sync state older than this is reported as stale.
pub const STALE_AFTER_HOURS: i64 = 24;

const SNIPPET_CHARS: usize = 150;
const SUBJECTS_IN_NOTE: usize = 3;

/// Settings a reconciliation pass needs from config and the token file.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub account_domains: Vec<String>,
    pub min_email_threads: usize,
    /// The connected account; never treated as a stakeholder.
    pub own_email: Option<String>,
}

impl SyncOptions {
    pub fn from_config(config: &Config, own_email: Option<String>) -> Self {
        Self {
            account_domains: config.account_domains.clone(),
            min_email_threads: config.min_email_threads_for_new_contact,
            own_email: own_email.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty()),
        }
    }

    fn is_own(&self, email: &str) -> bool {
        self.own_email.as_deref() == Some(email.trim().to_lowercase().as_str())
    }
}

fn auto_detected(name: &str, email: &str, last_contact: Option<NaiveDate>, notes: String) -> NewStakeholder {
    NewStakeholder {
        name: name.to_string(),
        title: "Unknown".to_string(),
        team: "Unknown".to_string(),
        role: DealRole::Influencer,
        priority: Priority::P2,
        last_contact_date: last_contact,
        relationship_strength: RelationshipStrength::Unknown,
        key_priorities: Vec::new(),
        notes,
        email: Some(email.to_string()),
    }
}

/// Fill the email and advance last contact. Returns a detail line when
/// anything changed.
fn touch_contact(
    snapshot: &mut WorkspaceSnapshot,
    id: &str,
    email: &str,
    date: Option<NaiveDate>,
    provenance: Provenance,
) -> Option<String> {
    let existing = snapshot.stakeholder(id)?;
    let update = StakeholderUpdate {
        email: Some(email.to_string()),
        last_contact_date: date,
        ..StakeholderUpdate::default()
    };
    let outcome = merge(existing, &update, provenance);
    if !outcome.is_changed() {
        return None;
    }

    let mut parts = Vec::new();
    if outcome.changed.contains(&"email") {
        parts.push("added email");
    }
    if outcome.changed.contains(&"lastContactDate") {
        parts.push("updated last contact");
    }
    let detail = format!("Updated {}: {}", outcome.stakeholder.name, parts.join(", "));
    if let Some(slot) = snapshot.stakeholder_mut(id) {
        *slot = outcome.stakeholder;
    }
    Some(detail)
}

// =============================================================================
// Email pass
// =============================================================================

struct SenderGroup<'a> {
    email: &'a str,
    name: &'a str,
    messages: Vec<&'a EmailCandidate>,
}

fn group_by_sender(candidates: &[EmailCandidate]) -> Vec<SenderGroup<'_>> {
    let mut groups: Vec<SenderGroup<'_>> = Vec::new();
    for candidate in candidates {
        match groups.iter_mut().find(|g| g.email == candidate.sender_email) {
            Some(group) => {
                if group.name.trim().is_empty() {
                    group.name = &candidate.sender_name;
                }
                group.messages.push(candidate);
            }
            None => groups.push(SenderGroup {
                email: &candidate.sender_email,
                name: &candidate.sender_name,
                messages: vec![candidate],
            }),
        }
    }
    groups
}

/// Reconcile normalized Gmail messages into the snapshot.
pub fn apply_email_candidates(
    snapshot: &mut WorkspaceSnapshot,
    candidates: &[EmailCandidate],
    options: &SyncOptions,
    today: NaiveDate,
) -> SyncResult {
    let mut result = SyncResult::default();
    let provenance = Provenance::new(MergeSource::GmailSync, today);

    for group in group_by_sender(candidates) {
        if group.email.is_empty() || options.is_own(group.email) {
            continue;
        }
        let latest = group.messages.iter().map(|m| m.date).max();

        let id = match resolve(group.name, Some(group.email), &snapshot.stakeholders) {
            Some(found) => {
                if let Some(detail) = touch_contact(snapshot, &found.id, group.email, latest, provenance) {
                    result.updated_stakeholders += 1;
                    result.details.push(detail);
                }
                found.id
            }
            None => {
                let threads: HashSet<&str> =
                    group.messages.iter().map(|m| m.thread_id.as_str()).collect();
                if !domain_allows_auto_create(group.email, &options.account_domains)
                    || threads.len() < options.min_email_threads
                {
                    log::debug!(
                        "Skipping unknown sender {} ({} threads)",
                        group.email,
                        threads.len()
                    );
                    continue;
                }
                let subjects: Vec<&str> = group
                    .messages
                    .iter()
                    .map(|m| m.subject.as_str())
                    .filter(|s| !s.is_empty())
                    .take(SUBJECTS_IN_NOTE)
                    .collect();
                let notes = format!(
                    "Auto-detected from Gmail. {} email threads found. Subjects: {}",
                    threads.len(),
                    subjects.join("; ")
                );
                let id = snapshot.insert_stakeholder(auto_detected(group.name, group.email, latest, notes));
                result.new_contacts += 1;
                result
                    .details
                    .push(format!("New contact detected: {} ({})", group.name, group.email));
                id
            }
        };

        let display_name = snapshot
            .stakeholder(&id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| group.name.to_string());

        for message in &group.messages {
            let (activity_type, summary, detail) = if message.is_invite {
                (
                    ActivityType::Meeting,
                    format!("[Auto-logged from Gmail] Meeting invite: {}", message.subject),
                    format!(
                        "Logged meeting from invite: \"{}\" with {}",
                        message.subject, display_name
                    ),
                )
            } else {
                (
                    ActivityType::Email,
                    format!(
                        "[Auto-logged from Gmail] Subject: {}. {}",
                        message.subject,
                        truncate_chars(&message.snippet, SNIPPET_CHARS)
                    ),
                    format!("Logged email: \"{}\" with {}", message.subject, display_name),
                )
            };
            let outcome = record_activity(
                snapshot,
                ActivityCandidate {
                    date: message.date,
                    activity_type,
                    participant_ids: vec![id.clone()],
                    summary,
                },
            );
            if let RecordOutcome::Created(_) = outcome {
                result.new_activities += 1;
                result.details.push(detail);
            }
        }
    }
    result
}

// =============================================================================
// Calendar pass
// =============================================================================

/// Reconcile normalized calendar events into the snapshot.
///
/// Future events may introduce new attendees but neither advance last
/// contact nor log a meeting.
pub fn apply_calendar_candidates(
    snapshot: &mut WorkspaceSnapshot,
    events: &[EventCandidate],
    options: &SyncOptions,
    today: NaiveDate,
) -> SyncResult {
    let mut result = SyncResult::default();
    let provenance = Provenance::new(MergeSource::CalendarSync, today);

    for event in events {
        let past = event.date <= today;
        let mut participant_ids: Vec<String> = Vec::new();

        for attendee in &event.attendees {
            if attendee.email.is_empty() || options.is_own(&attendee.email) {
                continue;
            }
            let id = match resolve(&attendee.name, Some(&attendee.email), &snapshot.stakeholders) {
                Some(found) => {
                    if past {
                        if let Some(detail) =
                            touch_contact(snapshot, &found.id, &attendee.email, Some(event.date), provenance)
                        {
                            result.updated_stakeholders += 1;
                            result.details.push(detail);
                        }
                    }
                    found.id
                }
                None => {
                    if !domain_allows_auto_create(&attendee.email, &options.account_domains) {
                        continue;
                    }
                    let notes = format!(
                        "Auto-detected from Google Calendar. First seen in meeting: \"{}\"",
                        event.summary
                    );
                    let last_contact = past.then_some(event.date);
                    let id = snapshot.insert_stakeholder(auto_detected(
                        &attendee.name,
                        &attendee.email,
                        last_contact,
                        notes,
                    ));
                    result.new_contacts += 1;
                    result.details.push(format!(
                        "New attendee detected: {} ({}) from \"{}\"",
                        attendee.name, attendee.email, event.summary
                    ));
                    id
                }
            };
            if !participant_ids.contains(&id) {
                participant_ids.push(id);
            }
        }

        if !past || participant_ids.is_empty() {
            continue;
        }

        let names: Vec<String> = participant_ids
            .iter()
            .filter_map(|id| snapshot.stakeholder(id).map(|s| s.name.clone()))
            .collect();
        let mut summary = format!("[Auto-logged from Calendar] {}", event.summary);
        if !names.is_empty() {
            summary.push_str(&format!(" with {}", names.join(", ")));
        }
        if !event.location.trim().is_empty() {
            summary.push_str(&format!(" at {}", event.location.trim()));
        }

        let count = participant_ids.len();
        let outcome = record_activity(
            snapshot,
            ActivityCandidate {
                date: event.date,
                activity_type: ActivityType::Meeting,
                participant_ids,
                summary,
            },
        );
        if outcome.created() {
            result.new_activities += 1;
            result.details.push(format!(
                "Logged meeting: \"{}\" on {} with {} stakeholders",
                event.summary, event.date, count
            ));
        }
    }
    result
}

// =============================================================================
// Passes
// =============================================================================

fn connected_account(state: &AppState) -> Option<String> {
    load_token(&state.token_path()).ok().and_then(|t| t.account)
}

fn finish(
    state: &AppState,
    workspace_id: &str,
    source: SyncSource,
    apply: impl FnOnce(&mut WorkspaceSnapshot) -> SyncResult,
) -> Result<SyncResult, DealError> {
    let result = with_workspace_sync(state, workspace_id, |snapshot| {
        let result = apply(snapshot);
        let sync = SyncState {
            source,
            last_sync: Some(Utc::now()),
            last_result: Some(result.clone()),
        };
        Ok((result, Some(sync)))
    })?;
    log::info!(
        "{} sync for {}: {} new contacts, {} new activities, {} updated stakeholders",
        source,
        workspace_id,
        result.new_contacts,
        result.new_activities,
        result.updated_stakeholders
    );
    Ok(result)
}

pub async fn sync_gmail(
    state: &AppState,
    workspace_id: &str,
    today: NaiveDate,
) -> Result<SyncResult, DealError> {
    read_workspace(state, workspace_id)?;
    let config = state.config();
    let token = google_api::access_token(&state.token_path())?;
    let candidates =
        fetch_recent_messages(&token, config.email_lookback_days, config.max_email_threads).await?;

    let options = SyncOptions::from_config(&config, connected_account(state));
    finish(state, workspace_id, SyncSource::Email, |snapshot| {
        apply_email_candidates(snapshot, &candidates, &options, today)
    })
}

pub async fn sync_calendar(
    state: &AppState,
    workspace_id: &str,
    today: NaiveDate,
) -> Result<SyncResult, DealError> {
    read_workspace(state, workspace_id)?;
    let config = state.config();
    let token = google_api::access_token(&state.token_path())?;
    let start = today - Duration::days(i64::from(config.calendar_lookback_days));
    let end = today + Duration::days(i64::from(config.calendar_lookahead_days));
    let events = fetch_events(&token, start, end).await?;

    let options = SyncOptions::from_config(&config, connected_account(state));
    finish(state, workspace_id, SyncSource::Calendar, |snapshot| {
        apply_calendar_candidates(snapshot, &events, &options, today)
    })
}

// =============================================================================
// Status
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    pub last_sync: Option<DateTime<Utc>>,
    pub last_result: Option<SyncResult>,
    pub stale: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub connected: bool,
    pub account: Option<String>,
    pub email: SourceStatus,
    pub calendar: SourceStatus,
}

fn source_status(state: Option<SyncState>, now: DateTime<Utc>) -> SourceStatus {
    let (last_sync, last_result) = match state {
        Some(s) => (s.last_sync, s.last_result),
        None => (None, None),
    };
    let stale = match last_sync {
        Some(at) => now - at > Duration::hours(STALE_AFTER_HOURS),
        None => true,
    };
    SourceStatus {
        last_sync,
        last_result,
        stale,
    }
}

pub fn sync_status(
    state: &AppState,
    workspace_id: &str,
    now: DateTime<Utc>,
) -> Result<SyncStatus, DealError> {
    let (email, calendar) = {
        let db = state.db.lock();
        if !db.workspace_exists(workspace_id)? {
            return Err(DealError::not_found("workspace", workspace_id));
        }
        (
            db.get_sync_state(workspace_id, SyncSource::Email)?,
            db.get_sync_state(workspace_id, SyncSource::Calendar)?,
        )
    };
    let token_path = state.token_path();
    let connected = google_api::is_connected(&token_path);
    Ok(SyncStatus {
        connected,
        account: if connected { connected_account(state) } else { None },
        email: source_status(email, now),
        calendar: source_status(calendar, now),
    })
}
