//! Oracle prompt builders.
//!
//! Contains:
//! - Shared account context (roster, recent activity, team engagement)
//! - Smart-import extraction prompt (fixed JSON schema)
//! - Insights prompt (JSON)
//! - Meeting-prep prompt (markdown brief)

use chrono::NaiveDate;

use crate::types::{Activity, ActivityType, Stakeholder, Workspace, DEFAULT_TEAMS};
use crate::util::{days_since, truncate_chars};

/// Most recent activities included in the account context.
const RECENT_ACTIVITY_LIMIT: usize = 15;
/// Interactions listed per meeting attendee.
const ATTENDEE_ACTIVITY_LIMIT: usize = 3;
/// Transcripts longer than this are cut before prompting.
const MAX_TRANSCRIPT_CHARS: usize = 60_000;

fn contact_label(s: &Stakeholder, today: NaiveDate) -> String {
    match s.last_contact_date {
        Some(d) => format!("{} days ago", days_since(d, today)),
        None => "Never contacted".to_string(),
    }
}

fn names_for(ids: &[String], stakeholders: &[Stakeholder]) -> String {
    ids.iter()
        .map(|id| {
            stakeholders
                .iter()
                .find(|s| &s.id == id)
                .map(|s| s.name.as_str())
                .unwrap_or(id.as_str())
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Newest first; stable so same-day entries keep timeline order.
fn newest_first<'a>(activities: impl Iterator<Item = &'a Activity>) -> Vec<&'a Activity> {
    let mut sorted: Vec<&Activity> = activities.collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
}

fn account_header(workspace: Option<&Workspace>) -> String {
    match workspace {
        Some(ws) => {
            let mut header = format!("ACCOUNT: {}", ws.name);
            if !ws.description.is_empty() {
                header.push_str(&format!(" ({})", ws.description));
            }
            if !ws.deal_context.is_empty() {
                header.push_str(&format!("\nDEAL CONTEXT: {}", ws.deal_context));
            }
            if !ws.renewal_info.is_empty() {
                header.push_str(&format!("\nRENEWAL: {}", ws.renewal_info));
            }
            header
        }
        None => "ACCOUNT: (unknown workspace)".to_string(),
    }
}

// =============================================================================
// Account context
// =============================================================================

/// Roster, recent activity and per-team engagement, shared by every prompt.
pub fn build_account_context(
    workspace: Option<&Workspace>,
    stakeholders: &[Stakeholder],
    activities: &[Activity],
    today: NaiveDate,
) -> String {
    let roster = stakeholders
        .iter()
        .map(|s| {
            format!(
                "- {} ({}, {}) | Role: {} | Priority: {} | Relationship: {} | Last Contact: {} | Priorities: {} | Notes: {}",
                s.name,
                s.title,
                s.team,
                s.role,
                s.priority,
                s.relationship_strength,
                contact_label(s, today),
                s.key_priorities.join(", "),
                s.notes
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let recent = newest_first(activities.iter())
        .into_iter()
        .take(RECENT_ACTIVITY_LIMIT)
        .map(|a| {
            format!(
                "- {} [{}] with {}: {}",
                a.date,
                a.activity_type,
                names_for(&a.stakeholder_ids, stakeholders),
                a.summary
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut teams: Vec<&str> = Vec::new();
    for s in stakeholders {
        if !teams.contains(&s.team.as_str()) {
            teams.push(&s.team);
        }
    }
    let coverage = teams
        .iter()
        .map(|team| {
            let members: Vec<&Stakeholder> =
                stakeholders.iter().filter(|s| s.team == *team).collect();
            let engaged = members
                .iter()
                .filter(|s| {
                    s.last_contact_date
                        .is_some_and(|d| days_since(d, today) < 30)
                })
                .count();
            format!(
                "- {}: {}/{} engaged in last 30 days",
                team,
                engaged,
                members.len()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{}\n\nSTAKEHOLDERS ({} total):\n{}\n\nRECENT ACTIVITIES:\n{}\n\nTEAM COVERAGE:\n{}",
        account_header(workspace),
        stakeholders.len(),
        roster,
        recent,
        coverage
    )
}

// =============================================================================
// Smart import
// =============================================================================

/// Prompt asking the oracle to extract people and an activity from raw text.
pub fn build_import_prompt(
    transcript: &str,
    source_type: ActivityType,
    workspace: Option<&Workspace>,
    stakeholders: &[Stakeholder],
    today: NaiveDate,
) -> String {
    let teams: Vec<String> = match workspace {
        Some(ws) if !ws.teams.is_empty() => ws.teams.clone(),
        _ => DEFAULT_TEAMS.iter().map(|t| t.to_string()).collect(),
    };
    let known = if stakeholders.is_empty() {
        "(none yet)".to_string()
    } else {
        stakeholders
            .iter()
            .map(|s| format!("- {} ({}, {})", s.name, s.title, s.team))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are an expert enterprise sales analyst. Extract deal stakeholder intelligence from the {source} below.

{header}
TODAY: {today}

KNOWN STAKEHOLDERS (reuse these exact names when the same person appears):
{known}

VALID TEAMS: {teams}
VALID ROLES: Economic Buyer, Champion, Influencer, Technical Buyer, End User, Blocker
VALID PRIORITIES: P0, P1, P2
VALID RELATIONSHIP STRENGTHS: Strong, Neutral, Weak, At Risk, Unknown

SOURCE ({source}):
<<<
{transcript}
>>>

Respond with ONLY a JSON object with this exact structure:
{{
  "stakeholders": [
    {{
      "name": "<full name>",
      "title": "<job title or empty>",
      "team": "<one of the valid teams>",
      "role": "<one of the valid roles>",
      "priority": "<P0|P1|P2>",
      "relationshipStrength": "<one of the valid strengths>",
      "keyPriorities": ["<what they care about>"],
      "notes": "<one or two sentences of context from this source>",
      "email": "<email if present, else omit>"
    }}
  ],
  "actionItems": [{{"description": "<task>", "owner": "<name>", "deadline": "<YYYY-MM-DD or omit>"}}],
  "sentimentSignals": [{{"stakeholderName": "<name>", "sentiment": "positive|neutral|negative", "signal": "<quote or paraphrase>"}}],
  "proposedActivity": {{
    "date": "<YYYY-MM-DD of the interaction, default {today}>",
    "type": "{source}",
    "summary": "<one-sentence summary>",
    "stakeholderNames": ["<names of customer-side participants>"]
  }}
}}

Only include people who work at the customer. Do not include our own team."#,
        source = source_type,
        header = account_header(workspace),
        today = today.format("%Y-%m-%d"),
        known = known,
        teams = teams.join(", "),
        transcript = truncate_chars(transcript.trim(), MAX_TRANSCRIPT_CHARS),
    )
}

// =============================================================================
// Insights and meeting prep
// =============================================================================

pub fn build_insights_prompt(
    workspace: Option<&Workspace>,
    stakeholders: &[Stakeholder],
    activities: &[Activity],
    today: NaiveDate,
) -> String {
    let context = build_account_context(workspace, stakeholders, activities, today);
    format!(
        r#"You are an expert enterprise sales strategist analyzing an account. Based on the stakeholder data below, generate actionable insights.

{context}

Generate a JSON response with this exact structure:
{{
  "dealHealthScore": {{
    "score": <number 0-100>,
    "reasoning": "<2-3 sentence explanation>"
  }},
  "insights": [
    {{
      "type": "coverage_gap" | "engagement_risk" | "missing_stakeholder" | "strategic",
      "severity": "critical" | "warning" | "info",
      "title": "<short title>",
      "description": "<2-3 sentence description>",
      "actionItem": "<specific next step>"
    }}
  ]
}}

Generate 5-7 insights, ordered by severity. Be specific with names, dates, and numbers. Focus on:
1. Coverage gaps (unengaged teams or roles)
2. Engagement risks (relationships cooling, long gaps since contact)
3. Missing stakeholder connections
4. Strategic suggestions for advancing the deal

Respond with ONLY the JSON, no markdown code blocks."#
    )
}

pub fn build_meeting_prep_prompt(
    workspace: Option<&Workspace>,
    stakeholders: &[Stakeholder],
    attendee_ids: &[String],
    activities: &[Activity],
    meeting_context: Option<&str>,
    today: NaiveDate,
) -> String {
    let context = build_account_context(workspace, stakeholders, activities, today);

    let attendees = stakeholders
        .iter()
        .filter(|s| attendee_ids.contains(&s.id))
        .map(|s| {
            let recent = newest_first(activities.iter().filter(|a| a.involves(&s.id)))
                .into_iter()
                .take(ATTENDEE_ACTIVITY_LIMIT)
                .map(|a| format!("  * {} [{}]: {}", a.date, a.activity_type, a.summary))
                .collect::<Vec<_>>();
            let recent = if recent.is_empty() {
                "  * No recorded interactions".to_string()
            } else {
                recent.join("\n")
            };
            format!(
                "ATTENDEE: {}\n  Title: {} ({})\n  Deal Role: {} | Priority: {}\n  Relationship: {} | Last Contact: {}\n  Key Priorities: {}\n  Notes: {}\n  Recent Interactions:\n{}",
                s.name,
                s.title,
                s.team,
                s.role,
                s.priority,
                s.relationship_strength,
                contact_label(s, today),
                s.key_priorities.join(", "),
                s.notes,
                recent
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let meeting_context = meeting_context
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| format!("MEETING CONTEXT: {}\n\n", c))
        .unwrap_or_default();

    format!(
        r#"You are an expert enterprise sales strategist preparing a meeting brief. Create a comprehensive, actionable meeting prep document.

FULL ACCOUNT CONTEXT:
{context}

MEETING ATTENDEES:
{attendees}

{meeting_context}Create a meeting prep brief in clean markdown format with these sections:

## Meeting Brief: [Meeting Title based on attendees]

### Attendee Profiles
For each attendee: name, title and role in the deal; current relationship status and what they care about; recent interaction summary; watch-outs.

### Suggested Talking Points
5-7 specific talking points tailored to this audience.

### Open Questions to Address
3-5 questions or concerns these stakeholders likely have, including unresolved items from past interactions.

### Recommended Next Steps
3-5 specific follow-up actions with timeline suggestions.

### Pre-Meeting Preparation Checklist
Materials to prepare, people to align with beforehand, key messages to reinforce.

Be specific, use names, reference actual data points and history."#
    )
}
