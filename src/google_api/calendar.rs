//! Google Calendar API v3: events in a window as normalized candidates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::classify::{attendee_display_name, event_date, is_resource_attendee};
use super::{check_status, send_with_retry, GoogleApiError, RetryPolicy};

const EVENTS_URL: &str = "https://www.googleapis.com/calendar/v3/calendars/primary/events";

// ============================================================================
// API response types (deserialized from Google Calendar JSON)
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<GoogleEventRaw>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GoogleEventRaw {
    #[serde(default)]
    id: String,
    #[serde(default)]
    summary: Option<String>,
    start: Option<EventDateTime>,
    #[serde(default)]
    attendees: Vec<Attendee>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Attendee {
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    resource: Option<bool>,
    #[serde(rename = "self", default)]
    is_self: Option<bool>,
}

// ============================================================================
// Public types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendeeCandidate {
    pub name: String,
    /// Lowercased.
    pub email: String,
}

/// A calendar event reduced to what reconciliation needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventCandidate {
    pub id: String,
    pub summary: String,
    pub date: NaiveDate,
    pub location: String,
    pub attendees: Vec<AttendeeCandidate>,
}

// ============================================================================
// Normalization
// ============================================================================

/// Normalize one event. `None` for cancelled or undated events.
///
/// Resource rooms, blank emails and the calendar owner are dropped from the
/// attendee list.
pub(crate) fn normalize_event(raw: &GoogleEventRaw) -> Option<EventCandidate> {
    if raw.status.as_deref() == Some("cancelled") {
        return None;
    }
    let start = raw
        .start
        .as_ref()
        .and_then(|s| s.date_time.as_deref().or(s.date.as_deref()))?;
    let date = event_date(start)?;

    let attendees = raw
        .attendees
        .iter()
        .filter(|a| a.is_self != Some(true))
        .filter(|a| !a.email.trim().is_empty())
        .filter(|a| !is_resource_attendee(&a.email, a.resource))
        .map(|a| AttendeeCandidate {
            name: attendee_display_name(a.display_name.as_deref(), &a.email),
            email: a.email.trim().to_lowercase(),
        })
        .collect();

    Some(EventCandidate {
        id: raw.id.clone(),
        summary: raw
            .summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Untitled")
            .to_string(),
        date,
        location: raw.location.clone().unwrap_or_default(),
        attendees,
    })
}

// ============================================================================
// Calendar API
// ============================================================================

/// Fetch events between `start` and `end` (inclusive dates, UTC bounds).
///
/// Handles pagination (maxResults=250, pageToken).
pub async fn fetch_events(
    access_token: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<EventCandidate>, GoogleApiError> {
    let client = reqwest::Client::new();
    let policy = RetryPolicy::default();
    let time_min = format!("{}T00:00:00Z", start);
    let time_max = format!("{}T00:00:00Z", end + chrono::Duration::days(1));

    let mut events = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let mut request = client
            .get(EVENTS_URL)
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("maxResults", "250"),
            ]);
        if let Some(ref token) = page_token {
            request = request.query(&[("pageToken", token.as_str())]);
        }

        let resp = send_with_retry(request, &policy).await?;
        let body: EventListResponse = check_status(resp).await?.json().await?;
        events.extend(body.items.iter().filter_map(normalize_event));

        match body.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    log::info!("Calendar: {} events between {} and {}", events.len(), start, end);
    Ok(events)
}
