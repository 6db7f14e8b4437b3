//! Gmail API v1: recent threads as normalized email candidates.
//!
//! Lists threads newer than the lookback window, then fetches metadata
//! headers (From, To, Subject, Date, Content-Type) for each thread's
//! messages. Individual thread fetch failures are skipped.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::classify::{is_calendar_invite, parse_header_date};
use super::{check_status, send_with_retry, GoogleApiError, RetryPolicy};
use crate::util::parse_address;

const GMAIL_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadListResponse {
    #[serde(default)]
    threads: Vec<ThreadStub>,
}

#[derive(Debug, Deserialize)]
struct ThreadStub {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ThreadDetail {
    #[serde(default)]
    id: String,
    #[serde(default)]
    messages: Vec<MessageDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessageDetail {
    #[serde(default)]
    id: String,
    #[serde(default)]
    thread_id: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    payload: Option<MessagePayload>,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    headers: Vec<Header>,
}

#[derive(Debug, Deserialize)]
struct Header {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: String,
}

// ============================================================================
// Public types
// ============================================================================

/// One inbound message, reduced to what reconciliation needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailCandidate {
    pub message_id: String,
    pub thread_id: String,
    pub sender_name: String,
    /// Lowercased.
    pub sender_email: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub snippet: String,
    pub date: NaiveDate,
    pub is_invite: bool,
}

// ============================================================================
// Normalization
// ============================================================================

impl MessageDetail {
    fn header(&self, name: &str) -> &str {
        self.payload
            .as_ref()
            .and_then(|p| p.headers.iter().find(|h| h.name.eq_ignore_ascii_case(name)))
            .map(|h| h.value.as_str())
            .unwrap_or("")
    }
}

/// Normalize one message. `None` when the sender or date can't be read.
pub(crate) fn normalize_message(msg: &MessageDetail, thread_id: &str) -> Option<EmailCandidate> {
    let sender = parse_address(msg.header("From"))?;
    let date = parse_header_date(msg.header("Date"))?;
    let subject = msg.header("Subject").trim().to_string();
    let recipients = msg
        .header("To")
        .split(',')
        .filter_map(parse_address)
        .map(|a| a.email)
        .collect();

    Some(EmailCandidate {
        message_id: msg.id.clone(),
        thread_id: if msg.thread_id.is_empty() {
            thread_id.to_string()
        } else {
            msg.thread_id.clone()
        },
        is_invite: is_calendar_invite(&subject, msg.header("Content-Type")),
        sender_name: sender.name,
        sender_email: sender.email,
        recipients,
        subject,
        snippet: msg.snippet.clone(),
        date,
    })
}

pub(crate) fn normalize_thread(thread: &ThreadDetail) -> Vec<EmailCandidate> {
    thread
        .messages
        .iter()
        .filter_map(|m| {
            let candidate = normalize_message(m, &thread.id);
            if candidate.is_none() {
                log::debug!("Skipping unreadable message {} in thread {}", m.id, thread.id);
            }
            candidate
        })
        .collect()
}

// ============================================================================
// Gmail API
// ============================================================================

/// Fetch messages from threads active in the last `lookback_days`.
pub async fn fetch_recent_messages(
    access_token: &str,
    lookback_days: u32,
    max_threads: u32,
) -> Result<Vec<EmailCandidate>, GoogleApiError> {
    let client = reqwest::Client::new();
    let policy = RetryPolicy::default();
    let after = (Utc::now() - chrono::Duration::days(i64::from(lookback_days))).timestamp();

    let resp = send_with_retry(
        client
            .get(format!("{}/threads", GMAIL_BASE))
            .bearer_auth(access_token)
            .query(&[
                ("q", format!("after:{}", after)),
                ("maxResults", max_threads.to_string()),
            ]),
        &policy,
    )
    .await?;
    let list: ThreadListResponse = check_status(resp).await?.json().await?;

    let mut out = Vec::new();
    for stub in list.threads.iter().take(max_threads as usize) {
        match fetch_thread(&client, access_token, &stub.id, &policy).await {
            Ok(thread) => out.extend(normalize_thread(&thread)),
            // Auth failures abort the pass; anything else skips the thread.
            Err(GoogleApiError::AuthExpired) => return Err(GoogleApiError::AuthExpired),
            Err(e) => log::debug!("Skipping thread {}: {}", stub.id, e),
        }
    }

    log::info!(
        "Gmail: {} messages from {} threads (last {} days)",
        out.len(),
        list.threads.len().min(max_threads as usize),
        lookback_days
    );
    Ok(out)
}

async fn fetch_thread(
    client: &reqwest::Client,
    access_token: &str,
    thread_id: &str,
    policy: &RetryPolicy,
) -> Result<ThreadDetail, GoogleApiError> {
    let resp = send_with_retry(
        client
            .get(format!("{}/threads/{}", GMAIL_BASE, thread_id))
            .bearer_auth(access_token)
            .query(&[
                ("format", "metadata"),
                ("metadataHeaders", "From"),
                ("metadataHeaders", "To"),
                ("metadataHeaders", "Subject"),
                ("metadataHeaders", "Date"),
                ("metadataHeaders", "Content-Type"),
            ]),
        policy,
    )
    .await?;
    Ok(check_status(resp).await?.json().await?)
}
