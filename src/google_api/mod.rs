//! Google API fetch collaborators.
//!
//! Direct HTTP via reqwest with a bearer token read from a token file. The
//! OAuth consent flow lives outside this crate; an expired token surfaces as
//! [`GoogleApiError::AuthExpired`] and the user reconnects.
//!
//! Modules:
//! - calendar: Google Calendar API v3, normalized to [`calendar::EventCandidate`]
//! - classify: header/date/attendee normalization helpers
//! - gmail: Gmail API v1, normalized to [`gmail::EmailCandidate`]

pub mod calendar;
pub mod classify;
pub mod gmail;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DealError;

// ============================================================================
// Token
// ============================================================================

/// OAuth2 token as written by the Google auth libraries.
///
/// Both `token` and `access_token` are accepted on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleToken {
    #[serde(alias = "access_token")]
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token expiry time (ISO 8601)
    #[serde(default)]
    pub expiry: Option<String>,
    /// Authenticated user email
    #[serde(default, alias = "email")]
    pub account: Option<String>,
}

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GoogleApiError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Token expired or revoked")]
    AuthExpired,
    #[error("Token not found at {0}")]
    TokenNotFound(PathBuf),
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<GoogleApiError> for DealError {
    fn from(err: GoogleApiError) -> Self {
        match err {
            GoogleApiError::AuthExpired | GoogleApiError::TokenNotFound(_) => {
                DealError::UpstreamAuth
            }
            GoogleApiError::ApiError { status: 401, .. } => DealError::UpstreamAuth,
            other => DealError::Upstream(other.to_string()),
        }
    }
}

// ============================================================================
// Retry
// ============================================================================

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 2_000,
        }
    }
}

fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

fn retry_delay(attempt: u32, policy: &RetryPolicy, retry_after: Option<&str>) -> Duration {
    if let Some(secs) = retry_after.and_then(|v| v.trim().parse::<u64>().ok()) {
        return Duration::from_secs(secs.min(30));
    }
    let exponent = 2u64.saturating_pow(attempt.saturating_sub(1));
    let base = policy
        .initial_backoff_ms
        .saturating_mul(exponent)
        .min(policy.max_backoff_ms);
    let jitter = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0)
        % 150;
    Duration::from_millis(base.saturating_add(jitter))
}

/// Send with backoff on 408/429/5xx and on connect/timeout transport errors.
pub async fn send_with_retry(
    request: reqwest::RequestBuilder,
    policy: &RetryPolicy,
) -> Result<reqwest::Response, GoogleApiError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let Some(cloned) = request.try_clone() else {
            return request.send().await.map_err(GoogleApiError::Http);
        };

        match cloned.send().await {
            Ok(response) => {
                let status = response.status();
                if is_retryable_status(status) && attempt < attempts {
                    let retry_after = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok());
                    let delay = retry_delay(attempt, policy, retry_after);
                    log::warn!(
                        "google_api retry {}/{} after status {} (sleep {:?})",
                        attempt,
                        attempts,
                        status,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                return Ok(response);
            }
            Err(err) => {
                if (err.is_timeout() || err.is_connect()) && attempt < attempts {
                    let delay = retry_delay(attempt, policy, None);
                    log::warn!(
                        "google_api retry {}/{} after transport error: {} (sleep {:?})",
                        attempt,
                        attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                return Err(GoogleApiError::Http(err));
            }
        }
    }
}

/// Map a non-success response to a typed error.
pub(crate) async fn check_status(
    resp: reqwest::Response,
) -> Result<reqwest::Response, GoogleApiError> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(GoogleApiError::AuthExpired);
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GoogleApiError::ApiError {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(resp)
}

// ============================================================================
// Token I/O
// ============================================================================

/// Default token location: `~/.dealgraph/google/token.json`.
pub fn default_token_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".dealgraph")
        .join("google")
        .join("token.json")
}

pub fn load_token(path: &Path) -> Result<GoogleToken, GoogleApiError> {
    if !path.exists() {
        return Err(GoogleApiError::TokenNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// True when the token has expired or will within 60 seconds.
///
/// A missing or unparseable expiry counts as not expired; the API's 401
/// is the authority in that case.
pub fn is_token_expired(token: &GoogleToken, now: DateTime<Utc>) -> bool {
    match token.expiry.as_deref() {
        None => false,
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(expiry) => expiry <= now + chrono::Duration::seconds(60),
            Err(_) => false,
        },
    }
}

/// Bearer token for API calls, or `AuthExpired` when reconnect is needed.
pub fn access_token(path: &Path) -> Result<String, GoogleApiError> {
    let token = load_token(path)?;
    if token.token.trim().is_empty() || is_token_expired(&token, Utc::now()) {
        return Err(GoogleApiError::AuthExpired);
    }
    Ok(token.token)
}

/// Whether a usable token file exists, without propagating errors.
pub fn is_connected(path: &Path) -> bool {
    access_token(path).is_ok()
}

// ============================================================================
// Tests
// ============================================================================
