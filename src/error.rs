//! Error types for deal operations
//!
//! Errors are classified by recoverability:
//! - Retryable: upstream/network failures, oracle timeouts
//! - NonRetryable: validation failures, missing records, malformed AI output
//! - RequiresUserAction: expired Google auth, missing Claude CLI, bad config

use thiserror::Error;

use crate::db::DbError;

/// Error type shared by every service-level operation.
#[derive(Debug, Error)]
pub enum DealError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{0}")]
    Validation(String),

    #[error("Failed to parse AI response: {0}")]
    Parse(String),

    #[error("Google authentication expired. Please reconnect.")]
    UpstreamAuth,

    #[error("A workspace with this name already exists: {0}")]
    DuplicateWorkspace(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Claude Code CLI not found. Install from https://claude.ai/code")]
    OracleNotFound,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DealError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        DealError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        DealError::Validation(msg.into())
    }

    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, DealError::Upstream(_) | DealError::Timeout(_))
    }

    /// Returns true if this error requires user action to resolve
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            DealError::UpstreamAuth | DealError::OracleNotFound | DealError::Config(_)
        )
    }

    /// HTTP-style status used by the CLI exit code and JSON payloads.
    pub fn status_code(&self) -> u16 {
        match self {
            DealError::Validation(_) => 400,
            DealError::UpstreamAuth => 401,
            DealError::NotFound { .. } => 404,
            DealError::DuplicateWorkspace(_) => 409,
            DealError::Parse(_) | DealError::Upstream(_) => 502,
            DealError::Timeout(_) => 504,
            _ => 500,
        }
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DealError::NotFound { .. } => "Check the ID and the selected workspace.",
            DealError::Validation(_) => "Correct the input and try again.",
            DealError::Parse(_) => "The AI response was malformed. Try the import again.",
            DealError::UpstreamAuth => "Reconnect your Google account.",
            DealError::DuplicateWorkspace(_) => "Choose a different company name.",
            DealError::Upstream(_) => "Check your internet connection and try again.",
            DealError::Timeout(_) => "The operation took too long. Try again.",
            DealError::OracleNotFound => "Install Claude Code from https://claude.ai/code",
            DealError::Config(_) => "Check your configuration in ~/.dealgraph/config.json",
            DealError::Db(_) => "Check the database file and disk space.",
            DealError::Io(_) => "Check file permissions and disk space.",
        }
    }
}

impl From<rusqlite::Error> for DealError {
    fn from(err: rusqlite::Error) -> Self {
        DealError::Db(DbError::Sqlite(err))
    }
}

/// Serializable error representation for CLI JSON output
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub message: String,
    pub error_type: ErrorType,
    pub status: u16,
    pub can_retry: bool,
    pub recovery_suggestion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Retryable,
    NonRetryable,
    RequiresUserAction,
}

impl From<&DealError> for ErrorPayload {
    fn from(err: &DealError) -> Self {
        let error_type = if err.requires_user_action() {
            ErrorType::RequiresUserAction
        } else if err.is_retryable() {
            ErrorType::Retryable
        } else {
            ErrorType::NonRetryable
        };

        ErrorPayload {
            message: err.to_string(),
            error_type,
            status: err.status_code(),
            can_retry: err.is_retryable(),
            recovery_suggestion: err.recovery_suggestion().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_requires_user_action() {
        let payload = ErrorPayload::from(&DealError::UpstreamAuth);
        assert_eq!(payload.error_type, ErrorType::RequiresUserAction);
        assert_eq!(payload.status, 401);
        assert!(!payload.can_retry);
        assert_eq!(payload.message, "Google authentication expired. Please reconnect.");
    }

    #[test]
    fn test_upstream_is_retryable() {
        let err = DealError::Upstream("503".into());
        assert!(err.is_retryable());
        assert_eq!(ErrorPayload::from(&err).error_type, ErrorType::Retryable);
    }

    #[test]
    fn test_not_found_message() {
        let err = DealError::not_found("stakeholder", "s42");
        assert_eq!(err.to_string(), "stakeholder not found: s42");
        assert_eq!(err.status_code(), 404);
    }
}
