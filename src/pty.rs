//! AI oracle: text in, text out.
//!
//! The production oracle spawns the Claude Code CLI via pseudo-terminal with
//! timeout handling, since the CLI expects an interactive terminal. Callers
//! depend only on the [`Oracle`] trait so tests can substitute canned output.

use std::io::Read;
use std::process::Command;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use portable_pty::{CommandBuilder, NativePtySystem, PtySize, PtySystem};

use crate::error::DealError;
use crate::types::OracleConfig;

/// Default timeout for an oracle call (5 minutes)
pub const DEFAULT_CLAUDE_TIMEOUT_SECS: u64 = 300;

/// Opaque language-model collaborator.
pub trait Oracle: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, DealError>;
}

/// Claude Code CLI (`claude --print <prompt>`) behind a PTY.
pub struct ClaudeCliOracle {
    command: String,
    timeout_secs: u64,
}

impl Default for ClaudeCliOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaudeCliOracle {
    pub fn new() -> Self {
        Self {
            command: "claude".to_string(),
            timeout_secs: DEFAULT_CLAUDE_TIMEOUT_SECS,
        }
    }

    pub fn from_config(config: &OracleConfig) -> Self {
        Self {
            command: config.command.clone(),
            timeout_secs: config.timeout_secs,
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Check if the CLI binary is on PATH
    pub fn is_available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn spawn(&self, prompt: &str) -> Result<String, DealError> {
        if !self.is_available() {
            return Err(DealError::OracleNotFound);
        }

        let pty_system = NativePtySystem::default();
        let pair = pty_system
            .openpty(PtySize {
                rows: 24,
                cols: 200,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| DealError::Upstream(format!("Failed to open PTY: {}", e)))?;

        let mut cmd = CommandBuilder::new(&self.command);
        cmd.args(["--print", prompt]);

        let _child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| DealError::Upstream(format!("Failed to spawn {}: {}", self.command, e)))?;

        // Drop the slave to avoid blocking
        drop(pair.slave);

        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| DealError::Upstream(format!("Failed to clone PTY reader: {}", e)))?;

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut output = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => output.extend_from_slice(&buf[..n]),
                    Err(_) => break,
                }
            }
            let _ = tx.send(String::from_utf8_lossy(&output).into_owned());
        });

        let output = rx
            .recv_timeout(Duration::from_secs(self.timeout_secs))
            .map_err(|_| DealError::Timeout(self.timeout_secs))?;

        classify_output(output)
    }
}

impl Oracle for ClaudeCliOracle {
    fn complete(&self, prompt: &str) -> Result<String, DealError> {
        log::info!(
            "Oracle call: {} ({} chars prompt, {}s timeout)",
            self.command,
            prompt.len(),
            self.timeout_secs
        );
        let out = self.spawn(prompt)?;
        log::debug!("Oracle returned {} chars", out.len());
        Ok(out)
    }
}

/// Map known CLI failure banners to typed errors.
fn classify_output(output: String) -> Result<String, DealError> {
    let lower = output.to_lowercase();
    if lower.contains("not authenticated")
        || lower.contains("please login")
        || lower.contains("login required")
    {
        return Err(DealError::Config(
            "Claude Code is not authenticated. Run `claude login`.".to_string(),
        ));
    }
    if lower.contains("rate limit") || lower.contains("too many requests") {
        return Err(DealError::Upstream("Claude rate limit reached".to_string()));
    }
    if output.trim().is_empty() {
        return Err(DealError::Upstream("Claude returned no output".to_string()));
    }
    Ok(output)
}

/// Oracle returning fixed text, for tests and offline runs.
#[derive(Debug, Clone)]
pub struct StaticOracle {
    response: String,
}

impl StaticOracle {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

impl Oracle for StaticOracle {
    fn complete(&self, _prompt: &str) -> Result<String, DealError> {
        Ok(self.response.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_auth_banner() {
        let err = classify_output("Error: Not authenticated".to_string()).unwrap_err();
        assert!(err.requires_user_action());
    }

    #[test]
    fn test_classify_rate_limit_is_retryable() {
        let err = classify_output("rate limit exceeded".to_string()).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_empty_output() {
        assert!(classify_output("  \r\n".to_string()).is_err());
        assert_eq!(classify_output("{}".to_string()).unwrap(), "{}");
    }

    #[test]
    fn test_missing_binary_is_oracle_not_found() {
        let oracle = ClaudeCliOracle::from_config(&OracleConfig {
            command: "dealgraph-no-such-binary".to_string(),
            timeout_secs: 1,
        });
        assert!(matches!(oracle.complete("hi"), Err(DealError::OracleNotFound)));
    }

    #[test]
    fn test_static_oracle_echoes() {
        let oracle = StaticOracle::new("{\"ok\":true}");
        assert_eq!(oracle.complete("anything").unwrap(), "{\"ok\":true}");
    }
}
