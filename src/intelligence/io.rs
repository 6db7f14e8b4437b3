//! Oracle response types and validating parse.
//!
//! The oracle is asked for bare JSON but routinely wraps it in a markdown
//! fence or a sentence of prose. Parsing strips the fence, falls back to the
//! first balanced `{...}` object, then deserializes into a strict schema.
//! Anything that still fails is a [`DealError::Parse`], never a panic.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::DealError;
use crate::types::{ActivityType, DealRole, Priority, RelationshipStrength};
use crate::util::{extract_json_object, strip_code_fences, truncate_chars};

// =============================================================================
// Smart import schema
// =============================================================================

/// A person the oracle found in a transcript or email.
///
/// Only `name` is required; every classification field may be absent and is
/// filled with defaults when the person is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedStakeholder {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub role: Option<DealRole>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub relationship_strength: Option<RelationshipStrength>,
    #[serde(default)]
    pub key_priorities: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub description: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub deadline: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentSignal {
    pub stakeholder_name: String,
    pub sentiment: String,
    pub signal: String,
}

/// The interaction the transcript itself represents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedActivity {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub summary: String,
    #[serde(default)]
    pub stakeholder_names: Vec<String>,
}

/// Top-level smart-import response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportExtraction {
    pub stakeholders: Vec<ExtractedStakeholder>,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
    #[serde(default)]
    pub sentiment_signals: Vec<SentimentSignal>,
    #[serde(default)]
    pub proposed_activity: Option<ProposedActivity>,
}

// =============================================================================
// Insights schema
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleHealthScore {
    pub score: u32,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    CoverageGap,
    EngagementRisk,
    MissingStakeholder,
    Strategic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightSeverity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightItem {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub severity: InsightSeverity,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub action_item: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsReport {
    pub deal_health_score: OracleHealthScore,
    #[serde(default)]
    pub insights: Vec<InsightItem>,
}

// =============================================================================
// Parsing
// =============================================================================

/// Longest excerpt of a bad response carried in the error message.
const ERROR_EXCERPT_CHARS: usize = 120;

/// Parse an oracle response into `T`, tolerating fences and surrounding prose.
pub fn parse_oracle_json<T: DeserializeOwned>(response: &str) -> Result<T, DealError> {
    let cleaned = strip_code_fences(response);
    if cleaned.is_empty() {
        return Err(DealError::Parse("empty response".to_string()));
    }

    let first_err = match serde_json::from_str::<T>(cleaned) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if let Some(object) = extract_json_object(cleaned) {
        if object.len() != cleaned.len() {
            if let Ok(value) = serde_json::from_str::<T>(object) {
                log::debug!("Oracle JSON recovered from surrounding prose");
                return Ok(value);
            }
        }
    }

    log::warn!(
        "Oracle response did not match schema: {} (starts with {:?})",
        first_err,
        truncate_chars(cleaned, ERROR_EXCERPT_CHARS)
    );
    Err(DealError::Parse(first_err.to_string()))
}

pub fn parse_import_response(response: &str) -> Result<ImportExtraction, DealError> {
    let mut extraction: ImportExtraction = parse_oracle_json(response)?;
    // Nameless entries can't be resolved or created.
    extraction.stakeholders.retain(|s| !s.name.trim().is_empty());
    for s in &mut extraction.stakeholders {
        s.name = s.name.trim().to_string();
    }
    Ok(extraction)
}

pub fn parse_insights_response(response: &str) -> Result<InsightsReport, DealError> {
    let mut report: InsightsReport = parse_oracle_json(response)?;
    report.deal_health_score.score = report.deal_health_score.score.min(100);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMPORT_JSON: &str = r#"{
        "stakeholders": [
            {"name": "Dana Park", "title": "CFO", "role": "Economic Buyer",
             "priority": "P0", "relationshipStrength": "At Risk",
             "keyPriorities": ["cost"], "email": "dana@acme.com"},
            {"name": "  Lee Wong "},
            {"name": "   "}
        ],
        "actionItems": [{"description": "Send pricing", "owner": "us"}],
        "sentimentSignals": [
            {"stakeholderName": "Dana Park", "sentiment": "negative", "signal": "budget pressure"}
        ],
        "proposedActivity": {
            "date": "2026-03-14", "type": "Meeting",
            "summary": "QBR", "stakeholderNames": ["Dana Park", "Lee Wong"]
        }
    }"#;

    #[test]
    fn test_parse_import_plain() {
        let out = parse_import_response(IMPORT_JSON).unwrap();
        assert_eq!(out.stakeholders.len(), 2, "blank names dropped");
        assert_eq!(out.stakeholders[0].role, Some(DealRole::EconomicBuyer));
        assert_eq!(
            out.stakeholders[0].relationship_strength,
            Some(RelationshipStrength::AtRisk)
        );
        assert_eq!(out.stakeholders[1].name, "Lee Wong");
        assert_eq!(out.stakeholders[1].role, None);
        let activity = out.proposed_activity.unwrap();
        assert_eq!(activity.activity_type, ActivityType::Meeting);
        assert_eq!(activity.date, NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
        assert_eq!(out.action_items[0].deadline, None);
    }

    #[test]
    fn test_parse_import_fenced() {
        let fenced = format!("```json\n{}\n```", IMPORT_JSON);
        assert!(parse_import_response(&fenced).is_ok());
    }

    #[test]
    fn test_parse_import_with_prose() {
        let wrapped = format!("Here is the extraction:\n\n{}\n\nLet me know!", IMPORT_JSON);
        let out = parse_import_response(&wrapped).unwrap();
        assert_eq!(out.sentiment_signals[0].sentiment, "negative");
    }

    #[test]
    fn test_parse_import_rejects_bad_enum() {
        let bad = r#"{"stakeholders": [{"name": "X", "role": "Decision Maker"}]}"#;
        assert!(matches!(parse_import_response(bad), Err(DealError::Parse(_))));
    }

    #[test]
    fn test_parse_import_missing_stakeholders_fails_closed() {
        assert!(matches!(
            parse_import_response(r#"{"actionItems": []}"#),
            Err(DealError::Parse(_))
        ));
        assert!(matches!(parse_import_response("not json"), Err(DealError::Parse(_))));
        assert!(matches!(parse_import_response("```\n```"), Err(DealError::Parse(_))));
    }

    #[test]
    fn test_parse_insights_clamps_score() {
        let json = r#"{
            "dealHealthScore": {"score": 140, "reasoning": "optimistic"},
            "insights": [{
                "type": "coverage_gap", "severity": "critical",
                "title": "Legal unengaged", "description": "d", "actionItem": "a"
            }]
        }"#;
        let report = parse_insights_response(json).unwrap();
        assert_eq!(report.deal_health_score.score, 100);
        assert_eq!(report.insights[0].kind, InsightKind::CoverageGap);
        assert_eq!(report.insights[0].severity, InsightSeverity::Critical);
    }
}
