// Oracle-backed account analysis: deal insights and meeting-prep briefs.

use chrono::NaiveDate;

use crate::error::DealError;
use crate::intelligence::{
    build_insights_prompt, build_meeting_prep_prompt, parse_insights_response, InsightsReport,
};
use crate::pty::Oracle;
use crate::state::{read_workspace, AppState};

pub fn generate_insights(
    state: &AppState,
    oracle: &dyn Oracle,
    workspace_id: &str,
    today: NaiveDate,
) -> Result<InsightsReport, DealError> {
    let snapshot = read_workspace(state, workspace_id)?;
    let workspace = state.db.lock().get_workspace(workspace_id)?;
    let prompt = build_insights_prompt(
        workspace.as_ref(),
        &snapshot.stakeholders,
        &snapshot.activities,
        today,
    );
    let report = parse_insights_response(&oracle.complete(&prompt)?)?;
    log::info!(
        "Insights for {}: oracle score {}, {} insights",
        workspace_id,
        report.deal_health_score.score,
        report.insights.len()
    );
    Ok(report)
}

/// Markdown brief for an upcoming meeting with `attendee_ids`.
pub fn meeting_prep(
    state: &AppState,
    oracle: &dyn Oracle,
    workspace_id: &str,
    attendee_ids: &[String],
    meeting_context: Option<&str>,
    today: NaiveDate,
) -> Result<String, DealError> {
    if attendee_ids.is_empty() {
        return Err(DealError::validation("Please select at least one stakeholder"));
    }
    let snapshot = read_workspace(state, workspace_id)?;
    if let Some(missing) = attendee_ids.iter().find(|id| snapshot.stakeholder(id).is_none()) {
        return Err(DealError::not_found("stakeholder", missing.as_str()));
    }
    let workspace = state.db.lock().get_workspace(workspace_id)?;
    let prompt = build_meeting_prep_prompt(
        workspace.as_ref(),
        &snapshot.stakeholders,
        attendee_ids,
        &snapshot.activities,
        meeting_context.map(str::trim).filter(|c| !c.is_empty()),
        today,
    );
    let brief = oracle.complete(&prompt)?;
    Ok(brief.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pty::StaticOracle;
    use crate::services::stakeholders::add_stakeholder;
    use crate::state::test_utils::test_state;
    use crate::types::NewStakeholder;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 20).unwrap()
    }

    #[test]
    fn test_generate_insights_parses_fenced_report() {
        let state = test_state();
        let oracle = StaticOracle::new(
            "```json\n{\"dealHealthScore\": {\"score\": 140, \"reasoning\": \"ok\"}, \"insights\": [\
             {\"type\": \"coverage_gap\", \"severity\": \"warning\", \"title\": \"Legal untouched\"}]}\n```",
        );
        let report = generate_insights(&state, &oracle, "ws", today()).unwrap();
        assert_eq!(report.deal_health_score.score, 100);
        assert_eq!(report.insights.len(), 1);
    }

    #[test]
    fn test_meeting_prep_validation() {
        let state = test_state();
        let oracle = StaticOracle::new("## Brief");
        assert!(matches!(
            meeting_prep(&state, &oracle, "ws", &[], None, today()),
            Err(DealError::Validation(_))
        ));
        assert!(matches!(
            meeting_prep(&state, &oracle, "ws", &["s5".to_string()], None, today()),
            Err(DealError::NotFound { .. })
        ));
    }

    #[test]
    fn test_meeting_prep_returns_brief() {
        let state = test_state();
        let new: NewStakeholder = serde_json::from_value(serde_json::json!({"name": "Dana Park"})).unwrap();
        add_stakeholder(&state, "ws", new).unwrap();
        let oracle = StaticOracle::new("  ## Meeting Objectives\n- Align on pricing\n");
        let brief = meeting_prep(&state, &oracle, "ws", &["s1".to_string()], Some("QBR"), today()).unwrap();
        assert!(brief.starts_with("## Meeting Objectives"));
    }
}
