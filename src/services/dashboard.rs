// Dashboard service: everything the overview screen shows, computed from
// one snapshot so the numbers agree with each other.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::DealError;
use crate::intelligence::{
    coverage_map, critical_alerts, detect_meeting_gaps, quick_stats, score_deal_health,
    CriticalAlert, DealHealth, MeetingGap, QuickStats, TeamCoverage,
};
use crate::state::{read_workspace, AppState};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub workspace_id: String,
    pub health: DealHealth,
    pub meeting_gaps: Vec<MeetingGap>,
    pub alerts: Vec<CriticalAlert>,
    pub coverage: Vec<TeamCoverage>,
    pub stats: QuickStats,
}

pub fn dashboard(state: &AppState, workspace_id: &str, today: NaiveDate) -> Result<Dashboard, DealError> {
    let snapshot = read_workspace(state, workspace_id)?;
    let stakeholders = &snapshot.stakeholders;
    Ok(Dashboard {
        workspace_id: workspace_id.to_string(),
        health: score_deal_health(stakeholders, today),
        meeting_gaps: detect_meeting_gaps(stakeholders, &snapshot.activities, today),
        alerts: critical_alerts(stakeholders, today),
        coverage: coverage_map(stakeholders, today),
        stats: quick_stats(stakeholders, today),
    })
}

pub fn deal_health(state: &AppState, workspace_id: &str, today: NaiveDate) -> Result<DealHealth, DealError> {
    let snapshot = read_workspace(state, workspace_id)?;
    Ok(score_deal_health(&snapshot.stakeholders, today))
}

pub fn meeting_gaps(
    state: &AppState,
    workspace_id: &str,
    today: NaiveDate,
) -> Result<Vec<MeetingGap>, DealError> {
    let snapshot = read_workspace(state, workspace_id)?;
    Ok(detect_meeting_gaps(&snapshot.stakeholders, &snapshot.activities, today))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::activities::{log_activity, NewActivity};
    use crate::services::stakeholders::add_stakeholder;
    use crate::state::test_utils::test_state;
    use crate::types::{ActivityType, NewStakeholder};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 20).unwrap()
    }

    fn add(state: &AppState, json: serde_json::Value) {
        let new: NewStakeholder = serde_json::from_value(json).unwrap();
        add_stakeholder(state, "ws", new).unwrap();
    }

    #[test]
    fn test_empty_workspace_dashboard() {
        let state = test_state();
        let dash = dashboard(&state, "ws", today()).unwrap();
        assert_eq!(dash.health.score, 0);
        assert_eq!(dash.health.factors.len(), 1);
        assert!(dash.meeting_gaps.is_empty());
        assert!(dash.coverage.is_empty());
        assert_eq!(dash.stats.total_stakeholders, 0);
    }

    #[test]
    fn test_dashboard_reflects_roster() {
        let state = test_state();
        add(&state, serde_json::json!({
            "name": "Dana Park", "team": "Finance", "role": "Economic Buyer",
            "priority": "P0", "relationshipStrength": "Neutral", "lastContactDate": "2026-03-18"
        }));
        add(&state, serde_json::json!({
            "name": "Lee Wong", "team": "Security", "role": "Blocker", "priority": "P1"
        }));
        log_activity(&state, "ws", NewActivity {
            date: NaiveDate::from_ymd_opt(2026, 3, 18).unwrap(),
            activity_type: ActivityType::Meeting,
            stakeholder_ids: vec!["s1".to_string()],
            summary: "Budget review".to_string(),
        })
        .unwrap();

        let dash = dashboard(&state, "ws", today()).unwrap();
        assert_eq!(dash.stats.total_stakeholders, 2);
        assert_eq!(dash.meeting_gaps.len(), 1);
        assert_eq!(dash.meeting_gaps[0].stakeholder.id, "s2");
        assert!(dash.meeting_gaps[0].days_since_last_meeting.is_none());
        assert_eq!(dash.coverage.len(), 2);
        assert!(!dash.alerts.is_empty(), "never-contacted blocker is alerted");
        assert_eq!(dash.health, deal_health(&state, "ws", today()).unwrap());
        assert_eq!(dash.meeting_gaps, meeting_gaps(&state, "ws", today()).unwrap());
    }

    #[test]
    fn test_dashboard_unknown_workspace() {
        let state = test_state();
        assert!(matches!(
            dashboard(&state, "nope", today()),
            Err(DealError::NotFound { .. })
        ));
    }
}
