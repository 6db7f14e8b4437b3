//! Dashboard signals: critical alerts, team coverage map and quick stats.
//!
//! Pure functions over the stakeholder set, like the scorer. Thresholds here
//! are display thresholds and intentionally differ from the scorer's.

use chrono::NaiveDate;
use serde::Serialize;

use crate::types::{DealRole, Priority, RelationshipStrength, Stakeholder};
use crate::util::days_since;

const MAX_ALERTS: usize = 8;
const ECONOMIC_BUYER_SILENT_DAYS: i64 = 40;
const CHAMPION_COOLING_DAYS: i64 = 20;
const ENGAGED_DAYS: i64 = 30;
/// Stand-in for "never contacted" when averaging contact age.
const NEVER_CONTACTED_DAYS: i64 = 90;

// ─────────────────────────────────────────────────────────────────────
// Critical alerts
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalAlert {
    pub severity: AlertSeverity,
    pub message: String,
    /// Absent for team-level alerts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stakeholder_id: Option<String>,
}

fn days(s: &Stakeholder, today: NaiveDate) -> Option<i64> {
    s.last_contact_date.map(|d| days_since(d, today))
}

/// Teams in first-seen order with their members.
fn group_by_team(stakeholders: &[Stakeholder]) -> Vec<(&str, Vec<&Stakeholder>)> {
    let mut teams: Vec<(&str, Vec<&Stakeholder>)> = Vec::new();
    for s in stakeholders {
        match teams.iter_mut().find(|(team, _)| *team == s.team) {
            Some((_, members)) => members.push(s),
            None => teams.push((s.team.as_str(), vec![s])),
        }
    }
    teams
}

/// Up to eight alerts, criticals before warnings, rule order preserved.
pub fn critical_alerts(stakeholders: &[Stakeholder], today: NaiveDate) -> Vec<CriticalAlert> {
    let mut alerts = Vec::new();
    let mut push = |severity, message: String, id: Option<&str>| {
        alerts.push(CriticalAlert {
            severity,
            message,
            stakeholder_id: id.map(str::to_string),
        });
    };

    for s in stakeholders.iter().filter(|s| {
        s.last_contact_date.is_none() && (s.priority == Priority::P0 || s.role == DealRole::Blocker)
    }) {
        push(
            AlertSeverity::Critical,
            format!("{} ({}, {}) has NEVER been contacted", s.name, s.title, s.role),
            Some(&s.id),
        );
    }

    for s in stakeholders.iter().filter(|s| {
        s.relationship_strength == RelationshipStrength::AtRisk && s.priority == Priority::P0
    }) {
        let since = days(s, today).map_or_else(|| "never".to_string(), |d| d.to_string());
        push(
            AlertSeverity::Critical,
            format!(
                "{} ({}) relationship is At Risk - {} days since contact",
                s.name, s.role, since
            ),
            Some(&s.id),
        );
    }

    for s in stakeholders.iter().filter(|s| s.role == DealRole::EconomicBuyer) {
        if let Some(d) = days(s, today).filter(|d| *d > ECONOMIC_BUYER_SILENT_DAYS) {
            push(
                AlertSeverity::Critical,
                format!(
                    "Economic Buyer {} last contacted {} days ago - renewal in ~60 days",
                    s.name, d
                ),
                Some(&s.id),
            );
        }
    }

    for (team, members) in group_by_team(stakeholders) {
        if members.iter().all(|m| m.last_contact_date.is_none()) {
            push(
                AlertSeverity::Critical,
                format!("{} team ({} members) has zero engagement", team, members.len()),
                None,
            );
        }
    }

    for s in stakeholders.iter().filter(|s| s.role == DealRole::Champion) {
        if let Some(d) = days(s, today).filter(|d| *d > CHAMPION_COOLING_DAYS) {
            push(
                AlertSeverity::Warning,
                format!(
                    "Champion {} hasn't been contacted in {} days - keep momentum",
                    s.name, d
                ),
                Some(&s.id),
            );
        }
    }

    for s in stakeholders.iter().filter(|s| {
        s.relationship_strength == RelationshipStrength::Weak
            && matches!(
                s.role,
                DealRole::EconomicBuyer | DealRole::Blocker | DealRole::Champion
            )
    }) {
        if !alerts
            .iter()
            .any(|a| a.stakeholder_id.as_deref() == Some(s.id.as_str()))
        {
            alerts.push(CriticalAlert {
                severity: AlertSeverity::Warning,
                message: format!(
                    "{} ({}) has a Weak relationship - invest in strengthening",
                    s.name, s.role
                ),
                stakeholder_id: Some(s.id.clone()),
            });
        }
    }

    alerts.truncate(MAX_ALERTS);
    alerts
}

// ─────────────────────────────────────────────────────────────────────
// Team coverage
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoverageStatus {
    Good,
    Partial,
    #[serde(rename = "At Risk")]
    AtRisk,
    #[serde(rename = "No Contact")]
    NoContact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamCoverage {
    pub team: String,
    pub members: usize,
    pub engaged: usize,
    pub coverage_percent: u32,
    /// Distinct roles on the team, most senior first.
    pub key_roles: Vec<DealRole>,
    pub status: CoverageStatus,
}

const ROLE_ORDER: [DealRole; 6] = [
    DealRole::EconomicBuyer,
    DealRole::Champion,
    DealRole::TechnicalBuyer,
    DealRole::Blocker,
    DealRole::Influencer,
    DealRole::EndUser,
];

/// One row per team, alphabetical.
pub fn coverage_map(stakeholders: &[Stakeholder], today: NaiveDate) -> Vec<TeamCoverage> {
    let mut rows: Vec<TeamCoverage> = group_by_team(stakeholders)
        .into_iter()
        .map(|(team, members)| {
            let engaged = members
                .iter()
                .filter(|m| days(m, today).is_some_and(|d| d < ENGAGED_DAYS))
                .count();
            let coverage_percent =
                (engaged as f64 / members.len() as f64 * 100.0).round() as u32;
            let weak_blocker = members.iter().any(|m| {
                m.role == DealRole::Blocker
                    && matches!(
                        m.relationship_strength,
                        RelationshipStrength::AtRisk
                            | RelationshipStrength::Unknown
                            | RelationshipStrength::Weak
                    )
            });

            let status = if members.iter().all(|m| m.last_contact_date.is_none()) {
                CoverageStatus::NoContact
            } else if weak_blocker || coverage_percent < 33 {
                CoverageStatus::AtRisk
            } else if coverage_percent < 66 {
                CoverageStatus::Partial
            } else {
                CoverageStatus::Good
            };

            let key_roles = ROLE_ORDER
                .iter()
                .copied()
                .filter(|r| members.iter().any(|m| m.role == *r))
                .collect();

            TeamCoverage {
                team: team.to_string(),
                members: members.len(),
                engaged,
                coverage_percent,
                key_roles,
                status,
            }
        })
        .collect();
    rows.sort_by(|a, b| a.team.cmp(&b.team));
    rows
}

// ─────────────────────────────────────────────────────────────────────
// Quick stats
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickStats {
    pub total_stakeholders: usize,
    pub p0_count: usize,
    pub teams_total: usize,
    pub teams_engaged: usize,
    pub avg_days_since_contact: i64,
    pub at_risk_count: usize,
    pub strong_count: usize,
}

pub fn quick_stats(stakeholders: &[Stakeholder], today: NaiveDate) -> QuickStats {
    let teams = group_by_team(stakeholders);
    let teams_engaged = teams
        .iter()
        .filter(|(_, members)| {
            members
                .iter()
                .any(|m| days(m, today).is_some_and(|d| d < ENGAGED_DAYS))
        })
        .count();

    let avg_days_since_contact = if stakeholders.is_empty() {
        0
    } else {
        let total: i64 = stakeholders
            .iter()
            .map(|s| days(s, today).unwrap_or(NEVER_CONTACTED_DAYS))
            .sum();
        (total as f64 / stakeholders.len() as f64).round() as i64
    };

    let at_risk_count = stakeholders
        .iter()
        .filter(|s| match s.relationship_strength {
            RelationshipStrength::AtRisk | RelationshipStrength::Weak => true,
            RelationshipStrength::Unknown => {
                matches!(s.role, DealRole::EconomicBuyer | DealRole::Blocker)
            }
            _ => false,
        })
        .count();

    QuickStats {
        total_stakeholders: stakeholders.len(),
        p0_count: stakeholders
            .iter()
            .filter(|s| s.priority == Priority::P0)
            .count(),
        teams_total: teams.len(),
        teams_engaged,
        avg_days_since_contact,
        at_risk_count,
        strong_count: stakeholders
            .iter()
            .filter(|s| s.relationship_strength == RelationshipStrength::Strong)
            .count(),
    }
}
