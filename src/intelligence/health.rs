//! Deal health score.
//!
//! Additive from a base of 50, one factor per rule in a fixed order so the
//! breakdown reads the same way on every render. The final score is clamped
//! to 0..=100; individual factors are not.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::types::{DealRole, RelationshipStrength, Stakeholder};
use crate::util::days_since;

const BASE_SCORE: i32 = 50;

const ECONOMIC_BUYER_FRESH_DAYS: i64 = 30;
const BLOCKER_STALE_DAYS: i64 = 30;
const TEAM_ENGAGED_DAYS: i64 = 45;
const RECENT_CONTACT_DAYS: i64 = 14;

const STRONG_CHAMPIONS_POINTS: i32 = 15;
const SINGLE_CHAMPION_POINTS: i32 = 8;
const ECONOMIC_BUYER_POINTS: i32 = 15;
const ECONOMIC_BUYER_PENALTY: i32 = -10;
const BLOCKER_PENALTY: i32 = -8;
const MAX_COMPONENT_POINTS: i32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthFactor {
    pub label: String,
    pub impact: i32,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealHealth {
    pub score: i32,
    pub factors: Vec<HealthFactor>,
}

fn factor(label: &str, impact: i32, detail: String) -> HealthFactor {
    HealthFactor {
        label: label.to_string(),
        impact,
        detail,
    }
}

fn contacted_within(s: &Stakeholder, today: NaiveDate, days: i64) -> bool {
    s.last_contact_date
        .is_some_and(|d| days_since(d, today) < days)
}

/// `round(part / whole * scale)`, rounding halves up.
fn scaled(part: usize, whole: usize, scale: f64) -> i32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * scale).round() as i32
}

/// Score a stakeholder set as of `today`.
pub fn score_deal_health(stakeholders: &[Stakeholder], today: NaiveDate) -> DealHealth {
    if stakeholders.is_empty() {
        return DealHealth {
            score: 0,
            factors: vec![factor(
                "No stakeholders",
                0,
                "Add stakeholders to compute deal health".to_string(),
            )],
        };
    }

    let mut score = BASE_SCORE;
    let mut factors = Vec::new();
    let total = stakeholders.len();

    // Champions
    let strong_champions = stakeholders
        .iter()
        .filter(|s| {
            s.role == DealRole::Champion && s.relationship_strength == RelationshipStrength::Strong
        })
        .count();
    if strong_champions >= 2 {
        score += STRONG_CHAMPIONS_POINTS;
        factors.push(factor(
            "Strong champions",
            STRONG_CHAMPIONS_POINTS,
            format!("{} strong champion relationships", strong_champions),
        ));
    } else if strong_champions == 1 {
        score += SINGLE_CHAMPION_POINTS;
        factors.push(factor(
            "Champion coverage",
            SINGLE_CHAMPION_POINTS,
            "1 strong champion, need backup".to_string(),
        ));
    }

    // Economic buyers
    let econ_buyers: Vec<&Stakeholder> = stakeholders
        .iter()
        .filter(|s| s.role == DealRole::EconomicBuyer)
        .collect();
    let engaged_buyers = econ_buyers
        .iter()
        .filter(|s| {
            contacted_within(s, today, ECONOMIC_BUYER_FRESH_DAYS)
                && s.relationship_strength != RelationshipStrength::Weak
        })
        .count();
    if !econ_buyers.is_empty() && engaged_buyers == econ_buyers.len() {
        score += ECONOMIC_BUYER_POINTS;
        factors.push(factor(
            "Economic buyer engagement",
            ECONOMIC_BUYER_POINTS,
            "All economic buyers recently engaged".to_string(),
        ));
    } else {
        score += ECONOMIC_BUYER_PENALTY;
        let detail = if econ_buyers.is_empty() {
            "No economic buyer identified".to_string()
        } else {
            format!(
                "{} of {} economic buyers not recently engaged",
                econ_buyers.len() - engaged_buyers,
                econ_buyers.len()
            )
        };
        factors.push(factor("Economic buyer gap", ECONOMIC_BUYER_PENALTY, detail));
    }

    // Blockers: no floor, many unmanaged blockers should dominate.
    let unmanaged_blockers = stakeholders
        .iter()
        .filter(|s| s.role == DealRole::Blocker)
        .filter(|s| {
            let stale = match s.last_contact_date {
                None => true,
                Some(d) => days_since(d, today) > BLOCKER_STALE_DAYS,
            };
            stale
                || matches!(
                    s.relationship_strength,
                    RelationshipStrength::AtRisk | RelationshipStrength::Unknown
                )
        })
        .count();
    if unmanaged_blockers > 0 {
        let penalty = BLOCKER_PENALTY * unmanaged_blockers as i32;
        score += penalty;
        factors.push(factor(
            "Unmanaged blockers",
            penalty,
            format!("{} blocker(s) not engaged or at risk", unmanaged_blockers),
        ));
    }

    // Team coverage
    let teams: HashSet<&str> = stakeholders.iter().map(|s| s.team.as_str()).collect();
    let engaged_teams: HashSet<&str> = stakeholders
        .iter()
        .filter(|s| contacted_within(s, today, TEAM_ENGAGED_DAYS))
        .map(|s| s.team.as_str())
        .collect();
    let coverage_points = scaled(engaged_teams.len(), teams.len(), 10.0);
    score += coverage_points;
    factors.push(factor(
        "Team coverage",
        coverage_points,
        format!(
            "{} of {} teams recently engaged",
            engaged_teams.len(),
            teams.len()
        ),
    ));

    // Relationship health: capped above, may go negative.
    let strong = stakeholders
        .iter()
        .filter(|s| s.relationship_strength == RelationshipStrength::Strong)
        .count();
    let weak_or_at_risk = stakeholders
        .iter()
        .filter(|s| {
            matches!(
                s.relationship_strength,
                RelationshipStrength::AtRisk | RelationshipStrength::Weak
            )
        })
        .count();
    let health_points = (scaled(strong, total, 15.0) - scaled(weak_or_at_risk, total, 10.0))
        .min(MAX_COMPONENT_POINTS);
    score += health_points;
    factors.push(factor(
        "Relationship health",
        health_points,
        format!("{} strong, {} weak/at-risk", strong, weak_or_at_risk),
    ));

    // Contact recency
    let recent = stakeholders
        .iter()
        .filter(|s| contacted_within(s, today, RECENT_CONTACT_DAYS))
        .count();
    let recency_points = scaled(recent, total, 15.0).min(MAX_COMPONENT_POINTS);
    score += recency_points;
    factors.push(factor(
        "Contact recency",
        recency_points,
        format!("{} stakeholders contacted in last 2 weeks", recent),
    ));

    DealHealth {
        score: score.clamp(0, 100),
        factors,
    }
}
