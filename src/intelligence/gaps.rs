//! Meeting gaps: high-priority stakeholders overdue for a meeting.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::Serialize;

use crate::types::{Activity, ActivityType, Stakeholder};
use crate::util::days_since;

/// A P0/P1 stakeholder without a meeting in this many days is overdue.
pub const MEETING_GAP_DAYS: i64 = 14;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingGap {
    pub stakeholder: Stakeholder,
    /// `None` when no meeting was ever recorded.
    pub days_since_last_meeting: Option<i64>,
    pub last_meeting_date: Option<NaiveDate>,
}

/// Overdue stakeholders, never-met first, then longest gap first.
pub fn detect_meeting_gaps(
    stakeholders: &[Stakeholder],
    activities: &[Activity],
    today: NaiveDate,
) -> Vec<MeetingGap> {
    let mut gaps: Vec<MeetingGap> = stakeholders
        .iter()
        .filter(|s| s.priority.is_high())
        .filter_map(|s| {
            let last_meeting = activities
                .iter()
                .filter(|a| a.activity_type == ActivityType::Meeting && a.involves(&s.id))
                .map(|a| a.date)
                .max();
            let days = last_meeting.map(|d| days_since(d, today));
            match days {
                Some(n) if n <= MEETING_GAP_DAYS => None,
                _ => Some(MeetingGap {
                    stakeholder: s.clone(),
                    days_since_last_meeting: days,
                    last_meeting_date: last_meeting,
                }),
            }
        })
        .collect();

    // Stable: equal gaps keep collection order.
    gaps.sort_by(|a, b| match (a.days_since_last_meeting, b.days_since_last_meeting) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => y.cmp(&x),
    });
    gaps
}
