//! Field-level merge of partial stakeholder updates.
//!
//! Sync passes and confirmed imports never clobber history:
//! - `lastContactDate` only moves forward
//! - `keyPriorities` grow by set union
//! - `notes` are appended under a `[<source> <date>]` tag
//! - `email` is filled once and never replaced
//!
//! Every other field present in the update overwrites, including
//! `relationshipStrength`, which is treated as a fresh assessment.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{DealRole, Priority, RelationshipStrength, Stakeholder, StakeholderPatch};
use crate::util::dedupe_tags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeSource {
    SmartImport,
    GmailSync,
    CalendarSync,
}

impl MergeSource {
    pub fn label(self) -> &'static str {
        match self {
            MergeSource::SmartImport => "Smart Import",
            MergeSource::GmailSync => "Gmail Sync",
            MergeSource::CalendarSync => "Calendar Sync",
        }
    }
}

/// Where an update came from, used to tag appended notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provenance {
    pub source: MergeSource,
    pub date: NaiveDate,
}

impl Provenance {
    pub fn new(source: MergeSource, date: NaiveDate) -> Self {
        Self { source, date }
    }

    fn note_tag(&self) -> String {
        format!("[{} {}]", self.source.label(), self.date.format("%Y-%m-%d"))
    }
}

/// Proposed changes to one stakeholder. `None`/empty means "leave alone".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeholderUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub role: Option<DealRole>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub last_contact_date: Option<NaiveDate>,
    #[serde(default)]
    pub relationship_strength: Option<RelationshipStrength>,
    #[serde(default)]
    pub key_priorities: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub stakeholder: Stakeholder,
    /// camelCase names of the fields whose value changed.
    pub changed: Vec<&'static str>,
}

impl MergeOutcome {
    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Merge `update` into a copy of `existing`.
pub fn merge(existing: &Stakeholder, update: &StakeholderUpdate, provenance: Provenance) -> MergeOutcome {
    let mut out = existing.clone();
    let mut changed = Vec::new();

    macro_rules! overwrite {
        ($field:ident, $value:expr, $label:literal) => {
            if let Some(v) = $value {
                if out.$field != v {
                    out.$field = v;
                    changed.push($label);
                }
            }
        };
    }

    overwrite!(name, non_blank(&update.name).map(str::to_string), "name");
    overwrite!(title, non_blank(&update.title).map(str::to_string), "title");
    overwrite!(team, non_blank(&update.team).map(str::to_string), "team");
    overwrite!(role, update.role, "role");
    overwrite!(priority, update.priority, "priority");
    overwrite!(
        relationship_strength,
        update.relationship_strength,
        "relationshipStrength"
    );

    if let Some(incoming) = update.last_contact_date {
        let later = match out.last_contact_date {
            Some(current) => incoming > current,
            None => true,
        };
        if later {
            out.last_contact_date = Some(incoming);
            changed.push("lastContactDate");
        }
    }

    if !update.key_priorities.is_empty() {
        let merged = dedupe_tags(
            out.key_priorities
                .iter()
                .cloned()
                .chain(update.key_priorities.iter().cloned()),
        );
        if merged != out.key_priorities {
            out.key_priorities = merged;
            changed.push("keyPriorities");
        }
    }

    if let Some(note) = non_blank(&update.notes) {
        out.notes = if out.notes.trim().is_empty() {
            note.to_string()
        } else {
            format!("{}\n\n{} {}", out.notes, provenance.note_tag(), note)
        };
        changed.push("notes");
    }

    if out.email_key().is_none() {
        if let Some(email) = non_blank(&update.email) {
            out.email = Some(email.to_lowercase());
            changed.push("email");
        }
    }

    MergeOutcome {
        stakeholder: out,
        changed,
    }
}

/// Apply a direct user edit. Unlike [`merge`], present fields always win.
pub fn apply_patch(existing: &Stakeholder, patch: &StakeholderPatch) -> Stakeholder {
    let mut out = existing.clone();
    if let Some(name) = non_blank(&patch.name) {
        out.name = name.to_string();
    }
    if let Some(title) = &patch.title {
        out.title = title.clone();
    }
    if let Some(team) = &patch.team {
        out.team = team.clone();
    }
    if let Some(role) = patch.role {
        out.role = role;
    }
    if let Some(priority) = patch.priority {
        out.priority = priority;
    }
    if let Some(date) = patch.last_contact_date {
        out.last_contact_date = Some(date);
    }
    if let Some(strength) = patch.relationship_strength {
        out.relationship_strength = strength;
    }
    if let Some(tags) = &patch.key_priorities {
        out.key_priorities = dedupe_tags(tags.iter().cloned());
    }
    if let Some(notes) = &patch.notes {
        out.notes = notes.clone();
    }
    if let Some(email) = &patch.email {
        let email = email.trim().to_lowercase();
        out.email = if email.is_empty() { None } else { Some(email) };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn make_stakeholder() -> Stakeholder {
        Stakeholder {
            id: "s1".to_string(),
            name: "Dana Park".to_string(),
            title: "VP Finance".to_string(),
            team: "Finance".to_string(),
            role: DealRole::EconomicBuyer,
            priority: Priority::P0,
            last_contact_date: Some(date(3, 10)),
            relationship_strength: RelationshipStrength::Neutral,
            key_priorities: vec!["cost".to_string()],
            notes: "Met at kickoff".to_string(),
            email: Some("dana@acme.com".to_string()),
        }
    }

    fn import(d: NaiveDate) -> Provenance {
        Provenance::new(MergeSource::SmartImport, d)
    }

    #[test]
    fn test_last_contact_never_moves_backward() {
        let existing = make_stakeholder();
        let update = StakeholderUpdate {
            last_contact_date: Some(date(2, 1)),
            ..Default::default()
        };
        let out = merge(&existing, &update, import(date(3, 20)));
        assert_eq!(out.stakeholder.last_contact_date, Some(date(3, 10)));
        assert!(!out.is_changed());

        let later = StakeholderUpdate {
            last_contact_date: Some(date(3, 11)),
            ..Default::default()
        };
        let out = merge(&existing, &later, import(date(3, 20)));
        assert_eq!(out.stakeholder.last_contact_date, Some(date(3, 11)));
        assert_eq!(out.changed, vec!["lastContactDate"]);
    }

    #[test]
    fn test_last_contact_fills_when_never_contacted() {
        let mut existing = make_stakeholder();
        existing.last_contact_date = None;
        let update = StakeholderUpdate {
            last_contact_date: Some(date(1, 1)),
            ..Default::default()
        };
        let out = merge(&existing, &update, import(date(1, 1)));
        assert_eq!(out.stakeholder.last_contact_date, Some(date(1, 1)));
    }

    #[test]
    fn test_key_priorities_union() {
        let update = StakeholderUpdate {
            key_priorities: vec!["security".to_string(), "cost".to_string()],
            ..Default::default()
        };
        let out = merge(&make_stakeholder(), &update, import(date(3, 20)));
        assert_eq!(out.stakeholder.key_priorities, vec!["cost", "security"]);

        let same = StakeholderUpdate {
            key_priorities: vec!["cost".to_string()],
            ..Default::default()
        };
        assert!(!merge(&make_stakeholder(), &same, import(date(3, 20))).is_changed());
    }

    #[test]
    fn test_notes_appended_with_provenance() {
        let update = StakeholderUpdate {
            notes: Some("Worried about timeline".to_string()),
            ..Default::default()
        };
        let out = merge(&make_stakeholder(), &update, import(date(3, 20)));
        assert_eq!(
            out.stakeholder.notes,
            "Met at kickoff\n\n[Smart Import 2026-03-20] Worried about timeline"
        );
    }

    #[test]
    fn test_notes_replace_empty_without_tag() {
        let mut existing = make_stakeholder();
        existing.notes = "  ".to_string();
        let update = StakeholderUpdate {
            notes: Some("First note".to_string()),
            ..Default::default()
        };
        let out = merge(&existing, &update, Provenance::new(MergeSource::GmailSync, date(3, 20)));
        assert_eq!(out.stakeholder.notes, "First note");
    }

    #[test]
    fn test_email_fill_only_when_unset() {
        let update = StakeholderUpdate {
            email: Some("other@acme.com".to_string()),
            ..Default::default()
        };
        let out = merge(&make_stakeholder(), &update, import(date(3, 20)));
        assert_eq!(out.stakeholder.email.as_deref(), Some("dana@acme.com"));

        let mut blank = make_stakeholder();
        blank.email = None;
        let update = StakeholderUpdate {
            email: Some("Dana.Park@ACME.com".to_string()),
            ..Default::default()
        };
        let out = merge(&blank, &update, import(date(3, 20)));
        assert_eq!(out.stakeholder.email.as_deref(), Some("dana.park@acme.com"));
        assert_eq!(out.changed, vec!["email"]);
    }

    #[test]
    fn test_strength_and_scalars_overwrite() {
        let update = StakeholderUpdate {
            relationship_strength: Some(RelationshipStrength::AtRisk),
            title: Some("CFO".to_string()),
            team: Some("   ".to_string()),
            ..Default::default()
        };
        let out = merge(&make_stakeholder(), &update, import(date(3, 20)));
        assert_eq!(out.stakeholder.relationship_strength, RelationshipStrength::AtRisk);
        assert_eq!(out.stakeholder.title, "CFO");
        assert_eq!(out.stakeholder.team, "Finance", "blank values are ignored");
        assert_eq!(out.changed, vec!["title", "relationshipStrength"]);
    }

    #[test]
    fn test_apply_patch_overwrites_and_clears_email() {
        let patch = StakeholderPatch {
            last_contact_date: Some(date(1, 5)),
            key_priorities: Some(vec!["uptime".to_string()]),
            notes: Some(String::new()),
            email: Some(String::new()),
            ..Default::default()
        };
        let out = apply_patch(&make_stakeholder(), &patch);
        assert_eq!(out.last_contact_date, Some(date(1, 5)));
        assert_eq!(out.key_priorities, vec!["uptime"]);
        assert_eq!(out.notes, "");
        assert_eq!(out.email, None);
        assert_eq!(out.id, "s1");
    }
}
