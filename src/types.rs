use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Configuration
// =============================================================================

/// Main configuration loaded from `~/.dealgraph/config.json`.
///
/// Every field has a default so `{}` is a valid config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// SQLite database location. Defaults to `~/.dealgraph/dealgraph.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
    #[serde(default = "default_workspace_id")]
    pub default_workspace: String,
    /// Internal account domains. Only senders/attendees on these domains are
    /// auto-created as stakeholders by the sync passes.
    #[serde(default)]
    pub account_domains: Vec<String>,
    /// Distinct messages a new sender must have before email sync creates them.
    #[serde(default = "default_min_email_threads")]
    pub min_email_threads_for_new_contact: usize,
    #[serde(default = "default_lookback_days")]
    pub email_lookback_days: u32,
    #[serde(default = "default_max_email_threads")]
    pub max_email_threads: u32,
    #[serde(default = "default_lookback_days")]
    pub calendar_lookback_days: u32,
    #[serde(default = "default_lookahead_days")]
    pub calendar_lookahead_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_token_path: Option<String>,
    #[serde(default)]
    pub oracle: OracleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            default_workspace: default_workspace_id(),
            account_domains: Vec::new(),
            min_email_threads_for_new_contact: default_min_email_threads(),
            email_lookback_days: default_lookback_days(),
            max_email_threads: default_max_email_threads(),
            calendar_lookback_days: default_lookback_days(),
            calendar_lookahead_days: default_lookahead_days(),
            google_token_path: None,
            oracle: OracleConfig::default(),
        }
    }
}

fn default_workspace_id() -> String {
    "ai-labs".to_string()
}

fn default_min_email_threads() -> usize {
    2
}

fn default_lookback_days() -> u32 {
    30
}

fn default_lookahead_days() -> u32 {
    14
}

fn default_max_email_threads() -> u32 {
    30
}

/// AI oracle invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleConfig {
    #[serde(default = "default_oracle_command")]
    pub command: String,
    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            command: default_oracle_command(),
            timeout_secs: default_oracle_timeout(),
        }
    }
}

fn default_oracle_command() -> String {
    "claude".to_string()
}

fn default_oracle_timeout() -> u64 {
    300
}

// =============================================================================
// Enumerations
// =============================================================================

/// Error returned when a stored or submitted label doesn't name a variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Implements `as_str`, `Display` and `FromStr` from one label table.
macro_rules! labeled_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(trimmed))
                    .ok_or_else(|| UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

/// Buying-committee role of a stakeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealRole {
    #[serde(rename = "Economic Buyer")]
    EconomicBuyer,
    Champion,
    Influencer,
    #[serde(rename = "Technical Buyer")]
    TechnicalBuyer,
    #[serde(rename = "End User")]
    EndUser,
    Blocker,
}

labeled_enum!(DealRole, "deal role", {
    EconomicBuyer => "Economic Buyer",
    Champion => "Champion",
    Influencer => "Influencer",
    TechnicalBuyer => "Technical Buyer",
    EndUser => "End User",
    Blocker => "Blocker",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
}

labeled_enum!(Priority, "priority", {
    P0 => "P0",
    P1 => "P1",
    P2 => "P2",
});

impl Priority {
    /// P0 and P1 stakeholders are expected to have a standing meeting cadence.
    pub fn is_high(&self) -> bool {
        matches!(self, Priority::P0 | Priority::P1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipStrength {
    Strong,
    Neutral,
    Weak,
    #[serde(rename = "At Risk")]
    AtRisk,
    Unknown,
}

labeled_enum!(RelationshipStrength, "relationship strength", {
    Strong => "Strong",
    Neutral => "Neutral",
    Weak => "Weak",
    AtRisk => "At Risk",
    Unknown => "Unknown",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    Meeting,
    Email,
    Call,
    Slack,
}

labeled_enum!(ActivityType, "activity type", {
    Meeting => "Meeting",
    Email => "Email",
    Call => "Call",
    Slack => "Slack",
});

/// Default team list offered for new workspaces.
pub const DEFAULT_TEAMS: &[&str] = &[
    "Engineering Infrastructure",
    "Finance",
    "Legal/Compliance",
    "Product Team A",
    "Product Team B",
    "Security",
    "Procurement",
];

// =============================================================================
// Core records
// =============================================================================

/// A person relevant to a deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stakeholder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub team: String,
    pub role: DealRole,
    pub priority: Priority,
    /// `None` means never contacted.
    #[serde(default)]
    pub last_contact_date: Option<NaiveDate>,
    pub relationship_strength: RelationshipStrength,
    #[serde(default)]
    pub key_priorities: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Stakeholder {
    /// Lowercased email, if one is set and non-blank.
    pub fn email_key(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_lowercase)
    }
}

/// Fields for a stakeholder that doesn't have an ID yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStakeholder {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub team: String,
    #[serde(default = "default_role")]
    pub role: DealRole,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    #[serde(default)]
    pub last_contact_date: Option<NaiveDate>,
    #[serde(default = "default_strength")]
    pub relationship_strength: RelationshipStrength,
    #[serde(default)]
    pub key_priorities: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub email: Option<String>,
}

fn default_role() -> DealRole {
    DealRole::Influencer
}

fn default_priority() -> Priority {
    Priority::P2
}

fn default_strength() -> RelationshipStrength {
    RelationshipStrength::Unknown
}

impl NewStakeholder {
    pub fn into_stakeholder(self, id: String) -> Stakeholder {
        Stakeholder {
            id,
            name: self.name.trim().to_string(),
            title: self.title,
            team: self.team,
            role: self.role,
            priority: self.priority,
            last_contact_date: self.last_contact_date,
            relationship_strength: self.relationship_strength,
            key_priorities: crate::util::dedupe_tags(self.key_priorities),
            notes: self.notes,
            email: self
                .email
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty()),
        }
    }
}

/// Direct user edit of a stakeholder. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeholderPatch {
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
    pub key_priorities: Option<Vec<String>>,
    #[serde(default)]
    pub notes: Option<String>,
    /// An empty string clears the email.
    #[serde(default)]
    pub email: Option<String>,
}

/// A dated interaction linking one or more stakeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub date: NaiveDate,
    pub stakeholder_ids: Vec<String>,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub summary: String,
}

impl Activity {
    pub fn involves(&self, stakeholder_id: &str) -> bool {
        self.stakeholder_ids.iter().any(|id| id == stakeholder_id)
    }
}

/// Tenancy boundary: one company's deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub deal_context: String,
    #[serde(default)]
    pub deal_summary: String,
    #[serde(default)]
    pub renewal_info: String,
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    "emerald".to_string()
}

/// Request body for creating a workspace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkspace {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub deal_context: String,
    #[serde(default)]
    pub deal_summary: String,
    #[serde(default)]
    pub renewal_info: String,
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default)]
    pub color: Option<String>,
}

// =============================================================================
// Sync bookkeeping
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncSource {
    Email,
    Calendar,
}

labeled_enum!(SyncSource, "sync source", {
    Email => "email",
    Calendar => "calendar",
});

/// Outcome counters of one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub new_contacts: usize,
    pub new_activities: usize,
    pub updated_stakeholders: usize,
    #[serde(default)]
    pub details: Vec<String>,
}

/// Last sync timestamp and result for one integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub source: SyncSource,
    pub last_sync: Option<DateTime<Utc>>,
    pub last_result: Option<SyncResult>,
}
