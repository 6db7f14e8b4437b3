//! Identity resolution: map a name/email mention onto an existing stakeholder.
//!
//! Rules run as ordered tiers. Each tier scans the whole collection before the
//! next one is tried, and the first stakeholder (in collection order) that
//! satisfies the first matching tier wins. This is first-fit, not best-fit:
//! two equally plausible stakeholders in the same tier resolve to whichever
//! comes first.

use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

use crate::types::Stakeholder;
use crate::util::email_domain;

/// Webmail domains never treated as an account's own domain.
pub const PERSONAL_EMAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "outlook.com",
    "hotmail.com",
    "yahoo.com",
    "icloud.com",
    "me.com",
    "live.com",
];

/// Which tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchRule {
    Email,
    ExactName,
    FirstAndLastToken,
    FirstToken,
    LastToken,
    Substring,
}

impl MatchRule {
    /// Display confidence. Never used for branching.
    pub fn confidence(self) -> u8 {
        match self {
            MatchRule::Email | MatchRule::ExactName => 100,
            MatchRule::FirstAndLastToken => 95,
            MatchRule::FirstToken => 75,
            MatchRule::LastToken => 60,
            MatchRule::Substring => 70,
        }
    }
}

const RULE_ORDER: [MatchRule; 6] = [
    MatchRule::Email,
    MatchRule::ExactName,
    MatchRule::FirstAndLastToken,
    MatchRule::FirstToken,
    MatchRule::LastToken,
    MatchRule::Substring,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityMatch {
    pub id: String,
    pub confidence: u8,
    pub rule: MatchRule,
}

/// NFKC, lowercase, trimmed, internal whitespace collapsed to single spaces.
pub fn normalize_name(name: &str) -> String {
    name.nfkc()
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

struct NameKey {
    full: String,
    tokens: Vec<String>,
}

impl NameKey {
    fn new(name: &str) -> Self {
        let full = normalize_name(name);
        let tokens = full.split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect();
        Self { full, tokens }
    }

    fn is_empty(&self) -> bool {
        self.full.is_empty()
    }

    fn first(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    fn last(&self) -> Option<&str> {
        self.tokens.last().map(String::as_str)
    }

    fn multi_token(&self) -> bool {
        self.tokens.len() > 1
    }
}

fn rule_fires(rule: MatchRule, candidate: &NameKey, email: Option<&str>, s: &Stakeholder) -> bool {
    if rule == MatchRule::Email {
        return match (email, s.email_key()) {
            (Some(e), Some(existing)) => e == existing,
            _ => false,
        };
    }

    let existing = NameKey::new(&s.name);
    if candidate.is_empty() || existing.is_empty() {
        return false;
    }

    match rule {
        MatchRule::Email => false,
        MatchRule::ExactName => candidate.full == existing.full,
        MatchRule::FirstAndLastToken => {
            candidate.multi_token()
                && existing.multi_token()
                && candidate.first() == existing.first()
                && candidate.last() == existing.last()
        }
        MatchRule::FirstToken => {
            (candidate.tokens.len() == 1 && candidate.first() == existing.first())
                || (existing.tokens.len() == 1 && existing.first() == candidate.first())
        }
        MatchRule::LastToken => {
            candidate.multi_token() && existing.multi_token() && candidate.last() == existing.last()
        }
        MatchRule::Substring => {
            candidate.full.contains(&existing.full) || existing.full.contains(&candidate.full)
        }
    }
}

/// Resolve a mention against the stakeholder collection.
///
/// Returns `None` when no rule fires; callers treat that as a new-stakeholder
/// candidate.
pub fn resolve(name: &str, email: Option<&str>, stakeholders: &[Stakeholder]) -> Option<IdentityMatch> {
    let candidate = NameKey::new(name);
    let email = email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());

    for rule in RULE_ORDER {
        if let Some(s) = stakeholders
            .iter()
            .find(|s| rule_fires(rule, &candidate, email.as_deref(), s))
        {
            return Some(IdentityMatch {
                id: s.id.clone(),
                confidence: rule.confidence(),
                rule,
            });
        }
    }
    None
}

pub fn is_personal_domain(domain: &str) -> bool {
    let domain = domain.trim().to_lowercase();
    PERSONAL_EMAIL_DOMAINS.contains(&domain.as_str())
}

/// Whether an unmatched contact at `email` may be auto-created by a sync pass.
///
/// The domain must equal an account domain or be a subdomain of one.
/// Personal webmail domains never qualify, even if configured.
pub fn domain_allows_auto_create(email: &str, account_domains: &[String]) -> bool {
    let Some(domain) = email_domain(email) else {
        return false;
    };
    if is_personal_domain(&domain) {
        return false;
    }
    account_domains.iter().any(|allowed| {
        let allowed = allowed.trim().trim_start_matches('@').to_lowercase();
        !allowed.is_empty()
            && (domain == allowed
                || domain
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.')))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DealRole, Priority, RelationshipStrength};

    fn make_stakeholder(id: &str, name: &str, email: Option<&str>) -> Stakeholder {
        Stakeholder {
            id: id.to_string(),
            name: name.to_string(),
            title: String::new(),
            team: String::new(),
            role: DealRole::Influencer,
            priority: Priority::P2,
            last_contact_date: None,
            relationship_strength: RelationshipStrength::Unknown,
            key_priorities: Vec::new(),
            notes: String::new(),
            email: email.map(str::to_string),
        }
    }

    fn roster() -> Vec<Stakeholder> {
        vec![
            make_stakeholder("s1", "Sarah J. Connor", Some("sarah.connor@cyberdyne.com")),
            make_stakeholder("s2", "Miles Dyson", None),
            make_stakeholder("s3", "Kyle", None),
            make_stakeholder("s4", "Peter Silberman", None),
        ]
    }

    #[test]
    fn test_exact_email_wins() {
        let m = resolve("Somebody Else", Some("SARAH.CONNOR@cyberdyne.com"), &roster()).unwrap();
        assert_eq!(m.id, "s1");
        assert_eq!(m.confidence, 100);
        assert_eq!(m.rule, MatchRule::Email);
    }

    #[test]
    fn test_every_stakeholder_resolves_to_itself() {
        let list = roster();
        for s in &list {
            let by_name = resolve(&s.name, None, &list).unwrap();
            assert_eq!((by_name.id.as_str(), by_name.confidence), (s.id.as_str(), 100));
            if let Some(email) = &s.email {
                let by_email = resolve("", Some(email), &list).unwrap();
                assert_eq!((by_email.id.as_str(), by_email.confidence), (s.id.as_str(), 100));
            }
        }
    }

    #[test]
    fn test_exact_name_ignores_case_and_spacing() {
        let m = resolve("  miles   DYSON ", None, &roster()).unwrap();
        assert_eq!((m.id.as_str(), m.rule), ("s2", MatchRule::ExactName));
    }

    #[test]
    fn test_first_and_last_token_match() {
        let m = resolve("Sarah Connor", None, &roster()).unwrap();
        assert_eq!(m.id, "s1");
        assert_eq!(m.confidence, 95);
    }

    #[test]
    fn test_single_token_matches_first_name() {
        let m = resolve("Miles", None, &roster()).unwrap();
        assert_eq!((m.id.as_str(), m.confidence), ("s2", 75));

        // Existing single-token name against a full candidate name.
        let m = resolve("Kyle Reese", None, &roster()).unwrap();
        assert_eq!((m.id.as_str(), m.confidence), ("s3", 75));
    }

    #[test]
    fn test_last_token_only() {
        let m = resolve("Dr. Silberman", None, &roster()).unwrap();
        assert_eq!((m.id.as_str(), m.rule), ("s4", MatchRule::LastToken));
        assert_eq!(m.confidence, 60);
    }

    #[test]
    fn test_substring_match() {
        let list = vec![make_stakeholder("s9", "Ann-Marie Lopez", None)];
        let m = resolve("LOPEZ", None, &list).unwrap();
        assert_eq!((m.id.as_str(), m.rule), ("s9", MatchRule::Substring));
        assert_eq!(m.confidence, 70);
    }

    #[test]
    fn test_earlier_tier_beats_earlier_position() {
        // s1 only matches on last token; s2 matches on first+last further down.
        let list = vec![
            make_stakeholder("s1", "John Smith", None),
            make_stakeholder("s2", "Jane Q Smith", None),
        ];
        let m = resolve("Jane Smith", None, &list).unwrap();
        assert_eq!(m.id, "s2");
    }

    #[test]
    fn test_ties_resolve_by_collection_order() {
        let list = vec![
            make_stakeholder("s1", "Alex Kim", None),
            make_stakeholder("s2", "Alex Park", None),
        ];
        assert_eq!(resolve("Alex", None, &list).unwrap().id, "s1");
    }

    #[test]
    fn test_no_match() {
        assert!(resolve("Totally Unknown", Some("x@other.com"), &roster()).is_none());
        assert!(resolve("Anyone", None, &[]).is_none());
    }

    #[test]
    fn test_empty_name_never_matches_by_name() {
        assert!(resolve("   ", None, &roster()).is_none());
        let list = vec![make_stakeholder("s1", "", None)];
        assert!(resolve("Dana", None, &list).is_none());
    }

    #[test]
    fn test_normalize_name_nfkc() {
        assert_eq!(normalize_name("  Ｊｏｅ\u{00A0}Smith "), "joe smith");
    }

    #[test]
    fn test_domain_gating() {
        let domains = vec!["cyberdyne.com".to_string()];
        assert!(domain_allows_auto_create("a@cyberdyne.com", &domains));
        assert!(domain_allows_auto_create("a@eu.cyberdyne.com", &domains));
        assert!(!domain_allows_auto_create("a@notcyberdyne.com", &domains));
        assert!(!domain_allows_auto_create("a@other.com", &domains));
        assert!(!domain_allows_auto_create("a@cyberdyne.com", &[]));

        let personal = vec!["gmail.com".to_string()];
        assert!(!domain_allows_auto_create("someone@gmail.com", &personal));
    }
}
