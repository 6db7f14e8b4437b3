//! Normalization helpers shared by the Gmail and Calendar fetchers.
//!
//! Pure functions, so the awkward bits of Google's payloads (RFC 2822 dates,
//! resource rooms, invite mails) are testable without HTTP.

use chrono::{DateTime, NaiveDate};

use crate::util::name_from_email;

/// Calendar dates of a Gmail `Date:` header.
///
/// Handles RFC 2822 with and without a trailing `(UTC)` style comment, and
/// falls back to RFC 3339. The date is taken in the sender's offset.
pub fn parse_header_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let without_comment = match trimmed.rfind('(') {
        Some(idx) if trimmed.ends_with(')') => trimmed[..idx].trim_end(),
        _ => trimmed,
    };
    DateTime::parse_from_rfc2822(without_comment)
        .or_else(|_| DateTime::parse_from_rfc3339(without_comment))
        .map(|dt| dt.date_naive())
        .ok()
}

/// Date part of a Calendar `start.dateTime` or `start.date` value.
pub fn event_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.split('T').next()?.trim();
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Gmail messages that are really calendar traffic.
pub fn is_calendar_invite(subject: &str, content_type: &str) -> bool {
    let subject = subject.to_lowercase();
    content_type.to_lowercase().contains("calendar")
        || subject.contains("invite")
        || subject.contains("accepted:")
        || subject.contains("declined:")
}

/// Meeting rooms and other bookable resources.
pub fn is_resource_attendee(email: &str, resource_flag: Option<bool>) -> bool {
    resource_flag == Some(true) || email.to_lowercase().contains("resource.calendar")
}

/// Display name for a calendar attendee without a `displayName`.
pub fn attendee_display_name(display_name: Option<&str>, email: &str) -> String {
    if let Some(name) = display_name.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    let derived = name_from_email(email.trim());
    if derived.is_empty() {
        "Unknown".to_string()
    } else {
        derived
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_header_date_forms() {
        assert_eq!(
            parse_header_date("Tue, 10 Mar 2026 09:15:00 -0700"),
            Some(date(2026, 3, 10))
        );
        assert_eq!(
            parse_header_date("Tue, 10 Mar 2026 23:15:00 +0000 (UTC)"),
            Some(date(2026, 3, 10))
        );
        assert_eq!(
            parse_header_date("2026-03-10T09:15:00Z"),
            Some(date(2026, 3, 10))
        );
        assert_eq!(parse_header_date("yesterday"), None);
        assert_eq!(parse_header_date(""), None);
    }

    #[test]
    fn test_event_date() {
        assert_eq!(event_date("2026-04-02T10:00:00-07:00"), Some(date(2026, 4, 2)));
        assert_eq!(event_date("2026-04-02"), Some(date(2026, 4, 2)));
        assert_eq!(event_date(""), None);
    }

    #[test]
    fn test_is_calendar_invite() {
        assert!(is_calendar_invite("Invitation: QBR", "text/plain"));
        assert!(is_calendar_invite("Accepted: QBR @ Tue", ""));
        assert!(is_calendar_invite("Re: pricing", "text/calendar; method=REQUEST"));
        assert!(!is_calendar_invite("Re: pricing", "text/plain"));
    }

    #[test]
    fn test_is_resource_attendee() {
        assert!(is_resource_attendee("c_123@resource.calendar.google.com", None));
        assert!(is_resource_attendee("room@acme.com", Some(true)));
        assert!(!is_resource_attendee("dana@acme.com", Some(false)));
    }

    #[test]
    fn test_attendee_display_name() {
        assert_eq!(attendee_display_name(Some(" Dana Park "), "d@acme.com"), "Dana Park");
        assert_eq!(attendee_display_name(None, "dana.park@acme.com"), "Dana Park");
        assert_eq!(attendee_display_name(Some(""), ""), "Unknown");
    }
}
