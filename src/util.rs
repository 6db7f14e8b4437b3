use std::io::Write;
use std::path::Path;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

/// Whole days from `date` to `today`. Negative for future dates.
pub fn days_since(date: NaiveDate, today: NaiveDate) -> i64 {
    (today - date).num_days()
}

/// Derive a display name from an email address (best-effort).
///
/// Example: "sarah.chen@acme.com" → "Sarah Chen"
pub fn name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or(email);
    local
        .split(|c: char| c == '.' || c == '_' || c == '-' || c == '+')
        .filter(|s| !s.is_empty())
        .map(|s| {
            let mut chars = s.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercased domain part of an email address.
///
/// Example: "Sarah.Chen@Acme.COM" → "acme.com"
pub fn email_domain(email: &str) -> Option<String> {
    let (_, domain) = email.trim().rsplit_once('@')?;
    let domain = domain.trim().trim_end_matches('>').to_lowercase();
    if domain.is_empty() {
        None
    } else {
        Some(domain)
    }
}

/// A mail header address split into display name and address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress {
    pub name: String,
    pub email: String,
}

fn address_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^"?([^"<]+)"?\s*<?([^>]+@[^>]+)>?$"#).expect("address regex"))
}

/// Parse a `From:`/`To:` header value.
///
/// Accepts `"Name" <addr>`, `Name <addr>`, `<addr>` and bare `addr`. When the
/// header carries no display name, one is derived from the local part.
pub fn parse_address(raw: &str) -> Option<ParsedAddress> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    // Bare addresses would split inside the local part, so only use the
    // pattern when there is an angle-bracketed address.
    if raw.contains('<') {
        if let Some(caps) = address_re().captures(raw) {
            let name = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            let email = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
            if !email.is_empty() && !name.is_empty() {
                return Some(ParsedAddress {
                    name: name.to_string(),
                    email: email.to_lowercase(),
                });
            }
        }
    }

    let inner = match (raw.rfind('<'), raw.rfind('>')) {
        (Some(open), Some(close)) if open < close => &raw[open + 1..close],
        (Some(open), None) => &raw[open + 1..],
        _ => raw,
    };
    let email = inner.trim().to_lowercase();
    if !email.contains('@') {
        return None;
    }
    Some(ParsedAddress {
        name: name_from_email(&email),
        email,
    })
}

/// Convert a display name to a URL-safe kebab-case slug.
///
/// Example: "Acme Corp" → "acme-corp"
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Trim, drop blanks and de-duplicate tags, keeping first occurrence order.
pub fn dedupe_tags<I>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// First `max` characters of `s`, on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Strip a surrounding markdown code fence (```json ... ```) if present.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Find the first complete JSON object `{...}` in the text.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if escape {
            escape = false;
            continue;
        }
        if b == b'\\' && in_string {
            escape = true;
            continue;
        }
        if b == b'"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Write `content` to `path` via a sibling temp file and rename.
pub fn atomic_write_str(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Acme Corp"), "acme-corp");
    }

    #[test]
    fn test_slugify_special_chars() {
        assert_eq!(slugify("  AI Labs, Inc. "), "ai-labs-inc");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_days_since() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(days_since(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(), today), 28);
        assert_eq!(days_since(today, today), 0);
        assert_eq!(days_since(NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(), today), -2);
    }

    #[test]
    fn test_name_from_email() {
        assert_eq!(name_from_email("sarah.chen@acme.com"), "Sarah Chen");
        assert_eq!(name_from_email("joe_smith@bigcorp.io"), "Joe Smith");
        assert_eq!(name_from_email("alice@example.com"), "Alice");
    }

    #[test]
    fn test_email_domain() {
        assert_eq!(email_domain("Sarah@Acme.COM").as_deref(), Some("acme.com"));
        assert_eq!(email_domain("nobody"), None);
        assert_eq!(email_domain("x@"), None);
    }

    #[test]
    fn test_parse_address_forms() {
        let quoted = parse_address("\"Dana Park\" <Dana.Park@acme.com>").unwrap();
        assert_eq!(quoted.name, "Dana Park");
        assert_eq!(quoted.email, "dana.park@acme.com");

        let plain = parse_address("Lee Wong <lee@acme.com>").unwrap();
        assert_eq!(plain.name, "Lee Wong");

        let bare = parse_address("chris.ito@acme.com").unwrap();
        assert_eq!(bare.name, "Chris Ito");
        assert_eq!(bare.email, "chris.ito@acme.com");

        let angle = parse_address("<ops@acme.com>").unwrap();
        assert_eq!(angle.name, "Ops");

        assert!(parse_address("not an address").is_none());
        assert!(parse_address("").is_none());
    }

    #[test]
    fn test_dedupe_tags_keeps_order() {
        let tags = vec![
            "cost".to_string(),
            " security ".to_string(),
            "cost".to_string(),
            "".to_string(),
        ];
        assert_eq!(dedupe_tags(tags), vec!["cost", "security"]);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {\"b\":2} "), "{\"b\":2}");
    }

    #[test]
    fn test_extract_json_object_skips_prose() {
        let text = "Here you go:\n{\"a\": {\"b\": \"}\"}} trailing";
        assert_eq!(extract_json_object(text), Some("{\"a\": {\"b\": \"}\"}}"));
        assert_eq!(extract_json_object("no json"), None);
    }

    #[test]
    fn test_atomic_write_str() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");
        atomic_write_str(&path, "{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
        atomic_write_str(&path, "[1]").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1]");
    }
}
