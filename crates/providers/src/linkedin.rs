// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Canonical public URLs and slugs for entity identifiers
//!
//! Callers may identify an entity by its public slug (`williamhgates`), by a
//! full public URL, or for posts by an activity id or URN. Adapters that need
//! a URL or a bare slug normalise through here.

use url::Url;

const PUBLIC_BASE: &str = "https://www.linkedin.com";
const ACTIVITY_URN_PREFIX: &str = "urn:li:activity:";

/// Public profile URL for a slug or URL
pub fn profile_url(identifier: &str) -> String {
    as_url(identifier).unwrap_or_else(|| format!("{PUBLIC_BASE}/in/{}", identifier.trim()))
}

/// Public company page URL for a slug, numeric id or URL
pub fn company_url(identifier: &str) -> String {
    as_url(identifier).unwrap_or_else(|| format!("{PUBLIC_BASE}/company/{}", identifier.trim()))
}

/// Public post URL for an activity id, URN or URL
pub fn post_url(identifier: &str) -> String {
    as_url(identifier)
        .unwrap_or_else(|| format!("{PUBLIC_BASE}/feed/update/{}", activity_urn(identifier)))
}

/// Activity URN for an activity id, URN or post URL
pub fn activity_urn(identifier: &str) -> String {
    let trimmed = identifier.trim();
    if let Some(position) = trimmed.find(ACTIVITY_URN_PREFIX) {
        let rest = &trimmed[position + ACTIVITY_URN_PREFIX.len()..];
        let id: String = rest.chars().take_while(char::is_ascii_digit).collect();
        return format!("{ACTIVITY_URN_PREFIX}{id}");
    }
    format!("{ACTIVITY_URN_PREFIX}{trimmed}")
}

/// Bare slug for a profile or company identifier
///
/// `https://www.linkedin.com/in/jane-doe/` and `jane-doe` both yield
/// `jane-doe`.
pub fn slug(identifier: &str) -> String {
    let trimmed = identifier.trim();
    let Ok(parsed) = Url::parse(trimmed) else {
        return trimmed.trim_matches('/').to_string();
    };
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|segments| segments.filter(|segment| !segment.is_empty()).collect())
        .unwrap_or_default();

    segments
        .windows(2)
        .find(|pair| matches!(pair[0], "in" | "company" | "school"))
        .map(|pair| pair[1])
        .or_else(|| segments.last().copied())
        .unwrap_or(trimmed)
        .to_string()
}

/// Whether `identifier` is a numeric organization id
pub fn is_numeric_id(identifier: &str) -> bool {
    let trimmed = identifier.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit())
}

fn as_url(identifier: &str) -> Option<String> {
    let trimmed = identifier.trim();
    Url::parse(trimmed)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(|_| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_and_urls() {
        assert_eq!(profile_url("jane-doe"), "https://www.linkedin.com/in/jane-doe");
        assert_eq!(
            profile_url("https://www.linkedin.com/in/jane-doe/"),
            "https://www.linkedin.com/in/jane-doe/"
        );
        assert_eq!(company_url("acme"), "https://www.linkedin.com/company/acme");
        assert_eq!(slug("https://www.linkedin.com/in/jane-doe/"), "jane-doe");
        assert_eq!(slug("https://www.linkedin.com/company/acme/about/"), "acme");
        assert_eq!(slug("jane-doe"), "jane-doe");
    }

    #[test]
    fn post_identifiers() {
        assert_eq!(activity_urn("7150000000000000000"), "urn:li:activity:7150000000000000000");
        assert_eq!(
            activity_urn("https://www.linkedin.com/feed/update/urn:li:activity:42/"),
            "urn:li:activity:42"
        );
        assert_eq!(
            post_url("42"),
            "https://www.linkedin.com/feed/update/urn:li:activity:42"
        );
    }

    #[test]
    fn numeric_ids() {
        assert!(is_numeric_id("1035"));
        assert!(!is_numeric_id("microsoft"));
        assert!(!is_numeric_id(""));
    }
}
