//! Accept header matching for conditionally registered routes.
//!
//! # Responsibilities
//! - Split an Accept header into media ranges
//! - Compare ranges against the media types a route was declared for
//!
//! # Design Decisions
//! - Media type comparison is ASCII case-insensitive
//! - Parameters (`;q=0.9`, `;profile=...`) are ignored
//! - No wildcard expansion: `*/*` only matches a route declared for `*/*`
//! - Empty condition = always matches

/// Matches a negotiated Accept header against a set of media types.
#[derive(Debug, Clone)]
pub struct AcceptMatcher {
    media_types: Vec<String>,
}

impl AcceptMatcher {
    /// Create a new matcher.
    /// Media types are normalized to lowercase for case-insensitive matching.
    pub fn new<I, S>(media_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            media_types: media_types
                .into_iter()
                .map(|t| t.as_ref().trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// True when no media types were given.
    pub fn is_unconditional(&self) -> bool {
        self.media_types.is_empty()
    }

    /// Returns true if the header lists one of the media types.
    pub fn matches(&self, accept_header: &str) -> bool {
        media_ranges(accept_header).any(|range| {
            self.media_types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(range))
        })
    }

    /// Forward-registration gate: unconditional, or the header matches.
    pub fn admits(&self, accept_header: Option<&str>) -> bool {
        self.is_unconditional() || accept_header.is_some_and(|h| self.matches(h))
    }
}

/// Media ranges of an Accept header, parameters stripped.
pub fn media_ranges(accept_header: &str) -> impl Iterator<Item = &str> {
    accept_header
        .split(',')
        .filter_map(|range| range.split(';').next())
        .map(str::trim)
        .filter(|range| !range.is_empty())
}

/// Shorthand for a one-off check.
pub fn accepts(accept_header: &str, media_types: &[String]) -> bool {
    AcceptMatcher::new(media_types).matches(accept_header)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_matcher() {
        let matcher = AcceptMatcher::new(["application/activity+json", "application/ld+json"]);

        assert!(matcher.matches("application/activity+json"));
        assert!(matcher.matches("text/html, application/LD+JSON; profile=\"https://www.w3.org/ns/activitystreams\""));
        assert!(!matcher.matches("text/html,application/xhtml+xml;q=0.9"));
        assert!(!matcher.matches("*/*"));

        let types = vec!["application/json".to_string()];
        assert!(accepts("application/json; charset=utf-8", &types));
        assert!(!accepts("application/jsonp", &types));
    }

    #[test]
    fn test_gate() {
        let unconditional = AcceptMatcher::new(Vec::<String>::new());
        assert!(unconditional.admits(None));
        assert!(unconditional.admits(Some("text/html")));

        let json_only = AcceptMatcher::new(["application/json"]);
        assert!(!json_only.admits(None));
        assert!(!json_only.admits(Some("text/html")));
        assert!(json_only.admits(Some("text/html;q=0.5, application/json")));
    }

    #[test]
    fn test_media_ranges() {
        let ranges: Vec<&str> = media_ranges(" text/html ;q=1, ,application/json").collect();
        assert_eq!(ranges, vec!["text/html", "application/json"]);
    }
}
