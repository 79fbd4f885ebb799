//! Locating a log excerpt between two literal markers.
//!
//! Markers are plain substrings: no regex, no case folding. A missing marker
//! is the common case (most logs match most rules not at all), so it is
//! reported as `None` rather than an error.

use serde::{Deserialize, Serialize};

/// Which occurrence of a marker pair an extraction anchors on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractPolicy {
    /// First `start`, then the first `end` after it.
    Forward,
    /// Last `end`, then the last `start` before it. A banner that repeats
    /// through a log is captured only at its final occurrence.
    #[default]
    LastMatch,
}

impl ExtractPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::LastMatch => "last-match",
        }
    }
}

impl std::fmt::Display for ExtractPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExtractPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" => Ok(Self::Forward),
            "last-match" => Ok(Self::LastMatch),
            other => Err(format!(
                "unknown extract policy '{other}': expected 'forward' or 'last-match'"
            )),
        }
    }
}

/// Return the slice of `body` spanning `start` through `end`, both markers included.
///
/// Empty markers never match.
pub fn extract<'a>(body: &'a str, start: &str, end: &str, policy: ExtractPolicy) -> Option<&'a str> {
    if start.is_empty() || end.is_empty() {
        return None;
    }

    match policy {
        ExtractPolicy::Forward => {
            let start_idx = body.find(start)?;
            let after_start = start_idx + start.len();
            let end_idx = after_start + body[after_start..].find(end)?;
            Some(&body[start_idx..end_idx + end.len()])
        }
        ExtractPolicy::LastMatch => {
            let end_idx = body.rfind(end)?;
            let start_idx = body[..end_idx].rfind(start)?;
            Some(&body[start_idx..end_idx + end.len()])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORWARD: ExtractPolicy = ExtractPolicy::Forward;
    const LAST: ExtractPolicy = ExtractPolicy::LastMatch;

    #[test]
    fn includes_both_markers() {
        let body = "noise\nBEGIN\ndetail\nEND\ntrailer";
        assert_eq!(extract(body, "BEGIN", "END", LAST), Some("BEGIN\ndetail\nEND"));
        assert_eq!(extract(body, "BEGIN", "END", FORWARD), Some("BEGIN\ndetail\nEND"));
    }

    #[test]
    fn missing_marker_is_none() {
        assert_eq!(extract("BEGIN only", "BEGIN", "END", LAST), None);
        assert_eq!(extract("END only", "BEGIN", "END", LAST), None);
        assert_eq!(extract("BEGIN only", "BEGIN", "END", FORWARD), None);
        assert_eq!(extract("", "BEGIN", "END", FORWARD), None);
    }

    #[test]
    fn start_must_precede_end() {
        let body = "END\nBEGIN";
        assert_eq!(extract(body, "BEGIN", "END", LAST), None);
        assert_eq!(extract(body, "BEGIN", "END", FORWARD), None);
    }

    #[test]
    fn policies_disagree_on_repeated_pairs() {
        let body = "BEGIN first END\nBEGIN second END";
        assert_eq!(extract(body, "BEGIN", "END", FORWARD), Some("BEGIN first END"));
        assert_eq!(extract(body, "BEGIN", "END", LAST), Some("BEGIN second END"));
    }

    #[test]
    fn last_match_takes_nearest_start_before_last_end() {
        // Two starts, one end: the excerpt is as short as possible.
        let body = "BEGIN a\nBEGIN b\nEND";
        assert_eq!(extract(body, "BEGIN", "END", LAST), Some("BEGIN b\nEND"));
        // Forward keeps the first start and spans over the second.
        assert_eq!(extract(body, "BEGIN", "END", FORWARD), Some("BEGIN a\nBEGIN b\nEND"));
    }

    #[test]
    fn end_search_starts_after_start_marker() {
        // "Error(s)" must not be satisfied by text inside the start marker itself.
        let body = "Error(s) then Error(s)";
        assert_eq!(
            extract(body, "Error(s)", "Error(s)", FORWARD),
            Some("Error(s) then Error(s)")
        );
        assert_eq!(
            extract(body, "Error(s)", "Error(s)", LAST),
            Some("Error(s) then Error(s)")
        );
        assert_eq!(extract("Error(s)", "Error(s)", "Error(s)", LAST), None);
    }

    #[test]
    fn empty_markers_never_match() {
        assert_eq!(extract("anything", "", "thing", LAST), None);
        assert_eq!(extract("anything", "any", "", FORWARD), None);
    }

    #[test]
    fn multibyte_text_around_markers() {
        let body = "é BEGIN ü END ß";
        assert_eq!(extract(body, "BEGIN", "END", LAST), Some("BEGIN ü END"));
    }

    #[test]
    fn policy_parse_and_display() {
        assert_eq!("forward".parse::<ExtractPolicy>().unwrap(), FORWARD);
        assert_eq!("last-match".parse::<ExtractPolicy>().unwrap(), LAST);
        assert!("backwards".parse::<ExtractPolicy>().is_err());
        assert_eq!(LAST.to_string(), "last-match");
        assert_eq!(ExtractPolicy::default(), LAST);
    }
}
