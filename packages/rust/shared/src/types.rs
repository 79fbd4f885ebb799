//! Core domain types shared by the Bamboo client and the triage loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BambotError, Result};

/// Feed category Bamboo attaches to passing builds.
pub const CATEGORY_BUILD_SUCCESSFUL: &str = "build.successful";

/// Feed category Bamboo attaches to failing builds.
pub const CATEGORY_BUILD_FAILED: &str = "build.failed";

// ---------------------------------------------------------------------------
// BuildKey
// ---------------------------------------------------------------------------

/// Identifies one build of one job, e.g. `CRAB-CWS144-JOB1-33`.
///
/// Bamboo is inconsistent about what a "build key" is: the REST API calls
/// `CWS144` the key, while query parameters want `CRAB-CWS144`. Here
/// [`plan_key`](Self::plan_key) is always the project-qualified form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildKey {
    /// Project-qualified plan key, e.g. `CRAB-CWS144`.
    pub plan_key: String,
    /// Job key, e.g. `JOB1`.
    pub job_key: String,
    /// Build sequence number, e.g. `33`.
    pub number: String,
}

impl BuildKey {
    /// Parse the build key from a feed entry link; the key is the last path segment.
    pub fn from_link(link: &str) -> Result<Self> {
        let last = link
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        last.parse()
    }

    /// `<plan>-<number>`, the result key used by the REST API.
    pub fn result_key(&self) -> String {
        format!("{}-{}", self.plan_key, self.number)
    }
}

impl std::str::FromStr for BuildKey {
    type Err = BambotError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 4 || parts.iter().any(|p| p.is_empty()) {
            return Err(BambotError::validation(format!(
                "unexpected format of build id: {s}"
            )));
        }
        if !parts[3].chars().all(|c| c.is_ascii_digit()) {
            return Err(BambotError::validation(format!(
                "build number is not numeric in build id: {s}"
            )));
        }

        Ok(Self {
            plan_key: format!("{}-{}", parts[0], parts[1]),
            job_key: parts[2].to_string(),
            number: parts[3].to_string(),
        })
    }
}

impl std::fmt::Display for BuildKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.plan_key, self.job_key, self.number)
    }
}

// ---------------------------------------------------------------------------
// FeedItem
// ---------------------------------------------------------------------------

/// One entry of the Bamboo activity stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    /// Link to the job result page; its last segment is the build key.
    pub link: String,
    /// When the build finished.
    pub published: DateTime<Utc>,
    /// Category terms, e.g. `build.failed`.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Free-text (HTML) summary Bamboo wrote for the entry.
    #[serde(default)]
    pub content: String,
}

impl FeedItem {
    /// Whether Bamboo tagged this entry as a passing build.
    pub fn is_successful(&self) -> bool {
        self.categories
            .iter()
            .any(|c| c == CATEGORY_BUILD_SUCCESSFUL)
    }

    /// Hours elapsed between publication and `now`.
    pub fn hours_since_publish(&self, now: DateTime<Utc>) -> f64 {
        (now - self.published).num_seconds() as f64 / 3600.0
    }
}

// ---------------------------------------------------------------------------
// BuildResult
// ---------------------------------------------------------------------------

/// Subset of the REST `result` resource that commit tracking needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    /// Plan display name, e.g. `release-2.3` or `Windows Official`.
    pub plan_name: String,
    /// Commit the build ran against.
    pub vcs_revision_key: String,
    /// `Successful`, `Failed`, `Unknown`.
    pub build_state: String,
}

impl BuildResult {
    pub fn is_successful(&self) -> bool {
        self.build_state == "Successful"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_key_from_link() {
        let key =
            BuildKey::from_link("https://bamboo.example.com/browse/CRAB-CWS144-JOB1-33").unwrap();
        assert_eq!(key.plan_key, "CRAB-CWS144");
        assert_eq!(key.job_key, "JOB1");
        assert_eq!(key.number, "33");
        assert_eq!(key.result_key(), "CRAB-CWS144-33");
        assert_eq!(key.to_string(), "CRAB-CWS144-JOB1-33");
    }

    #[test]
    fn build_key_rejects_unexpected_shapes() {
        assert!(BuildKey::from_link("https://bamboo.example.com/browse/CRAB-CWS144-33").is_err());
        assert!(BuildKey::from_link("https://bamboo.example.com/browse/A-B-C-D-1").is_err());
        assert!(BuildKey::from_link("").is_err());
        assert!("CRAB-CWS144-JOB1-latest".parse::<BuildKey>().is_err());
    }

    #[test]
    fn feed_item_success_and_age() {
        let published = Utc::now() - chrono::Duration::hours(30);
        let item = FeedItem {
            link: "https://bamboo.example.com/browse/CRAB-CWS144-JOB1-33".into(),
            published,
            categories: vec![CATEGORY_BUILD_SUCCESSFUL.into()],
            content: String::new(),
        };
        assert!(item.is_successful());
        let hours = item.hours_since_publish(Utc::now());
        assert!((29.9..30.1).contains(&hours));
    }

    #[test]
    fn build_result_state() {
        let result = BuildResult {
            plan_name: "release-2.3".into(),
            vcs_revision_key: "abc123".into(),
            build_state: "Successful".into(),
        };
        assert!(result.is_successful());
        assert!(!BuildResult::default().is_successful());
    }
}
