//! Log classification engine.
//!
//! Given the raw log of a failed build, find the first known failure
//! signature it contains and cut a bounded excerpt around it:
//! - [`extract`] locates text between two literal markers
//! - [`truncate`] bounds that text in width and height
//! - [`RuleTable`] holds the ordered signatures
//! - [`Classifier`] ties them together
//!
//! Everything here is pure and total: no I/O, no errors, no shared mutable
//! state. A [`Classifier`] can be shared across threads as-is.

pub mod extract;
pub mod rules;
pub mod truncate;

use std::collections::HashMap;

use serde::Serialize;
use tracing::trace;

pub use extract::{ExtractPolicy, extract};
pub use rules::{Rule, RuleTable};
pub use truncate::{ELLIPSIS, TruncateBounds, truncate};

/// A recognised failure cause for one log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Diagnosis from the matching rule. Never empty.
    pub cause: String,
    /// Bounded log excerpt, both markers included. Never empty.
    pub excerpt: String,
    /// Issue tracker key when this cause is already filed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub known_issue: Option<String>,
}

impl Classification {
    /// Comment text posted on the build.
    pub fn annotation(&self) -> String {
        let mut text = String::with_capacity(self.cause.len() + self.excerpt.len() + 64);
        text.push_str(&self.cause);
        text.push_str("\n\n");
        if let Some(issue) = self.known_issue.as_deref().filter(|id| !id.is_empty()) {
            text.push_str("This is a known issue: ");
            text.push_str(issue);
            text.push_str("\n\n");
        }
        text.push_str("Log snippet:\n");
        text.push_str(&self.excerpt);
        text
    }
}

/// Matches logs against a [`RuleTable`].
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    table: RuleTable,
    bounds: TruncateBounds,
    known_issues: HashMap<String, String>,
}

impl Classifier {
    pub fn new(table: RuleTable, bounds: TruncateBounds) -> Self {
        Self {
            table,
            bounds,
            known_issues: HashMap::new(),
        }
    }

    /// Attach an issue tracker key to every classification with `cause`.
    /// An empty key is ignored.
    pub fn with_known_issue(mut self, cause: impl Into<String>, issue: impl Into<String>) -> Self {
        let issue = issue.into();
        if !issue.is_empty() {
            self.known_issues.insert(cause.into(), issue);
        }
        self
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    pub fn bounds(&self) -> TruncateBounds {
        self.bounds
    }

    /// Classify one log body. `None` means no rule applied.
    pub fn classify(&self, body: &str) -> Option<Classification> {
        let (rule, raw) = self.table.first_match(body)?;
        let excerpt = truncate(raw, self.bounds);
        trace!(
            cause = %rule.cause,
            policy = %rule.policy,
            raw_len = raw.len(),
            excerpt_len = excerpt.len(),
            "log matched rule"
        );

        Some(Classification {
            cause: rule.cause.clone(),
            excerpt,
            known_issue: self.known_issues.get(&rule.cause).cloned(),
        })
    }
}
