//! The ordered table of known failure signatures.
//!
//! Position in the table is priority: the first rule whose markers are found
//! wins. Signatures naming a specific tool come before catch-alls such as a
//! bare Maven `BUILD FAILURE` banner or the generic `***** ERROR *****`.

use serde::Serialize;

use crate::extract::{ExtractPolicy, extract};

/// Trailer Bamboo prints after a failing task; many signatures end on it.
const TASK_FAILED: &str = "with result: Failed";

/// One failure signature: literal start/end markers plus the diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub start: String,
    pub end: String,
    /// Diagnosis shown to the build owner.
    pub cause: String,
    pub policy: ExtractPolicy,
}

impl Rule {
    pub fn new(
        start: impl Into<String>,
        end: impl Into<String>,
        cause: impl Into<String>,
        policy: ExtractPolicy,
    ) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            cause: cause.into(),
            policy,
        }
    }

    /// A rule anchored on the final occurrence of its marker pair.
    pub fn last_match(
        start: impl Into<String>,
        end: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self::new(start, end, cause, ExtractPolicy::LastMatch)
    }

    /// Untruncated excerpt of `body` for this rule, if both markers are present.
    pub fn find<'a>(&self, body: &'a str) -> Option<&'a str> {
        extract(body, &self.start, &self.end, self.policy)
    }
}

/// Built-in signatures as (start, end, cause), in priority order.
///
/// All of them use [`ExtractPolicy::LastMatch`]: build logs repeat generic
/// banners, and the last one is the one that failed the build.
const BUILTIN: &[(&str, &str, &str)] = &[
    (
        "[ERROR] COMPILATION ERROR",
        "[INFO] ------------------------------------------------------------------------",
        "Bambot detected a Java compilation error!",
    ),
    (
        "ERROR: Coverage for",
        TASK_FAILED,
        "Bambot detected a Javascript coverage error!",
    ),
    // C# logs spread error details over many lines; two signatures catch them.
    (
        "Errors and Failures:",
        "Error(s)",
        "Bambot detected a C# build error!",
    ),
    (
        "Build FAILED.",
        "Error(s)",
        "Bambot detected a C# build failure!",
    ),
    (
        "[WARNING] Rule violated for bundle",
        "Coverage checks have not been met. See log for details.",
        "Bambot detected Java code coverage was below the required threshold!",
    ),
    (
        "[INFO] BUILD FAILURE",
        TASK_FAILED,
        "Bambot detected a Maven (Java build system) error!",
    ),
    ("***** ERROR *****", TASK_FAILED, "Bambot detected an error!"),
    (
        "=================================== FAILURES ===================================",
        TASK_FAILED,
        "Bambot detected a Python pytest error!",
    ),
    (
        "Traceback (most recent call last):",
        TASK_FAILED,
        "Bambot detected a Python error!",
    ),
    (
        "Seeq Build Step: Building with Grunt",
        "Aborted due to warnings.",
        "Bambot detected a front-end Grunt build error!",
    ),
    (
        "Errors and Failures:",
        "Committing...",
        "Bambot detected a C# unit test/integration test failure!",
    ),
];

/// An ordered, immutable list of [`Rule`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    /// Table made of exactly `rules`, in the given order.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// The built-in signatures.
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN
                .iter()
                .map(|(start, end, cause)| Rule::last_match(*start, *end, *cause))
                .collect(),
        )
    }

    /// Site-specific `rules` ahead of the built-ins.
    pub fn with_builtin_after(rules: Vec<Rule>) -> Self {
        let mut all = rules;
        all.extend(Self::builtin().rules);
        Self::new(all)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule with an excerpt in `body`, with that excerpt.
    pub fn first_match<'a>(&self, body: &'a str) -> Option<(&Rule, &'a str)> {
        self.rules
            .iter()
            .find_map(|rule| rule.find(body).map(|excerpt| (rule, excerpt)))
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl<'a> IntoIterator for &'a RuleTable {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
