//! Last-good-commit tracking for release branches.
//!
//! Successful builds of tracked plans tell us which commit last passed on
//! each branch. The feed is newest first, so the first result seen for a
//! plan is the one kept.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use tracing::debug;

use bambot_shared::{BambotError, BuildResult, Result};

/// Branch a plan builds, from its display name.
///
/// `develop_plan_name` maps to `develop`, `release-X` to `release/X`.
/// Any other plan is not tracked.
pub fn branch_from_plan_name(plan_name: &str, develop_plan_name: &str) -> Option<String> {
    if plan_name == develop_plan_name {
        return Some("develop".to_string());
    }
    plan_name
        .strip_prefix("release-")
        .filter(|version| !version.is_empty())
        .map(|version| format!("release/{version}"))
}

/// Branch → commit map built up over one scan.
#[derive(Debug, Clone)]
pub struct LastGoodCommits {
    develop_plan_name: String,
    seen_plans: HashSet<String>,
    branches: BTreeMap<String, String>,
}

impl LastGoodCommits {
    pub fn new(develop_plan_name: impl Into<String>) -> Self {
        Self {
            develop_plan_name: develop_plan_name.into(),
            seen_plans: HashSet::new(),
            branches: BTreeMap::new(),
        }
    }

    /// Record a build result. Returns `true` if it became the branch's
    /// last good commit.
    pub fn record(&mut self, result: &BuildResult) -> bool {
        if !result.is_successful() || result.vcs_revision_key.is_empty() {
            return false;
        }
        if !self.seen_plans.insert(result.plan_name.clone()) {
            return false;
        }
        let Some(branch) = branch_from_plan_name(&result.plan_name, &self.develop_plan_name) else {
            debug!(plan = %result.plan_name, "plan does not build a tracked branch");
            return false;
        };
        debug!(%branch, commit = %result.vcs_revision_key, "last good commit");
        self.branches.insert(branch, result.vcs_revision_key.clone());
        true
    }

    pub fn branches(&self) -> &BTreeMap<String, String> {
        &self.branches
    }

    pub fn into_branches(self) -> BTreeMap<String, String> {
        self.branches
    }
}

/// `branch commit` lines, sorted by branch.
pub fn branch_map_text(branches: &BTreeMap<String, String>) -> String {
    branches
        .iter()
        .map(|(branch, commit)| format!("{branch} {commit}\n"))
        .collect()
}

/// Write the branch map to `path`, replacing any previous file.
pub fn write_branch_map(path: &Path, branches: &BTreeMap<String, String>) -> Result<()> {
    std::fs::write(path, branch_map_text(branches)).map_err(|e| BambotError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(plan: &str, commit: &str, state: &str) -> BuildResult {
        BuildResult {
            plan_name: plan.into(),
            vcs_revision_key: commit.into(),
            build_state: state.into(),
        }
    }

    #[test]
    fn plan_names_map_to_branches() {
        let develop = "Windows Official";
        assert_eq!(branch_from_plan_name("Windows Official", develop).as_deref(), Some("develop"));
        assert_eq!(
            branch_from_plan_name("release-2.3", develop).as_deref(),
            Some("release/2.3")
        );
        assert_eq!(branch_from_plan_name("release-", develop), None);
        assert_eq!(branch_from_plan_name("Linux Nightly", develop), None);
        assert_eq!(branch_from_plan_name("pre-release-2.3", develop), None);
    }

    #[test]
    fn first_result_per_plan_wins() {
        let mut commits = LastGoodCommits::new("Windows Official");
        assert!(commits.record(&result("Windows Official", "aaa", "Successful")));
        assert!(!commits.record(&result("Windows Official", "bbb", "Successful")));
        assert!(commits.record(&result("release-1.9", "ccc", "Successful")));

        assert_eq!(commits.branches().get("develop").map(String::as_str), Some("aaa"));
        assert_eq!(commits.branches().get("release/1.9").map(String::as_str), Some("ccc"));
    }

    #[test]
    fn unsuccessful_results_are_ignored() {
        let mut commits = LastGoodCommits::new("Windows Official");
        assert!(!commits.record(&result("Windows Official", "aaa", "Failed")));
        // A failed build does not claim the plan: the next passing one still counts.
        assert!(commits.record(&result("Windows Official", "bbb", "Successful")));
        assert!(!commits.record(&result("release-1.9", "", "Successful")));
        assert_eq!(commits.branches().len(), 1);
    }

    #[test]
    fn untracked_plans_still_claim_their_slot() {
        let mut commits = LastGoodCommits::new("Windows Official");
        assert!(!commits.record(&result("Linux Nightly", "aaa", "Successful")));
        assert!(commits.branches().is_empty());
    }

    #[test]
    fn text_is_sorted_lines() {
        let mut commits = LastGoodCommits::new("Windows Official");
        commits.record(&result("release-2.0", "r20", "Successful"));
        commits.record(&result("Windows Official", "dev", "Successful"));
        commits.record(&result("release-1.9", "r19", "Successful"));

        assert_eq!(
            branch_map_text(commits.branches()),
            "develop dev\nrelease/1.9 r19\nrelease/2.0 r20\n"
        );
        assert_eq!(branch_map_text(&BTreeMap::new()), "");
    }

    #[test]
    fn write_to_file() {
        let dir = std::env::temp_dir().join(format!("bambot-commits-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("branchNamesToLastGoodCommits.txt");

        let mut branches = BTreeMap::new();
        branches.insert("develop".to_string(), "abc123".to_string());
        write_branch_map(&path, &branches).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "develop abc123\n");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
