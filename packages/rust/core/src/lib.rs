//! Scan orchestration for Bambot.
//!
//! This crate ties the Bamboo client and the classifier together into one
//! triage pass over the activity feed ([`run_triage`]), and tracks the last
//! good commit of each release branch along the way.

pub mod commits;
pub mod progress;
pub mod server;
pub mod triage;

pub use commits::{LastGoodCommits, branch_from_plan_name, branch_map_text, write_branch_map};
pub use progress::{ProgressReporter, SilentProgress};
pub use server::BuildServer;
pub use triage::{
    BuildOutcome, BuildRecord, SkipReason, TriageConfig, TriageReport, build_classifier, run_triage,
};
