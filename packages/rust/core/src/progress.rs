//! Progress callbacks for long-running scans.

use crate::triage::TriageReport;

/// Progress callback for reporting scan status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each feed entry is looked at.
    fn build_started(&self, link: &str, current: usize, total: usize);
    /// Called when the scan completes.
    fn done(&self, report: &TriageReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn build_started(&self, _link: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &TriageReport) {}
}
