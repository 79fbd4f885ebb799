//! One scan of the activity feed: skip what needs no attention, classify
//! the rest, and annotate the builds whose failure cause is recognised.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use bambot_classifier::{
    Classification, Classifier, ExtractPolicy, Rule, RuleTable, TruncateBounds,
};
use bambot_shared::{AppConfig, BambotError, BuildKey, FeedItem, Result};

use crate::commits::LastGoodCommits;
use crate::progress::ProgressReporter;
use crate::server::BuildServer;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Knobs for one triage run.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    /// Feed entries to request.
    pub max_results: u32,
    /// Builds older than this are left alone.
    pub max_age_hours: u64,
    /// Label marking builds already annotated.
    pub scanned_label: String,
    /// Prefix of labels humans use when they triaged a build themselves.
    pub manual_label_prefix: String,
    /// Feed text meaning Bamboo already reported the failing tests.
    pub ci_diagnosed_marker: String,
    /// Successful builds of plans whose key contains this feed commit tracking.
    pub tracked_plan_prefix: String,
    /// Plan name that builds `develop`.
    pub develop_plan_name: String,
    /// Classify and report, but post nothing.
    pub dry_run: bool,
}

impl TriageConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            max_results: config.scan.max_results,
            max_age_hours: config.scan.max_age_hours,
            scanned_label: config.scan.scanned_label.clone(),
            manual_label_prefix: config.scan.manual_label_prefix.clone(),
            ci_diagnosed_marker: config.scan.ci_diagnosed_marker.clone(),
            tracked_plan_prefix: config.commits.tracked_plan_prefix.clone(),
            develop_plan_name: config.commits.develop_plan_name.clone(),
            dry_run: false,
        }
    }
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self::from_app(&AppConfig::default())
    }
}

/// Build the classifier described by the config: site rules ahead of the
/// built-in table, snippet bounds, and known issues.
pub fn build_classifier(config: &AppConfig) -> Result<Classifier> {
    let mut site_rules = Vec::with_capacity(config.rules.len());
    for (i, entry) in config.rules.iter().enumerate() {
        if entry.start.is_empty() || entry.end.is_empty() || entry.cause.is_empty() {
            return Err(BambotError::validation(format!(
                "rules[{i}]: start, end and cause must all be non-empty"
            )));
        }
        let policy: ExtractPolicy = entry
            .policy
            .parse()
            .map_err(|e| BambotError::validation(format!("rules[{i}]: {e}")))?;
        site_rules.push(Rule::new(&entry.start, &entry.end, &entry.cause, policy));
    }

    for (i, known) in config.known_issues.iter().enumerate() {
        if known.cause.is_empty() || known.issue.is_empty() {
            return Err(BambotError::validation(format!(
                "known_issues[{i}]: cause and issue must both be non-empty"
            )));
        }
    }

    let bounds = TruncateBounds::new(
        config.scan.snippet_max_width,
        Some(config.scan.snippet_max_lines),
    );
    let classifier = config.known_issues.iter().fold(
        Classifier::new(RuleTable::with_builtin_after(site_rules), bounds),
        |classifier, known| classifier.with_known_issue(&known.cause, &known.issue),
    );
    Ok(classifier)
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Why a build was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    Successful,
    TooOld,
    CiDiagnosed,
    AlreadyScanned,
    ManuallyLabeled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Successful => "successful build",
            Self::TooOld => "too old",
            Self::CiDiagnosed => "Bamboo found test failures",
            Self::AlreadyScanned => "already scanned",
            Self::ManuallyLabeled => "already manually labeled",
        };
        f.write_str(text)
    }
}

/// What happened to one feed entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum BuildOutcome {
    Skipped { reason: SkipReason },
    /// Annotation and label were posted.
    Commented { cause: String, known_issue: Option<String> },
    /// Dry run: the annotation that would have been posted.
    WouldComment { annotation: String },
    /// Log read, no rule matched.
    Unclassified,
    /// The server had no log for the build.
    LogUnavailable,
    Failed { error: String },
}

/// One feed entry and its outcome.
#[derive(Debug, Clone, Serialize)]
pub struct BuildRecord {
    pub link: String,
    pub age_hours: f64,
    #[serde(flatten)]
    pub outcome: BuildOutcome,
}

/// Summary of one scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TriageReport {
    pub scanned: usize,
    pub skipped: usize,
    /// Builds annotated (or, in a dry run, that would have been).
    pub commented: usize,
    /// Builds whose log matched no rule or could not be downloaded.
    pub unclassified: usize,
    pub errors: usize,
    /// Age of the oldest entry in hours, `None` for an empty feed.
    pub oldest_hours: Option<f64>,
    pub youngest_hours: Option<f64>,
    pub elapsed: Duration,
    pub builds: Vec<BuildRecord>,
    /// Branch → last good commit.
    pub last_good_commits: BTreeMap<String, String>,
}

impl TriageReport {
    fn record(&mut self, link: &str, age_hours: f64, outcome: BuildOutcome) {
        match &outcome {
            BuildOutcome::Skipped { .. } => self.skipped += 1,
            BuildOutcome::Commented { .. } | BuildOutcome::WouldComment { .. } => {
                self.commented += 1
            }
            BuildOutcome::Unclassified | BuildOutcome::LogUnavailable => self.unclassified += 1,
            BuildOutcome::Failed { .. } => self.errors += 1,
        }
        self.builds.push(BuildRecord {
            link: link.to_string(),
            age_hours,
            outcome,
        });
    }

    fn observe_age(&mut self, hours: f64) {
        self.oldest_hours = Some(self.oldest_hours.map_or(hours, |h| h.max(hours)));
        self.youngest_hours = Some(self.youngest_hours.map_or(hours, |h| h.min(hours)));
    }
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

/// Run one scan against `server`.
///
/// Failing to fetch the feed aborts the scan. Any other failure is confined
/// to the build it happened on: logged, counted in
/// [`errors`](TriageReport::errors), and the scan moves on.
#[instrument(skip_all, fields(max_results = config.max_results, dry_run = config.dry_run))]
pub async fn run_triage<S: BuildServer>(
    server: &S,
    classifier: &Classifier,
    config: &TriageConfig,
    progress: &dyn ProgressReporter,
) -> Result<TriageReport> {
    let start = Instant::now();
    let now = Utc::now();

    progress.phase("Fetching activity feed");
    let items = server.fetch_feed(config.max_results).await?;
    info!(entries = items.len(), "scanning feed");

    progress.phase("Triaging builds");
    let mut report = TriageReport::default();
    let mut commits = LastGoodCommits::new(&config.develop_plan_name);
    let total = items.len();

    for (i, item) in items.iter().enumerate() {
        progress.build_started(&item.link, i + 1, total);
        report.scanned += 1;

        let age_hours = item.hours_since_publish(now);
        report.observe_age(age_hours);

        let outcome = match BuildKey::from_link(&item.link) {
            Ok(key) => {
                let triage = triage_build(server, classifier, config, &mut commits, item, &key, now);
                match triage.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(build = %key, error = %e, "failed to triage build");
                        BuildOutcome::Failed { error: e.to_string() }
                    }
                }
            }
            Err(e) => {
                warn!(link = %item.link, error = %e, "feed entry has no usable build key");
                BuildOutcome::Failed { error: e.to_string() }
            }
        };

        debug!(link = %item.link, ?outcome, "build triaged");
        report.record(&item.link, age_hours, outcome);
    }

    report.last_good_commits = commits.into_branches();
    report.elapsed = start.elapsed();

    info!(
        scanned = report.scanned,
        skipped = report.skipped,
        commented = report.commented,
        unclassified = report.unclassified,
        errors = report.errors,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "scan complete"
    );

    progress.done(&report);
    Ok(report)
}

async fn triage_build<S: BuildServer>(
    server: &S,
    classifier: &Classifier,
    config: &TriageConfig,
    commits: &mut LastGoodCommits,
    item: &FeedItem,
    key: &BuildKey,
    now: DateTime<Utc>,
) -> Result<BuildOutcome> {
    if item.is_successful() {
        if key.plan_key.contains(&config.tracked_plan_prefix) {
            let result = server.build_result(key).await?;
            commits.record(&result);
        }
        return Ok(skipped(SkipReason::Successful));
    }

    if item.hours_since_publish(now) > config.max_age_hours as f64 {
        return Ok(skipped(SkipReason::TooOld));
    }

    if item.content.contains(&config.ci_diagnosed_marker) {
        return Ok(skipped(SkipReason::CiDiagnosed));
    }

    let labels = server.labels(key).await?;
    if labels.iter().any(|l| *l == config.scanned_label) {
        return Ok(skipped(SkipReason::AlreadyScanned));
    }
    if labels.iter().any(|l| l.starts_with(&config.manual_label_prefix)) {
        return Ok(skipped(SkipReason::ManuallyLabeled));
    }

    let Some(log) = server.build_log(key).await? else {
        return Ok(BuildOutcome::LogUnavailable);
    };

    let Some(classification) = classifier.classify(&log) else {
        info!(build = %key, "couldn't find cause of failure");
        return Ok(BuildOutcome::Unclassified);
    };

    if config.dry_run {
        info!(build = %key, cause = %classification.cause, "dry run, not posting");
        return Ok(BuildOutcome::WouldComment {
            annotation: classification.annotation(),
        });
    }

    post(server, config, key, &classification).await?;
    Ok(BuildOutcome::Commented {
        cause: classification.cause,
        known_issue: classification.known_issue,
    })
}

/// Comment first, then label: a build is only marked scanned once the
/// comment is actually on it.
async fn post<S: BuildServer>(
    server: &S,
    config: &TriageConfig,
    key: &BuildKey,
    classification: &Classification,
) -> Result<()> {
    info!(build = %key, cause = %classification.cause, "adding comment and label");
    server.add_comment(key, &classification.annotation()).await?;
    server.add_label(key, &config.scanned_label).await
}

fn skipped(reason: SkipReason) -> BuildOutcome {
    BuildOutcome::Skipped { reason }
}
