//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use bambot_bamboo::{BambooClient, ClientOptions};
use bambot_classifier::Classifier;
use bambot_core::{
    BuildOutcome, ProgressReporter, TriageConfig, TriageReport, branch_map_text,
    build_classifier, run_triage, write_branch_map,
};
use bambot_shared::{
    AppConfig, init_config, load_config, load_config_from, resolve_base_url, resolve_credentials,
};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Bambot: explains failed Bamboo builds to their owners.
#[derive(Parser)]
#[command(
    name = "bambot",
    version,
    about = "Scan failed Bamboo builds, classify their logs, and comment with the cause.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.bambot/bambot.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Scan recent builds and comment on recognised failures.
    Scan {
        /// Bamboo base URL (overrides the config file).
        #[arg(long, env = "BAMBOO_URL")]
        url: Option<String>,

        /// Classify and report without posting comments or labels.
        #[arg(long)]
        dry_run: bool,

        /// Number of feed entries to scan.
        #[arg(long)]
        max_results: Option<u32>,

        /// Where to write the branch → last good commit map.
        #[arg(long)]
        commits_file: Option<PathBuf>,

        /// Print the scan report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Classify a local build log.
    Classify {
        /// Path to the log file.
        log_file: PathBuf,

        /// Print the classification as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the active rules in priority order.
    Rules,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
///
/// Logs go to stderr so `--json` output on stdout stays parseable.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "bambot=info",
        1 => "bambot=debug",
        _ => "bambot=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    if let Command::Config {
        action: ConfigAction::Init,
    } = cli.command
    {
        return cmd_config_init().await;
    }

    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Scan {
            url,
            dry_run,
            max_results,
            commits_file,
            json,
        } => {
            let opts = ScanOptions {
                url,
                dry_run,
                max_results,
                commits_file,
                json,
            };
            cmd_scan(&config, opts).await
        }
        Command::Classify { log_file, json } => cmd_classify(&config, &log_file, json),
        Command::Rules => cmd_rules(&config),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

// ---------------------------------------------------------------------------
// scan
// ---------------------------------------------------------------------------

struct ScanOptions {
    url: Option<String>,
    dry_run: bool,
    max_results: Option<u32>,
    commits_file: Option<PathBuf>,
    json: bool,
}

async fn cmd_scan(config: &AppConfig, opts: ScanOptions) -> Result<()> {
    let base_url = resolve_base_url(config, opts.url.as_deref())?;
    let credentials = resolve_credentials(config)?;
    let classifier = build_classifier(config)?;

    let mut triage = TriageConfig::from_app(config);
    triage.dry_run = opts.dry_run;
    if let Some(max_results) = opts.max_results {
        triage.max_results = max_results;
    }

    info!(url = %base_url, dry_run = opts.dry_run, "starting scan");

    let client_opts = ClientOptions {
        timeout_secs: config.bamboo.timeout_secs,
    };
    let client = BambooClient::login(&base_url, credentials, &client_opts).await?;

    let reporter = CliProgress::new();
    let report = run_triage(&client, &classifier, &triage, &reporter).await?;

    let commits_path = opts
        .commits_file
        .unwrap_or_else(|| PathBuf::from(&config.commits.output_file));
    write_branch_map(&commits_path, &report.last_good_commits)?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, &commits_path, opts.dry_run);
    }
    Ok(())
}

fn print_report(report: &TriageReport, commits_path: &Path, dry_run: bool) {
    println!();
    for record in &report.builds {
        let line = match &record.outcome {
            BuildOutcome::Skipped { reason } => format!("skipped: {reason}"),
            BuildOutcome::Commented { cause, .. } => format!("commented: {cause}"),
            BuildOutcome::WouldComment { annotation } => {
                let cause = annotation.lines().next().unwrap_or_default();
                format!("would comment: {cause}")
            }
            BuildOutcome::Unclassified => "couldn't find cause of failure".to_string(),
            BuildOutcome::LogUnavailable => "build log unavailable".to_string(),
            BuildOutcome::Failed { error } => format!("error: {error}"),
        };
        println!("  {} : {line}", record.link);
    }

    println!();
    if dry_run {
        println!("  Dry run: nothing was posted.");
    }
    println!(
        "  Stats:   scanned = {}, skipped = {}, commented = {}, unclassified = {}, errors = {}",
        report.scanned, report.skipped, report.commented, report.unclassified, report.errors
    );
    if let (Some(oldest), Some(youngest)) = (report.oldest_hours, report.youngest_hours) {
        println!("  Ages:    oldest {oldest:.1}h, youngest {youngest:.1}h");
    }
    println!("  Time:    {:.1}s", report.elapsed.as_secs_f64());
    println!("  Commits: {}", commits_path.display());
    for line in branch_map_text(&report.last_good_commits).lines() {
        println!("           {line}");
    }
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn build_started(&self, link: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Triaging [{current}/{total}] {link}"));
    }

    fn done(&self, _report: &TriageReport) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// classify / rules
// ---------------------------------------------------------------------------

fn cmd_classify(config: &AppConfig, log_file: &Path, json: bool) -> Result<()> {
    let bytes = std::fs::read(log_file)
        .map_err(|e| eyre!("cannot read {}: {e}", log_file.display()))?;
    // Build logs are not guaranteed to be UTF-8.
    let body = String::from_utf8_lossy(&bytes);

    let classifier: Classifier = build_classifier(config)?;
    let result = classifier.classify(&body);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    match result {
        Some(classification) => println!("{}", classification.annotation()),
        None => println!("No known failure signature in {}", log_file.display()),
    }
    Ok(())
}

fn cmd_rules(config: &AppConfig) -> Result<()> {
    let classifier = build_classifier(config)?;
    for (i, rule) in classifier.table().into_iter().enumerate() {
        println!("{:>3}. {} [{}]", i + 1, rule.cause, rule.policy);
        println!("       start: {:?}", rule.start);
        println!("       end:   {:?}", rule.end);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}
