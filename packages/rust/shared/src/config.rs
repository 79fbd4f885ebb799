//! Application configuration for Bambot.
//!
//! User config lives at `~/.bambot/bambot.toml`.
//! CLI flags override config file values, which override defaults.
//! Credentials are never stored in the file, only the names of the
//! environment variables that hold them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BambotError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "bambot.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".bambot";

// ---------------------------------------------------------------------------
// Config structs (matching bambot.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bamboo server connection settings.
    #[serde(default)]
    pub bamboo: BambooConfig,

    /// Scan and skip policy.
    #[serde(default)]
    pub scan: ScanConfig,

    /// Last-good-commit tracking.
    #[serde(default)]
    pub commits: CommitsConfig,

    /// Failure causes that are already tracked in the issue tracker.
    #[serde(default)]
    pub known_issues: Vec<KnownIssueEntry>,

    /// Site-specific rules, tried before the built-in table.
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

/// `[bamboo]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BambooConfig {
    /// Base URL of the Bamboo server (overridden by `--url` / `BAMBOO_URL`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Name of the env var holding the username.
    #[serde(default = "default_username_env")]
    pub username_env: String,

    /// Name of the env var holding the password (never store it here).
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BambooConfig {
    fn default() -> Self {
        Self {
            url: None,
            username_env: default_username_env(),
            password_env: default_password_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_username_env() -> String {
    "BAMBOO_USERNAME".into()
}
fn default_password_env() -> String {
    "BAMBOO_PASSWORD".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[scan]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Number of feed entries requested per scan.
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Builds published longer ago than this are skipped.
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,

    /// Label added to every build Bambot has commented on.
    #[serde(default = "default_scanned_label")]
    pub scanned_label: String,

    /// Labels with this prefix mean a human already triaged the build.
    #[serde(default = "default_manual_label_prefix")]
    pub manual_label_prefix: String,

    /// Feed content containing this text means Bamboo already parsed the failure.
    #[serde(default = "default_ci_diagnosed_marker")]
    pub ci_diagnosed_marker: String,

    /// Maximum characters per line in a posted log snippet.
    #[serde(default = "default_snippet_max_width")]
    pub snippet_max_width: usize,

    /// Maximum lines in a posted log snippet.
    #[serde(default = "default_snippet_max_lines")]
    pub snippet_max_lines: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            max_age_hours: default_max_age_hours(),
            scanned_label: default_scanned_label(),
            manual_label_prefix: default_manual_label_prefix(),
            ci_diagnosed_marker: default_ci_diagnosed_marker(),
            snippet_max_width: default_snippet_max_width(),
            snippet_max_lines: default_snippet_max_lines(),
        }
    }
}

fn default_max_results() -> u32 {
    100
}
fn default_max_age_hours() -> u64 {
    24 * 7
}
fn default_scanned_label() -> String {
    "bambot-scanned".into()
}
fn default_manual_label_prefix() -> String {
    "crab-".into()
}
fn default_ci_diagnosed_marker() -> String {
    "tests failed".into()
}
fn default_snippet_max_width() -> usize {
    160
}
fn default_snippet_max_lines() -> usize {
    2000
}

/// `[commits]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitsConfig {
    /// Only plans whose key contains this are tracked.
    #[serde(default = "default_tracked_plan_prefix")]
    pub tracked_plan_prefix: String,

    /// Plan name that builds the `develop` branch.
    #[serde(default = "default_develop_plan_name")]
    pub develop_plan_name: String,

    /// File the branch → commit map is written to after a scan.
    #[serde(default = "default_commits_output_file")]
    pub output_file: String,
}

impl Default for CommitsConfig {
    fn default() -> Self {
        Self {
            tracked_plan_prefix: default_tracked_plan_prefix(),
            develop_plan_name: default_develop_plan_name(),
            output_file: default_commits_output_file(),
        }
    }
}

fn default_tracked_plan_prefix() -> String {
    "CRAB-CWO".into()
}
fn default_develop_plan_name() -> String {
    "Windows Official".into()
}
fn default_commits_output_file() -> String {
    "branchNamesToLastGoodCommits.txt".into()
}

/// `[[known_issues]]` entry: a cause label already filed as an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownIssueEntry {
    /// Cause label exactly as produced by a rule.
    pub cause: String,
    /// Issue tracker key, e.g. `CRAB-1234`.
    pub issue: String,
}

/// `[[rules]]` entry: a site-specific failure signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEntry {
    /// Literal start marker.
    pub start: String,
    /// Literal end marker.
    pub end: String,
    /// Diagnosis shown to the build owner.
    pub cause: String,
    /// Extraction direction: "last-match" (default) or "forward".
    #[serde(default = "default_rule_policy")]
    pub policy: String,
}

fn default_rule_policy() -> String {
    "last-match".into()
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Username/password pair resolved from the environment.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Read the Bamboo credentials from the env vars named in the config.
pub fn resolve_credentials(config: &AppConfig) -> Result<Credentials> {
    let username = read_env(&config.bamboo.username_env)?;
    let password = read_env(&config.bamboo.password_env)?;
    Ok(Credentials { username, password })
}

fn read_env(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(BambotError::config(format!(
            "missing {var_name} environment variable"
        ))),
    }
}

/// Resolve the Bamboo base URL: explicit override first, then the config file.
///
/// Trailing slashes are stripped so paths can be appended directly.
pub fn resolve_base_url(config: &AppConfig, override_url: Option<&str>) -> Result<url::Url> {
    let raw = override_url
        .or(config.bamboo.url.as_deref())
        .ok_or_else(|| {
            BambotError::config("no Bamboo URL configured. Pass --url or set BAMBOO_URL.")
        })?;

    url::Url::parse(raw.trim_end_matches('/'))
        .map_err(|e| BambotError::config(format!("invalid Bamboo URL '{raw}': {e}")))
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.bambot/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| BambotError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.bambot/bambot.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BambotError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| BambotError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BambotError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BambotError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BambotError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
