//! Shared types, error model, and configuration for Bambot.
//!
//! This crate is the foundation depended on by the Bamboo client, the
//! triage loop and the CLI. It provides:
//! - [`BambotError`], the unified error type
//! - Domain types ([`BuildKey`], [`FeedItem`], [`BuildResult`])
//! - Configuration ([`AppConfig`], config loading, credential resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BambooConfig, CommitsConfig, Credentials, KnownIssueEntry, RuleEntry, ScanConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, resolve_base_url,
    resolve_credentials,
};
pub use error::{BambotError, Result};
pub use types::{
    BuildKey, BuildResult, CATEGORY_BUILD_FAILED, CATEGORY_BUILD_SUCCESSFUL, FeedItem,
};
