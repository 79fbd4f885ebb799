//! The seam between the triage loop and a CI server.

use std::future::Future;

use bambot_bamboo::BambooClient;
use bambot_shared::{BuildKey, BuildResult, FeedItem, Result};

/// Everything the triage loop asks of a CI server.
///
/// [`BambooClient`] is the production implementation; tests use an
/// in-memory fake.
pub trait BuildServer: Send + Sync {
    /// Recent activity, newest first.
    fn fetch_feed(&self, max_results: u32) -> impl Future<Output = Result<Vec<FeedItem>>> + Send;

    fn labels(&self, key: &BuildKey) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// `Ok(None)` when the server has no log for the build.
    fn build_log(&self, key: &BuildKey) -> impl Future<Output = Result<Option<String>>> + Send;

    fn build_result(&self, key: &BuildKey) -> impl Future<Output = Result<BuildResult>> + Send;

    fn add_comment(&self, key: &BuildKey, content: &str) -> impl Future<Output = Result<()>> + Send;

    fn add_label(&self, key: &BuildKey, label: &str) -> impl Future<Output = Result<()>> + Send;
}

impl BuildServer for BambooClient {
    async fn fetch_feed(&self, max_results: u32) -> Result<Vec<FeedItem>> {
        BambooClient::fetch_feed(self, max_results).await
    }

    async fn labels(&self, key: &BuildKey) -> Result<Vec<String>> {
        BambooClient::labels(self, key).await
    }

    async fn build_log(&self, key: &BuildKey) -> Result<Option<String>> {
        BambooClient::build_log(self, key).await
    }

    async fn build_result(&self, key: &BuildKey) -> Result<BuildResult> {
        BambooClient::build_result(self, key).await
    }

    async fn add_comment(&self, key: &BuildKey, content: &str) -> Result<()> {
        BambooClient::add_comment(self, key, content).await
    }

    async fn add_label(&self, key: &BuildKey, label: &str) -> Result<()> {
        BambooClient::add_label(self, key, label).await
    }
}
