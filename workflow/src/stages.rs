//! Interfaces the run pipeline is built from.
//!
//! Each stage is an object-safe async trait so the orchestrator can run
//! against the live Reddit and OpenAI clients or against test doubles.

use async_trait::async_trait;
use scraipe_core::{
    AnalyzerKind, CollectQuery, CoreError, Link, OpenAiCredentials, RedditCredentials,
};
use std::sync::Arc;

#[async_trait]
pub trait LinkCollector: Send + Sync {
    /// Returns post links in subreddit order, then listing order.
    async fn collect_links(&self, query: &CollectQuery) -> Result<Vec<Link>, CoreError>;
}

#[async_trait]
pub trait Scraper: Send + Sync {
    async fn scrape(&self, link: &Link) -> Result<String, CoreError>;
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    fn kind(&self) -> AnalyzerKind;

    async fn analyze(&self, content: &str) -> Result<serde_json::Value, CoreError>;
}

/// Collector and scraper sharing one authenticated Reddit session.
#[derive(Clone)]
pub struct RedditStages {
    pub collector: Arc<dyn LinkCollector>,
    pub scraper: Arc<dyn Scraper>,
}

/// Builds stage implementations from credentials and probes credentials.
#[async_trait]
pub trait Backend: Send + Sync {
    fn reddit_stages(&self, credentials: &RedditCredentials) -> Result<RedditStages, CoreError>;

    fn llm_analyzer(
        &self,
        credentials: &OpenAiCredentials,
        instruction: &str,
    ) -> Result<Arc<dyn Analyzer>, CoreError>;

    async fn probe_reddit(&self, credentials: &RedditCredentials) -> Result<(), CoreError>;

    async fn probe_openai(&self, credentials: &OpenAiCredentials) -> Result<(), CoreError>;
}
