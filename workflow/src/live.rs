use crate::stages::{Analyzer, Backend, LinkCollector, RedditStages, Scraper};
use async_trait::async_trait;
use llm_interface::{LlmProvider, OpenAiProvider};
use reddit_client::{RedditClient, RedditOAuth2Config};
use scraipe_core::{
    AnalyzerKind, CollectQuery, CoreError, Link, OpenAiCredentials, RedditCredentials, Settings,
};
use std::sync::Arc;

#[async_trait]
impl LinkCollector for RedditClient {
    async fn collect_links(&self, query: &CollectQuery) -> Result<Vec<Link>, CoreError> {
        RedditClient::collect_links(self, query).await
    }
}

#[async_trait]
impl Scraper for RedditClient {
    async fn scrape(&self, link: &Link) -> Result<String, CoreError> {
        self.scrape_submission(link).await
    }
}

/// Language-model analyzer bound to one run's instruction.
#[derive(Debug)]
pub struct OpenAiAnalyzer {
    provider: OpenAiProvider,
    instruction: String,
}

impl OpenAiAnalyzer {
    pub fn new(provider: OpenAiProvider, instruction: impl Into<String>) -> Self {
        Self {
            provider,
            instruction: instruction.into(),
        }
    }
}

#[async_trait]
impl Analyzer for OpenAiAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::OpenAi
    }

    async fn analyze(&self, content: &str) -> Result<serde_json::Value, CoreError> {
        self.provider.analyze(content, &self.instruction).await
    }
}

/// Backend talking to Reddit and OpenAI.
#[derive(Debug, Clone)]
pub struct LiveBackend {
    settings: Settings,
}

impl LiveBackend {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    fn reddit_client(&self, credentials: &RedditCredentials) -> Result<RedditClient, CoreError> {
        RedditClient::new(RedditOAuth2Config::from_credentials(
            credentials,
            &self.settings.user_agent,
        ))
    }

    fn openai_provider(
        &self,
        credentials: &OpenAiCredentials,
    ) -> Result<OpenAiProvider, CoreError> {
        Ok(OpenAiProvider::new(credentials.api_key.clone())?
            .with_model(self.settings.openai_model.clone())
            .with_max_content_size(self.settings.max_content_size))
    }
}

#[async_trait]
impl Backend for LiveBackend {
    fn reddit_stages(&self, credentials: &RedditCredentials) -> Result<RedditStages, CoreError> {
        let client = Arc::new(self.reddit_client(credentials)?);
        Ok(RedditStages {
            collector: client.clone(),
            scraper: client,
        })
    }

    fn llm_analyzer(
        &self,
        credentials: &OpenAiCredentials,
        instruction: &str,
    ) -> Result<Arc<dyn Analyzer>, CoreError> {
        let provider = self.openai_provider(credentials)?;
        Ok(Arc::new(OpenAiAnalyzer::new(provider, instruction)))
    }

    async fn probe_reddit(&self, credentials: &RedditCredentials) -> Result<(), CoreError> {
        self.reddit_client(credentials)?.probe().await
    }

    async fn probe_openai(&self, credentials: &OpenAiCredentials) -> Result<(), CoreError> {
        self.openai_provider(credentials)?.probe().await
    }
}
