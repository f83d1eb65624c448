pub mod openai;

pub use openai::{
    truncate_chars, OpenAiProvider, DEFAULT_MAX_CONTENT_SIZE, OPENAI_API_BASE, OPENAI_PROVIDER,
};

use async_trait::async_trait;
use scraipe_core::CoreError;

/// A language model that turns scraped content into structured JSON.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Runs `instruction` over `content` and returns the model's JSON answer.
    async fn analyze(&self, content: &str, instruction: &str)
        -> Result<serde_json::Value, CoreError>;

    /// Makes the cheapest authenticated request the provider offers.
    async fn probe(&self) -> Result<(), CoreError>;
}
