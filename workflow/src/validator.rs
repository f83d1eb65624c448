use crate::stages::Backend;
use scraipe_core::{ErrorExt, OpenAiCredentials, RedditCredentials};
use std::sync::Arc;
use tracing::{info, warn};

/// Probes credentials against the live services. Never fails: any error is
/// logged and reported as `false`.
#[derive(Clone)]
pub struct CredentialValidator {
    backend: Arc<dyn Backend>,
}

impl CredentialValidator {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn validate_social(&self, credentials: &RedditCredentials) -> bool {
        if !credentials.is_complete() {
            warn!("Reddit credentials incomplete, skipping probe");
            return false;
        }

        match self.backend.probe_reddit(credentials).await {
            Ok(()) => {
                info!("Reddit credentials accepted");
                true
            }
            Err(e) => {
                e.log_error();
                false
            }
        }
    }

    pub async fn validate_llm(&self, credentials: &OpenAiCredentials) -> bool {
        if !credentials.is_complete() {
            warn!("OpenAI key missing, skipping probe");
            return false;
        }

        match self.backend.probe_openai(credentials).await {
            Ok(()) => {
                info!("OpenAI key accepted");
                true
            }
            Err(e) => {
                e.log_error();
                false
            }
        }
    }
}
