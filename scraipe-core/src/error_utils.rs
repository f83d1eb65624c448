use crate::error::*;
use std::time::Duration;
use tracing::error;

/// Shared handling for the crate's error types: logging, retry policy and
/// the text shown in the GUI.
pub trait ErrorExt {
    /// Logs the error and hands it back for further use.
    fn log_error(&self) -> &Self;

    /// Transient failures worth another attempt.
    fn is_retryable(&self) -> bool;

    /// Delay the remote service asked for before the next attempt. `None`
    /// leaves the choice to the caller's backoff.
    fn retry_after(&self) -> Option<Duration>;

    /// Short message for result rows and run errors.
    fn user_friendly_message(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::RedditApi(e) => {
                error!("Reddit API error details: {:?}", e);
            }
            CoreError::Llm(e) => {
                error!("LLM error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::RedditApi(e) => e.is_retryable(),
            CoreError::Llm(e) => e.is_retryable(),
            CoreError::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::RedditApi(e) => e.retry_after(),
            CoreError::Llm(e) => e.retry_after(),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::RedditApi(e) => e.user_friendly_message(),
            CoreError::Llm(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(e) if e.is_timeout() => {
                "The request timed out. Check your connection and run again.".to_string()
            }
            CoreError::Network(_) => {
                "Could not reach the service. Check your internet connection.".to_string()
            }
            CoreError::InvalidInput { message } => message.clone(),
            CoreError::NotFound { resource } => format!("Nothing found at {}.", resource),
            CoreError::Io(_) | CoreError::Serialization(_) | CoreError::Internal { .. } => {
                format!("Unexpected error: {}", self)
            }
        }
    }
}

impl ErrorExt for RedditApiError {
    fn log_error(&self) -> &Self {
        error!("RedditApiError: {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            RedditApiError::RateLimitExceeded { .. } | RedditApiError::RequestTimeout => true,
            RedditApiError::ServerError { status_code } => *status_code >= 500,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            RedditApiError::RateLimitExceeded { retry_after } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            RedditApiError::AuthenticationFailed { .. } | RedditApiError::InvalidToken => {
                "Reddit rejected the credentials. Check the client ID and secret.".to_string()
            }
            RedditApiError::RateLimitExceeded { retry_after } => format!(
                "Reddit is rate limiting requests. Wait {} seconds and run again.",
                retry_after
            ),
            RedditApiError::Forbidden { resource } => {
                format!("Reddit denied access to {}.", resource)
            }
            RedditApiError::SubredditNotFound { subreddit } => {
                format!("Subreddit r/{} does not exist or is private.", subreddit)
            }
            RedditApiError::PostNotFound { .. } => {
                "The requested post could not be found.".to_string()
            }
            RedditApiError::InvalidLink { link } => {
                format!("'{}' does not point to a Reddit post.", link)
            }
            RedditApiError::RequestTimeout => "Reddit did not answer in time.".to_string(),
            RedditApiError::InvalidResponse { .. } => {
                "Reddit returned a response that could not be read.".to_string()
            }
            RedditApiError::ServerError { status_code } => {
                format!("Reddit is having trouble (status {}).", status_code)
            }
        }
    }
}

impl ErrorExt for LlmError {
    fn log_error(&self) -> &Self {
        error!("LlmError: {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimitExceeded { .. }
                | LlmError::ServiceUnavailable { .. }
                | LlmError::RequestTimeout { .. }
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimitExceeded { retry_after, .. } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            LlmError::InvalidApiKey { .. } => {
                "OpenAI rejected the API key. Save a valid key and run again.".to_string()
            }
            LlmError::RateLimitExceeded { retry_after, .. } => format!(
                "OpenAI is rate limiting requests. Wait {} seconds and run again.",
                retry_after
            ),
            LlmError::ModelNotAvailable { model } => {
                format!("The model '{}' is not available for this key.", model)
            }
            LlmError::ContentFiltered { .. } => {
                "OpenAI filtered this post's content.".to_string()
            }
            LlmError::ServiceUnavailable { .. } => {
                "OpenAI is temporarily unavailable.".to_string()
            }
            LlmError::RequestTimeout { .. } => "OpenAI did not answer in time.".to_string(),
            LlmError::InsufficientCredits { .. } => {
                "The OpenAI account has run out of credits.".to_string()
            }
            LlmError::InvalidResponseFormat { .. } => {
                "OpenAI did not return valid JSON. Check that the instruction includes a JSON schema."
                    .to_string()
            }
            LlmError::RequestFailed { status_code, .. } => {
                format!("OpenAI request failed with status {}.", status_code)
            }
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Settings file '{}' was not found.", path)
            }
            ConfigError::InvalidValue { field, value } => {
                format!("Setting '{}' has an invalid value '{}'.", field, value)
            }
            ConfigError::Parse(e) => format!("Settings file could not be parsed: {}", e),
        }
    }
}
