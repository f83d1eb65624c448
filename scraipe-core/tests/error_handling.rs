use scraipe_core::{ConfigError, CoreError, ErrorExt, LlmError, RedditApiError};
use std::time::Duration;

#[test]
fn test_retryable_errors() {
    let rate_limited = CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 60 });
    assert!(rate_limited.is_retryable());

    let server_error = CoreError::RedditApi(RedditApiError::ServerError { status_code: 503 });
    assert!(server_error.is_retryable());

    let auth_error = CoreError::RedditApi(RedditApiError::AuthenticationFailed {
        reason: "bad secret".to_string(),
    });
    assert!(!auth_error.is_retryable());

    let llm_unavailable = CoreError::Llm(LlmError::ServiceUnavailable {
        provider: "openai".to_string(),
    });
    assert!(llm_unavailable.is_retryable());

    let no_credits = CoreError::Llm(LlmError::InsufficientCredits {
        provider: "openai".to_string(),
    });
    assert!(!no_credits.is_retryable());
}

#[test]
fn test_retry_after_only_when_requested() {
    let reddit = CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 60 });
    assert_eq!(reddit.retry_after(), Some(Duration::from_secs(60)));

    let openai = CoreError::Llm(LlmError::RateLimitExceeded {
        provider: "openai".to_string(),
        retry_after: 20,
    });
    assert_eq!(openai.retry_after(), Some(Duration::from_secs(20)));

    // Retryable, but the backoff decides the delay
    let timeout = CoreError::RedditApi(RedditApiError::RequestTimeout);
    assert!(timeout.is_retryable());
    assert_eq!(timeout.retry_after(), None);
}

#[test]
fn test_user_friendly_messages() {
    let post = CoreError::RedditApi(RedditApiError::PostNotFound {
        post_id: "abc123".to_string(),
    });
    assert_eq!(
        post.user_friendly_message(),
        "The requested post could not be found."
    );

    let subreddit = CoreError::RedditApi(RedditApiError::SubredditNotFound {
        subreddit: "nosuchsub".to_string(),
    });
    assert!(subreddit.user_friendly_message().contains("r/nosuchsub"));

    let json_error = CoreError::Llm(LlmError::InvalidResponseFormat {
        provider: "openai".to_string(),
        details: "expected value".to_string(),
    });
    assert!(json_error.user_friendly_message().contains("JSON schema"));

    let config_error = CoreError::Config(ConfigError::InvalidValue {
        field: "concurrency".to_string(),
        value: "0".to_string(),
    });
    assert!(config_error.user_friendly_message().contains("concurrency"));

    let invalid = CoreError::InvalidInput {
        message: "Post limit must be between 1 and 100".to_string(),
    };
    assert_eq!(
        invalid.user_friendly_message(),
        "Post limit must be between 1 and 100"
    );
}

#[test]
fn test_log_error_returns_self() {
    let error = CoreError::RedditApi(RedditApiError::InvalidToken);
    assert!(!error.log_error().is_retryable());
}
