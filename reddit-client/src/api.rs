use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use reqwest::{Client, Method, Response, StatusCode};
use scraipe_core::{CoreError, RedditApiError, SortType, TimeFilter};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

impl<T> RedditListing<T> {
    pub fn into_items(self) -> Vec<T> {
        self.data.children.into_iter().map(|child| child.data).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub author: String,
    pub subreddit: String,
    pub permalink: String,
    #[serde(default)]
    pub url: String,
    pub created_utc: f64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: u64,
    #[serde(default)]
    pub over_18: bool,
    #[serde(default)]
    pub is_self: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditSubredditData {
    pub display_name: String,
    #[serde(default)]
    pub subscribers: Option<u64>,
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    rate_limiter: Arc<RateLimiter>,
    user_agent: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig::reddit_oauth()));

        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            rate_limiter,
            user_agent,
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", REDDIT_API_BASE, endpoint);
        let start_time = Instant::now();

        let permit = self.rate_limiter.acquire_permit().await;
        debug!(
            "Acquired rate limit permit for {} {} after {:?}",
            method, endpoint, permit.queue_wait_time
        );

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token);

        if !query_params.is_empty() {
            request_builder = request_builder.query(query_params);
        }

        info!("Making Reddit API request: {} {}", method, endpoint);
        let response = request_builder.send().await.map_err(|e| {
            error!("Network error for {} {}: {}", method, endpoint, e);
            if e.is_timeout() {
                CoreError::RedditApi(RedditApiError::RequestTimeout)
            } else {
                CoreError::Network(e)
            }
        })?;

        let status = response.status();
        debug!(
            "Reddit responded {} for {} in {:?}",
            status,
            endpoint,
            start_time.elapsed()
        );

        if status.is_success() {
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, endpoint);
        Err(status_error(status, &response, endpoint))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        access_token: &str,
        query_params: &[(&str, &str)],
    ) -> Result<T, CoreError> {
        let response = self
            .make_request(Method::GET, endpoint, access_token, query_params)
            .await?;

        response.json::<T>().await.map_err(|e| {
            error!("Failed to parse response from {}: {}", endpoint, e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse response from {}", endpoint),
            })
        })
    }

    pub async fn get_subreddit_posts(
        &self,
        access_token: &str,
        subreddit: &str,
        sort: SortType,
        limit: u32,
        time_filter: Option<TimeFilter>,
    ) -> Result<RedditListing<RedditPostData>, CoreError> {
        let endpoint = subreddit_listing_endpoint(subreddit, sort);
        let limit_str = limit.to_string();
        let mut params = vec![("limit", limit_str.as_str()), ("raw_json", "1")];
        if let Some(filter) = time_filter {
            params.push(("t", filter.as_str()));
        }

        let listing: RedditListing<RedditPostData> = self
            .get_json(&endpoint, access_token, &params)
            .await
            .map_err(|e| match e {
                CoreError::NotFound { .. } => {
                    CoreError::RedditApi(RedditApiError::SubredditNotFound {
                        subreddit: subreddit.to_string(),
                    })
                }
                other => other,
            })?;

        info!(
            "Retrieved {} posts from r/{}",
            listing.data.children.len(),
            subreddit
        );
        Ok(listing)
    }

    /// Looks up a single submission by its base-36 id.
    pub async fn get_post(
        &self,
        access_token: &str,
        post_id: &str,
    ) -> Result<RedditPostData, CoreError> {
        let fullname = format!("t3_{}", post_id);
        let listing: RedditListing<RedditPostData> = self
            .get_json("/api/info", access_token, &[("id", fullname.as_str()), ("raw_json", "1")])
            .await?;

        let post = listing.into_items().into_iter().next().ok_or_else(|| {
            CoreError::RedditApi(RedditApiError::PostNotFound {
                post_id: post_id.to_string(),
            })
        })?;

        debug!("Retrieved post {} from r/{}", post.id, post.subreddit);
        Ok(post)
    }

    pub async fn get_popular_subreddits(
        &self,
        access_token: &str,
        limit: u32,
    ) -> Result<RedditListing<RedditSubredditData>, CoreError> {
        let limit_str = limit.to_string();
        self.get_json(
            "/subreddits/popular",
            access_token,
            &[("limit", limit_str.as_str())],
        )
        .await
    }
}

pub fn subreddit_listing_endpoint(subreddit: &str, sort: SortType) -> String {
    format!("/r/{}/{}", subreddit, sort.as_str())
}

fn status_error(status: StatusCode, response: &Response, endpoint: &str) -> CoreError {
    match status.as_u16() {
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .unwrap_or(60);
            warn!("Rate limited, retry after {} seconds", retry_after);
            CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after })
        }
        401 => CoreError::RedditApi(RedditApiError::InvalidToken),
        403 => CoreError::RedditApi(RedditApiError::Forbidden {
            resource: endpoint.to_string(),
        }),
        404 => CoreError::NotFound {
            resource: endpoint.to_string(),
        },
        code if status.is_server_error() => {
            CoreError::RedditApi(RedditApiError::ServerError { status_code: code })
        }
        code => CoreError::RedditApi(RedditApiError::InvalidResponse {
            details: format!("Unexpected status {} from {}", code, endpoint),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_endpoint_uses_sort() {
        assert_eq!(subreddit_listing_endpoint("bjj", SortType::Hot), "/r/bjj/hot");
        assert_eq!(
            subreddit_listing_endpoint("bjj", SortType::Controversial),
            "/r/bjj/controversial"
        );
    }

    #[tokio::test]
    async fn test_api_client_creation() {
        let client = RedditApiClient::new("test-user-agent/1.0".to_string()).unwrap();
        assert_eq!(client.user_agent(), "test-user-agent/1.0");
        assert!(client.rate_limiter().available_tokens().await > 0);
    }

    #[test]
    fn test_listing_deserialization_with_sparse_fields() {
        let body = r#"{
            "kind": "Listing",
            "data": {
                "after": "t3_def",
                "children": [
                    {"kind": "t3", "data": {
                        "id": "abc",
                        "title": "Armbar from guard",
                        "subreddit": "bjj",
                        "permalink": "/r/bjj/comments/abc/armbar_from_guard/",
                        "created_utc": 1640995200.0,
                        "selftext": "How do I finish it?",
                        "is_self": true,
                        "score": 12
                    }}
                ]
            }
        }"#;

        let listing: RedditListing<RedditPostData> = serde_json::from_str(body).unwrap();
        assert_eq!(listing.data.after.as_deref(), Some("t3_def"));
        let posts = listing.into_items();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].permalink, "/r/bjj/comments/abc/armbar_from_guard/");
        assert_eq!(posts[0].author, "");
        assert_eq!(posts[0].num_comments, 0);
    }
}
