pub mod api;
pub mod links;
pub mod rate_limiter;
pub mod retry;


use api::RedditApiClient;
use links::{link_from_permalink, post_id_from_link, render_submission};
use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, TokenResponse, TokenUrl};
use retry::{RetryConfig, RetryExecutor};
use scraipe_core::{CollectQuery, CoreError, Link, RedditApiError, RedditCredentials};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
pub const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Tokens are refreshed this long before Reddit would reject them.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RedditOAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl RedditOAuth2Config {
    pub fn new(client_id: String, client_secret: String, user_agent: String) -> Self {
        Self {
            client_id,
            client_secret,
            user_agent,
        }
    }

    pub fn from_credentials(credentials: &RedditCredentials, user_agent: &str) -> Self {
        Self::new(
            credentials.client_id.clone(),
            credentials.client_secret.clone(),
            user_agent.to_string(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() + TOKEN_EXPIRY_MARGIN >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub enum AuthState {
    NotAuthenticated,
    Authenticated { token: RedditToken },
    TokenExpired { token: RedditToken },
}

/// Application-only Reddit client: authenticates with the client credentials
/// grant and reads public listings and submissions.
#[derive(Debug)]
pub struct RedditClient {
    config: RedditOAuth2Config,
    oauth_client: BasicClient,
    token_http: reqwest::Client,
    api: RedditApiClient,
    retry: RetryExecutor,
    auth_state: RwLock<AuthState>,
}

impl RedditClient {
    pub fn new(config: RedditOAuth2Config) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(REDDIT_AUTH_URL.to_string()).map_err(invalid_oauth_url)?;
        let token_url = TokenUrl::new(REDDIT_TOKEN_URL.to_string()).map_err(invalid_oauth_url)?;

        let oauth_client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            auth_url,
            Some(token_url),
        );

        // Token requests must not follow redirects
        let token_http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(30))
            .build()?;

        let api = RedditApiClient::new(config.user_agent.clone())?;

        Ok(Self {
            config,
            oauth_client,
            token_http,
            api,
            retry: RetryExecutor::new(RetryConfig::reddit()),
            auth_state: RwLock::new(AuthState::NotAuthenticated),
        })
    }

    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    pub async fn get_auth_state(&self) -> AuthState {
        self.auth_state.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        matches!(
            &*self.auth_state.read().await,
            AuthState::Authenticated { token } if !token.is_expired()
        )
    }

    pub async fn set_token(&self, token: RedditToken) {
        let mut state = self.auth_state.write().await;
        *state = if token.is_expired() {
            AuthState::TokenExpired { token }
        } else {
            AuthState::Authenticated { token }
        };
    }

    /// Requests a fresh application-only token.
    pub async fn authenticate(&self) -> Result<RedditToken, CoreError> {
        info!("Requesting Reddit application token");
        let http = self.token_http.clone();
        let response = self
            .oauth_client
            .exchange_client_credentials()
            .request_async(|request| send_token_request(http, request))
            .await
            .map_err(|e| {
                CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                    reason: e.to_string(),
                })
            })?;

        let expires_in = response
            .expires_in()
            .unwrap_or_else(|| Duration::from_secs(3600));
        let token = RedditToken {
            access_token: response.access_token().secret().clone(),
            expires_at: SystemTime::now() + expires_in,
        };

        debug!("Reddit token valid for {:?}", expires_in);
        self.set_token(token.clone()).await;
        Ok(token)
    }

    async fn access_token(&self) -> Result<String, CoreError> {
        {
            let state = self.auth_state.read().await;
            if let AuthState::Authenticated { token } = &*state {
                if !token.is_expired() {
                    return Ok(token.access_token.clone());
                }
            }
        }
        Ok(self.authenticate().await?.access_token)
    }

    async fn invalidate_token(&self) {
        let mut state = self.auth_state.write().await;
        if let AuthState::Authenticated { token } = &*state {
            let token = token.clone();
            *state = AuthState::TokenExpired { token };
        }
    }

    /// Checks that the credentials can authenticate and read one listing.
    /// Never retries.
    pub async fn probe(&self) -> Result<(), CoreError> {
        let token = self.authenticate().await?;
        let listing = self.api.get_popular_subreddits(&token.access_token, 1).await?;
        debug!(
            "Reddit probe listed {} subreddit(s)",
            listing.data.children.len()
        );
        Ok(())
    }

    /// Collects post links for every subreddit in query order, each in listing order.
    pub async fn collect_links(&self, query: &CollectQuery) -> Result<Vec<Link>, CoreError> {
        let mut links = Vec::new();

        for subreddit in &query.subreddits {
            let listing = self
                .with_token(&format!("collect r/{}", subreddit), move |token| async move {
                    self.api
                        .get_subreddit_posts(
                            &token,
                            subreddit,
                            query.sort,
                            query.limit.get(),
                            query.time_filter,
                        )
                        .await
                })
                .await?;

            links.extend(
                listing
                    .into_items()
                    .iter()
                    .map(|post| link_from_permalink(&post.permalink)),
            );
        }

        info!(
            "Collected {} links from {} subreddit(s)",
            links.len(),
            query.subreddits.len()
        );
        Ok(links)
    }

    /// Fetches one submission and renders it as the scraped content.
    pub async fn scrape_submission(&self, link: &Link) -> Result<String, CoreError> {
        let post_id = post_id_from_link(link)?;
        let post_id = post_id.as_str();
        let post = self
            .with_token(&format!("scrape {}", post_id), move |token| async move {
                self.api.get_post(&token, post_id).await
            })
            .await?;

        Ok(render_submission(&post)?)
    }

    /// Runs `operation` with a valid token under the retry policy. A rejected
    /// token is dropped and the operation retried once with a new one.
    async fn with_token<F, Fut, T>(
        &self,
        operation_name: &str,
        operation: F,
    ) -> Result<T, CoreError>
    where
        F: Fn(String) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let operation = &operation;
        let attempt = move || async move {
            let token = self.access_token().await?;
            operation(token).await
        };

        match self.retry.execute(operation_name, attempt).await {
            Err(CoreError::RedditApi(RedditApiError::InvalidToken)) => {
                warn!(
                    "Reddit rejected the access token during {}, re-authenticating",
                    operation_name
                );
                self.invalidate_token().await;
                self.retry.execute(operation_name, attempt).await
            }
            result => result,
        }
    }
}

fn invalid_oauth_url(e: url::ParseError) -> CoreError {
    CoreError::Internal {
        message: format!("invalid OAuth endpoint: {}", e),
    }
}

/// Sends an OAuth2 token request with the client's user agent; Reddit
/// throttles requests that do not identify themselves.
async fn send_token_request(
    http: reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let response = http
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}
