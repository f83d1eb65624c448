use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subreddit used when the user leaves the subreddit field blank.
pub const DEFAULT_SUBREDDIT: &str = "bjj";

#[derive(Clone, Default, PartialEq, Eq)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl RedditCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }

    /// Blank fields fall back to the matching field of `defaults`.
    pub fn or_defaults(self, defaults: &RedditCredentials) -> Self {
        Self {
            client_id: non_blank_or(self.client_id, &defaults.client_id),
            client_secret: non_blank_or(self.client_secret, &defaults.client_secret),
        }
    }
}

impl fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &mask(&self.client_id))
            .field("client_secret", &mask(&self.client_secret))
            .finish()
    }
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct OpenAiCredentials {
    pub api_key: String,
}

impl OpenAiCredentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn or_defaults(self, defaults: &OpenAiCredentials) -> Self {
        Self {
            api_key: non_blank_or(self.api_key, &defaults.api_key),
        }
    }
}

impl fmt::Debug for OpenAiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCredentials")
            .field("api_key", &mask(&self.api_key))
            .finish()
    }
}

fn non_blank_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.trim().to_string()
    }
}

fn mask(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

/// Credentials together with the outcome of their last probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checked<C> {
    pub credentials: C,
    pub valid: bool,
}

impl<C> Checked<C> {
    pub fn new(credentials: C, valid: bool) -> Self {
        Self { credentials, valid }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortType {
    #[default]
    Hot,
    New,
    Top,
    Controversial,
    Rising,
}

impl SortType {
    pub const ALL: [SortType; 5] = [
        SortType::Hot,
        SortType::New,
        SortType::Top,
        SortType::Controversial,
        SortType::Rising,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortType::Hot => "hot",
            SortType::New => "new",
            SortType::Top => "top",
            SortType::Controversial => "controversial",
            SortType::Rising => "rising",
        }
    }
}

impl fmt::Display for SortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortType::ALL
            .into_iter()
            .find(|sort| sort.as_str() == s.trim())
            .ok_or_else(|| CoreError::InvalidInput {
                message: format!("unknown sort type '{}'", s),
            })
    }
}

/// Time window for the `top` listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFilter {
    #[default]
    All,
    Day,
    Hour,
    Month,
    Week,
}

impl TimeFilter {
    pub const ALL: [TimeFilter; 5] = [
        TimeFilter::All,
        TimeFilter::Day,
        TimeFilter::Hour,
        TimeFilter::Month,
        TimeFilter::Week,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFilter::All => "all",
            TimeFilter::Day => "day",
            TimeFilter::Hour => "hour",
            TimeFilter::Month => "month",
            TimeFilter::Week => "week",
        }
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of posts fetched per subreddit, always within `MIN..=MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PostLimit(u32);

impl PostLimit {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 100;

    pub fn new(limit: u32) -> Result<Self, CoreError> {
        if (Self::MIN..=Self::MAX).contains(&limit) {
            Ok(Self(limit))
        } else {
            Err(CoreError::InvalidInput {
                message: format!(
                    "post limit must be between {} and {}, got {}",
                    Self::MIN,
                    Self::MAX,
                    limit
                ),
            })
        }
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for PostLimit {
    fn default() -> Self {
        Self(10)
    }
}

impl TryFrom<u32> for PostLimit {
    type Error = CoreError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PostLimit> for u32 {
    fn from(limit: PostLimit) -> Self {
        limit.0
    }
}

/// Opaque reference to one scrapable post (its permalink URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Link(String);

impl Link {
    pub fn new(link: impl Into<String>) -> Self {
        Self(link.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Link {
    fn from(link: &str) -> Self {
        Self::new(link)
    }
}

/// Trims whitespace and strips one leading `r/`.
pub fn normalize_subreddit(name: &str) -> String {
    let trimmed = name.trim();
    trimmed.strip_prefix("r/").unwrap_or(trimmed).trim().to_string()
}

/// Splits comma-separated subreddit input, normalizing each entry and
/// dropping entries that end up empty.
pub fn parse_subreddits(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(normalize_subreddit)
        .filter(|name| !name.is_empty())
        .collect()
}

/// Raw run inputs as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunForm {
    pub subreddits: String,
    pub sort: SortType,
    pub post_limit: u32,
    pub time_filter: TimeFilter,
    pub instruction: String,
}

/// A fully resolved run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub subreddits: Vec<String>,
    pub sort: SortType,
    pub post_limit: PostLimit,
    /// Only set when `sort` is [`SortType::Top`].
    pub time_filter: Option<TimeFilter>,
    pub instruction: String,
}

impl RunRequest {
    pub fn collect_query(&self) -> CollectQuery {
        CollectQuery {
            subreddits: self.subreddits.clone(),
            sort: self.sort,
            limit: self.post_limit,
            time_filter: self.time_filter,
        }
    }
}

/// Arguments for the link collection stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectQuery {
    pub subreddits: Vec<String>,
    pub sort: SortType,
    pub limit: PostLimit,
    pub time_filter: Option<TimeFilter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    OpenAi,
    TextStats,
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyzerKind::OpenAi => f.write_str("openai"),
            AnalyzerKind::TextStats => f.write_str("text-stats"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScrapeStatus {
    Success { content: String },
    Failed { error: String },
}

impl ScrapeStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ScrapeStatus::Success { .. })
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            ScrapeStatus::Success { content } => Some(content),
            ScrapeStatus::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub link: Link,
    #[serde(flatten)]
    pub status: ScrapeStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisStatus {
    Success { output: serde_json::Value },
    Failed { error: String },
}

impl AnalysisStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisStatus::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub link: Link,
    pub analyzer: AnalyzerKind,
    #[serde(flatten)]
    pub status: AnalysisStatus,
}
