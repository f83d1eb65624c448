use crate::api::RedditPostData;
use chrono::{DateTime, Utc};
use scraipe_core::{Link, RedditApiError};
use serde::Serialize;
use url::Url;

pub const REDDIT_WEB_BASE: &str = "https://www.reddit.com";

pub fn link_from_permalink(permalink: &str) -> Link {
    Link::new(format!("{}{}", REDDIT_WEB_BASE, permalink))
}

/// Extracts the submission id from a post link.
///
/// Accepts `reddit.com/r/<sub>/comments/<id>/...` on any reddit.com host and
/// `redd.it/<id>` short links.
pub fn post_id_from_link(link: &Link) -> Result<String, RedditApiError> {
    let invalid = || RedditApiError::InvalidLink {
        link: link.to_string(),
    };

    let url = Url::parse(link.as_str()).map_err(|_| invalid())?;
    let host = url.host_str().ok_or_else(invalid)?;
    let mut segments = url.path_segments().ok_or_else(invalid)?.filter(|s| !s.is_empty());

    let id = if host == "redd.it" {
        segments.next()
    } else if host == "reddit.com" || host.ends_with(".reddit.com") {
        segments.skip_while(|s| *s != "comments").nth(1)
    } else {
        None
    };

    match id {
        Some(id) if id.chars().all(|c| c.is_ascii_alphanumeric()) => Ok(id.to_ascii_lowercase()),
        _ => Err(invalid()),
    }
}

/// Scraped representation of a submission, serialized as the item content.
#[derive(Debug, Serialize)]
pub struct SubmissionContent<'a> {
    pub title: &'a str,
    pub author: &'a str,
    pub subreddit: &'a str,
    pub created: Option<String>,
    pub score: i64,
    pub num_comments: u64,
    pub url: &'a str,
    pub over_18: bool,
    pub selftext: &'a str,
}

impl<'a> From<&'a RedditPostData> for SubmissionContent<'a> {
    fn from(post: &'a RedditPostData) -> Self {
        Self {
            title: &post.title,
            author: &post.author,
            subreddit: &post.subreddit,
            created: DateTime::<Utc>::from_timestamp(post.created_utc as i64, 0)
                .map(|created| created.to_rfc3339()),
            score: post.score,
            num_comments: post.num_comments,
            url: &post.url,
            over_18: post.over_18,
            selftext: &post.selftext,
        }
    }
}

pub fn render_submission(post: &RedditPostData) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&SubmissionContent::from(post))
}
