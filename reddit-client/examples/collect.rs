//! Collects a handful of links from a subreddit and prints the first submission.
//!
//! Reads `REDDIT_CLIENT_ID` and `REDDIT_CLIENT_SECRET` from the environment:
//!
//! ```text
//! cargo run -p reddit-client --example collect -- bjj
//! ```

use reddit_client::{RedditClient, RedditOAuth2Config};
use scraipe_core::{
    CollectQuery, PostLimit, SortType, DEFAULT_SUBREDDIT, DEFAULT_USER_AGENT,
    REDDIT_CLIENT_ID_VAR, REDDIT_CLIENT_SECRET_VAR,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let client_id = std::env::var(REDDIT_CLIENT_ID_VAR)?;
    let client_secret = std::env::var(REDDIT_CLIENT_SECRET_VAR)?;
    let subreddit = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SUBREDDIT.to_string());

    let client = RedditClient::new(RedditOAuth2Config::new(
        client_id,
        client_secret,
        DEFAULT_USER_AGENT.to_string(),
    ))?;

    client.probe().await?;
    println!("Credentials accepted");

    let query = CollectQuery {
        subreddits: vec![subreddit.clone()],
        sort: SortType::Hot,
        limit: PostLimit::new(5)?,
        time_filter: None,
    };
    let links = client.collect_links(&query).await?;

    println!("{} links from r/{}:", links.len(), subreddit);
    for link in &links {
        println!("  {}", link);
    }

    if let Some(first) = links.first() {
        println!("\n{}", client.scrape_submission(first).await?);
    }

    Ok(())
}
