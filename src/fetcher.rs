use std::time::Duration;

use futures::future::join_all;
use reqwest::{Client, StatusCode};
use tracing::{info, warn};

use crate::article::Article;
use crate::config::{Config, FeedConfig};
use crate::parser::{parse_entries, FeedEntry, ParseError};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub struct Fetcher {
    client: Client,
    feeds: Vec<FeedConfig>,
}

impl Fetcher {
    pub fn new(
        feeds: Vec<FeedConfig>,
        timeout: Duration,
        user_agent: &str,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client, feeds })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(config.feeds.clone(), config.fetch_timeout(), &config.user_agent)
    }

    pub fn feeds(&self) -> &[FeedConfig] {
        &self.feeds
    }

    /// Fetches every configured feed, taking at most `limit` items from each.
    pub async fn fetch_all(&self, limit: usize) -> Vec<Article> {
        self.fetch_feeds(&self.feeds, limit).await
    }

    /// Feeds are requested concurrently but the result keeps the order of
    /// `feeds`. A feed that fails contributes nothing.
    pub async fn fetch_feeds(&self, feeds: &[FeedConfig], limit: usize) -> Vec<Article> {
        let per_feed =
            join_all(feeds.iter().map(|feed| self.fetch_feed_or_empty(feed, limit))).await;
        let articles: Vec<Article> = per_feed.into_iter().flatten().collect();

        info!("Fetched {} articles from {} feeds", articles.len(), feeds.len());
        articles
    }

    async fn fetch_feed_or_empty(&self, feed: &FeedConfig, limit: usize) -> Vec<Article> {
        match self.fetch_feed(feed, limit).await {
            Ok(articles) => {
                info!("Parsed {} entries from '{}'", articles.len(), feed.name);
                articles
            }
            Err(e) => {
                warn!("Failed to fetch feed '{}' ({}): {}", feed.name, feed.url, e);
                Vec::new()
            }
        }
    }

    pub async fn fetch_feed(
        &self,
        feed: &FeedConfig,
        limit: usize,
    ) -> Result<Vec<Article>, FetchError> {
        let response = self.client.get(&feed.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let bytes = response.bytes().await?;
        let entries = parse_entries(&bytes, limit)?;

        Ok(entries
            .into_iter()
            .map(|entry| Self::to_article(&feed.name, entry))
            .collect())
    }

    /// Tags an entry with the configured source name. Missing link and date
    /// become empty strings.
    pub fn to_article(source: &str, entry: FeedEntry) -> Article {
        Article {
            source: source.to_string(),
            title: entry.title.map(|t| t.trim().to_string()).unwrap_or_default(),
            link: entry.link.map(|l| l.trim().to_string()).unwrap_or_default(),
            published: entry.published.unwrap_or_default(),
        }
    }
}
