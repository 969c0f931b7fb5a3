use std::time::Duration;

use async_trait::async_trait;
use feed_rs::parser;
use reqwest::Client;

use crate::error::Result;

/// Boundary to the feed source: one idempotent, side-effect-free retrieval
/// of the feed's current entry addresses, in the feed's native order.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn list_current_entries(&self) -> Result<Vec<String>>;
}

pub struct RemoteFeed {
    client: Client,
    url: String,
}

impl RemoteFeed {
    pub fn new(url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("feedwatch/1.0")
            .build()
            .expect("Failed to create HTTP client");

        Self { client, url }
    }
}

#[async_trait]
impl FeedSource for RemoteFeed {
    async fn list_current_entries(&self) -> Result<Vec<String>> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch feed: HTTP {}", response.status()).into());
        }

        let bytes = response.bytes().await?;
        let feed = parser::parse(&bytes[..])?;

        let addresses: Vec<String> = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let link = entry.links.first().map(|l| l.href.clone());
                if link.is_none() {
                    tracing::debug!("feed entry {} has no link, skipping", entry.id);
                }
                link
            })
            .collect();

        Ok(addresses)
    }
}
