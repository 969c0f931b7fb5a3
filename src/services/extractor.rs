use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;
use crate::models::Extracted;

/// Boundary to content extraction: reduce one item's page to its markup and
/// a plain-text block. Failure for one address says nothing about another.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, address: &str) -> Result<Extracted>;
}

pub struct HttpExtractor {
    client: Client,
}

impl HttpExtractor {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("feedwatch/1.0")
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Convert HTML to plain text and strip blank lines and edge whitespace.
    fn reduce_to_text(html: &str) -> Result<String> {
        let text = html2text::from_read(html.as_bytes(), 80)
            .map_err(|e| anyhow::anyhow!("Failed to convert HTML to text: {}", e))?;

        let cleaned: String = text
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(cleaned)
    }
}

#[async_trait]
impl ContentExtractor for HttpExtractor {
    async fn extract(&self, address: &str) -> Result<Extracted> {
        let response = self.client.get(address).send().await?;

        if !response.status().is_success() {
            return Err(
                anyhow::anyhow!("Failed to fetch {}: HTTP {}", address, response.status()).into(),
            );
        }

        let html = response.text().await?;
        let text = Self::reduce_to_text(&html)?;

        Ok(Extracted {
            markup: Some(html),
            text,
        })
    }
}

impl Default for HttpExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_strips_markup_and_blank_lines() {
        let html = "<html><body><h1>Court Roll</h1>\n\n<p>a feast of wine</p></body></html>";
        let text = HttpExtractor::reduce_to_text(html).unwrap();
        assert!(text.contains("a feast of wine"));
        assert!(!text.contains('<'));
        assert!(!text.lines().any(|l| l.trim().is_empty()));
    }
}
