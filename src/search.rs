//! Reference page lookup.
//!
//! Optionally fetches a web page related to the query and reduces it to
//! clean text the user can read alongside the generated code. A failed
//! lookup is logged and dropped; it never affects the request itself.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::warn;

use crate::config::SearchConfig;

const FETCH_TIMEOUT_SECS: u64 = 15;

/// Fetches reference pages with a browser user agent.
pub(crate) struct ReferenceFetcher {
    client: reqwest::Client,
}

impl ReferenceFetcher {
    /// Builds a fetcher from configuration.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .context("Failed to build reference fetch client")?;
        Ok(Self { client })
    }

    /// Fetches `url` and returns its cleaned text, or `None` on any failure.
    pub async fn fetch_reference(&self, url: &str) -> Option<String> {
        match self.fetch(url).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Reference lookup failed for {url}: {e}");
                None
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        clean_page_text(&body)
    }
}

/// Converts an HTML page to text and strips blank/whitespace lines.
fn clean_page_text(html: &str) -> Result<String> {
    let text = html2text::from_read(html.as_bytes(), 100)
        .context("Failed to convert reference page to text")?;
    let cleaned = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_page_text_strips_blank_lines() {
        let html = "<html><body><h1>Title</h1><p>First line.</p><p>Second line.</p></body></html>";
        let cleaned = clean_page_text(html).unwrap();
        assert!(cleaned.contains("Title"));
        assert!(cleaned.contains("First line."));
        assert!(!cleaned.contains("\n\n"));
    }

    #[test]
    fn test_clean_page_text_trims_whitespace() {
        let html = "<p>   padded   </p>";
        let cleaned = clean_page_text(html).unwrap();
        assert_eq!(cleaned, cleaned.trim());
    }

    #[test]
    fn test_fetcher_construction() {
        let fetcher = ReferenceFetcher::new(&SearchConfig::default());
        assert!(fetcher.is_ok());
    }
}
