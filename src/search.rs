use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::error::BotError;

pub const USAGE: &str = "Usage: /search your-query";
pub const NO_RESULTS: &str = "No results found.";
const MAX_RESULTS: usize = 3;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
}

/// SerpApi web search relay.
pub struct SearchClient {
    client: reqwest::Client,
    config: SearchConfig,
}

impl SearchClient {
    pub fn new(config: SearchConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: SearchConfig, client: reqwest::Client) -> Self {
        Self { client, config }
    }

    /// Reply text for a `/search` command. Never fails.
    pub async fn search_reply(&self, query: &str) -> String {
        match self.search(query).await {
            Ok(reply) => reply,
            Err(e) => {
                if matches!(e, BotError::Provider { .. }) {
                    warn!("Search request failed: {}", e);
                }
                e.to_string()
            }
        }
    }

    pub async fn search(&self, query: &str) -> Result<String, BotError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(BotError::Usage(USAGE));
        }

        info!("Searching: {}", query);

        let results = self
            .request(query)
            .await
            .map_err(|e| BotError::provider("SerpAPI", e))?;

        Ok(format_results(&results))
    }

    async fn request(&self, query: &str) -> Result<Vec<OrganicResult>> {
        let url = format!("{}/search.json", self.config.base_url.trim_end_matches('/'));

        // The request URL carries the key, so errors must not echo it.
        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("api_key", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to send request to SerpAPI")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("SerpAPI error ({}): {}", status, error_body);
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to parse SerpAPI response")?;

        // SerpApi also uses `error` for "no results" on a 200.
        if let Some(error) = &parsed.error {
            debug!("SerpAPI reported: {}", error);
        }

        Ok(parsed.organic_results)
    }
}

/// Top results as `title\nlink` blocks separated by blank lines.
pub fn format_results(results: &[OrganicResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_string();
    }

    let blocks: Vec<String> = results
        .iter()
        .take(MAX_RESULTS)
        .map(|r| format!("🔗 {}\n{}", r.title, r.link))
        .collect();

    format!("🔍 Top Search Results:\n{}", blocks.join("\n\n"))
}
