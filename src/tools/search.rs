//! Web search through SerpApi's Google engine

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::error::ToolError;
use crate::config::SearchConfig;

pub const DEFAULT_RESULTS: usize = 5;
pub const MAX_RESULTS: usize = 20;
pub const NO_RESULTS: &str = "No results found.";

/// Returns result links for a query
#[async_trait]
pub trait SearchEngine: Send + Sync {
    async fn search(&self, query: &str, count: usize) -> Result<Vec<String>, ToolError>;
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct OrganicResult {
    link: Option<String>,
}

pub struct SerpApiClient {
    http: reqwest::Client,
    config: SearchConfig,
}

impl SerpApiClient {
    pub fn new(config: SearchConfig) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl SearchEngine for SerpApiClient {
    async fn search(&self, query: &str, count: usize) -> Result<Vec<String>, ToolError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ToolError::NotConfigured("SerpApi key"))?;

        let num = count.to_string();
        let response = self
            .http
            .get(&self.config.endpoint)
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("num", num.as_str()),
                ("api_key", api_key),
            ])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        let parsed: SearchResponse = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                ToolError::Upstream(format!("Unexpected search response: {}", e))
            } else {
                ToolError::Upstream(format!("Search returned HTTP {}", status.as_u16()))
            }
        })?;

        if let Some(error) = parsed.error {
            // SerpApi reports "no results" as an error string
            if error.contains("hasn't returned any results") {
                return Ok(Vec::new());
            }
            warn!("Search failed: {}", error);
            return Err(ToolError::Upstream(error));
        }
        if !status.is_success() {
            return Err(ToolError::Upstream(format!(
                "Search returned HTTP {}",
                status.as_u16()
            )));
        }

        Ok(parsed
            .organic_results
            .into_iter()
            .filter_map(|r| r.link)
            .take(count)
            .collect())
    }
}

/// Outcome shown to the user: links, or a notice when nothing matched
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchOutcome {
    pub links: Vec<String>,
    pub message: Option<String>,
}

/// Validate input, then query `engine`
pub async fn web_search(
    engine: &dyn SearchEngine,
    query: &str,
    count: Option<usize>,
) -> Result<SearchOutcome, ToolError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ToolError::validation("Please enter a search query."));
    }
    let count = count.unwrap_or(DEFAULT_RESULTS);
    if !(1..=MAX_RESULTS).contains(&count) {
        return Err(ToolError::validation(format!(
            "Number of results must be between 1 and {}.",
            MAX_RESULTS
        )));
    }

    debug!("Searching for {:?} ({} results)", query, count);
    let links = engine.search(query, count).await?;
    let message = links.is_empty().then(|| NO_RESULTS.to_string());
    Ok(SearchOutcome { links, message })
}
