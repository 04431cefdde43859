//! Posting to X (Twitter) through the v2 API
//!
//! A batch of up to ten tweets is posted in order. Blank entries are
//! skipped; the first failure stops the batch and is reported alongside the
//! tweets already posted.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::error::ToolError;
use crate::config::TwitterConfig;

pub const MAX_TWEETS: usize = 10;
pub const MAX_TWEET_CHARS: usize = 280;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostedTweet {
    /// 1-based position in the submitted batch
    pub number: usize,
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TweetBatch {
    pub posted: Vec<PostedTweet>,
    /// Why the batch stopped early, if it did
    pub error: Option<String>,
}

#[derive(Deserialize)]
struct CreateResponse {
    data: CreatedTweet,
}

#[derive(Deserialize)]
struct CreatedTweet {
    id: String,
}

#[derive(Deserialize)]
struct ApiProblem {
    title: Option<String>,
    detail: Option<String>,
}

pub struct TweetPoster {
    http: reqwest::Client,
    config: TwitterConfig,
}

impl TweetPoster {
    pub fn new(config: TwitterConfig) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { http, config })
    }

    fn validate(tweets: &[String]) -> Result<(), ToolError> {
        if tweets.is_empty() || tweets.len() > MAX_TWEETS {
            return Err(ToolError::validation(format!(
                "Please enter between 1 and {} tweets.",
                MAX_TWEETS
            )));
        }
        if tweets.iter().all(|t| t.trim().is_empty()) {
            return Err(ToolError::validation("Please enter at least one tweet."));
        }
        if let Some(number) = tweets
            .iter()
            .position(|t| t.trim().chars().count() > MAX_TWEET_CHARS)
        {
            return Err(ToolError::validation(format!(
                "Tweet #{} is longer than {} characters.",
                number + 1,
                MAX_TWEET_CHARS
            )));
        }
        Ok(())
    }

    async fn create(&self, token: &str, text: &str) -> Result<String, String> {
        let url = format!("{}/2/tweets", self.config.endpoint.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(json!({ "text": text }).to_string())
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = response.status();
        let body = response.text().await.map_err(|e| e.to_string())?;

        if !status.is_success() {
            let reason = serde_json::from_str::<ApiProblem>(&body)
                .ok()
                .and_then(|p| p.detail.or(p.title))
                .unwrap_or(body);
            return Err(format!("HTTP {}: {}", status.as_u16(), reason));
        }

        serde_json::from_str::<CreateResponse>(&body)
            .map(|created| created.data.id)
            .map_err(|e| format!("unexpected response: {}", e))
    }

    /// Post every non-blank tweet in order
    pub async fn post_tweets(&self, tweets: &[String]) -> Result<TweetBatch, ToolError> {
        Self::validate(tweets)?;
        let token = self
            .config
            .access_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ToolError::NotConfigured("X access token"))?;

        let mut batch = TweetBatch::default();
        for (i, text) in tweets.iter().enumerate() {
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            match self.create(token, text).await {
                Ok(id) => {
                    info!("Posted tweet #{} as {}", i + 1, id);
                    batch.posted.push(PostedTweet { number: i + 1, id });
                }
                Err(reason) => {
                    warn!("Posting tweet #{} failed: {}", i + 1, reason);
                    batch.error = Some(format!("Failed to post tweet #{}: {}", i + 1, reason));
                    break;
                }
            }
        }

        match (&batch.error, batch.posted.is_empty()) {
            (Some(error), true) => Err(ToolError::Upstream(error.clone())),
            _ => Ok(batch),
        }
    }
}
