//! Hosted language model client
//!
//! Talks to the Gemini `generateContent` REST endpoint with a single user
//! turn per call. Errors are classified into transient and fatal so the
//! retry policy can decide what to do.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::LlmError;
use crate::config::LlmConfig;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Fatal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }
}

/// 429 and 5xx are worth retrying; any other non-success status is not
pub fn classify_status(status: StatusCode, body: &str) -> LlmError {
    let message = format!("HTTP {}: {}", status.as_u16(), body.trim());
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        LlmError::Transient(message)
    } else {
        LlmError::Fatal(message)
    }
}

fn parse_response(body: &str) -> Result<String, LlmError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::Fatal(format!("Malformed response: {}", e)))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(LlmError::Fatal("Response contained no text".to_string()));
    }
    Ok(text)
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| LlmError::Fatal("GEMINI_API_KEY is not configured".to_string()))?;

        let request = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };
        let body = serde_json::to_vec(&request)
            .map_err(|e| LlmError::Fatal(format!("Failed to encode request: {}", e)))?;

        debug!("Sending {} char prompt to {}", prompt.len(), self.model);

        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| LlmError::Transient(format!("Request failed: {}", e)))?;

        let status = response.status();
        // A body that stops mid-stream is a transport hiccup, not a bad answer
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Transient(format!("Response stream ended early: {}", e)))?;

        if !status.is_success() {
            let err = classify_status(status, &text);
            warn!("Language model returned {}", status);
            return Err(err);
        }

        parse_response(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;

    fn client(endpoint: String) -> GeminiClient {
        GeminiClient::new(&LlmConfig {
            api_key: Some("test-key".to_string()),
            endpoint,
            timeout_secs: 5,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_classify_status() {
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, "").is_transient());
        assert!(!classify_status(StatusCode::BAD_REQUEST, "").is_transient());
        assert!(!classify_status(StatusCode::FORBIDDEN, "bad key").is_transient());
    }

    #[test]
    fn test_parse_response_joins_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"- one\n"},{"text":"- two"}]}}]}"#;
        assert_eq!(parse_response(body).unwrap(), "- one\n- two");

        assert!(matches!(
            parse_response(r#"{"candidates":[]}"#),
            Err(LlmError::Fatal(_))
        ));
        assert!(matches!(parse_response("<html>"), Err(LlmError::Fatal(_))));
    }

    #[tokio::test]
    async fn test_generate_success() {
        let (base, request) = serve_once(
            "200 OK",
            "application/json",
            r#"{"candidates":[{"content":{"parts":[{"text":"Paris"}]}}]}"#,
        )
        .await;

        let answer = client(base).generate("Capital of France?").await.unwrap();
        assert_eq!(answer, "Paris");

        let request = request.await.unwrap();
        assert!(request
            .head
            .starts_with("POST /v1beta/models/gemini-1.5-flash:generateContent"));
        assert!(request.head.to_lowercase().contains("x-goog-api-key: test-key"));
        assert!(request.body.contains(r#""text":"Capital of France?""#));
        assert!(request.body.contains(r#""generationConfig""#));
    }

    #[tokio::test]
    async fn test_generate_server_error_is_transient() {
        let (base, _) =
            serve_once("503 Service Unavailable", "application/json", r#"{"error":"busy"}"#).await;

        let err = client(base).generate("hi").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_generate_bad_request_is_fatal() {
        let (base, _) = serve_once("400 Bad Request", "application/json", "{}").await;

        let err = client(base).generate("hi").await.unwrap_err();
        assert!(matches!(err, LlmError::Fatal(_)));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_fatal() {
        let client = GeminiClient::new(&LlmConfig::default()).unwrap();
        let err = client.generate("hi").await.unwrap_err();
        assert!(matches!(err, LlmError::Fatal(_)));
    }
}
