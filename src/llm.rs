use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GeminiConfig;
use crate::error::BotError;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Relays a single prompt to Gemini's `generateContent` endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: GeminiConfig, client: reqwest::Client) -> Self {
        Self { client, config }
    }

    /// Reply text for the user; provider failures become a warning line.
    pub async fn generate_reply(&self, text: &str) -> String {
        match self.generate(text).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Gemini request failed: {}", e);
                e.to_string()
            }
        }
    }

    pub async fn generate(&self, text: &str) -> Result<String, BotError> {
        self.request(text)
            .await
            .map_err(|e| BotError::provider("Gemini", e))
    }

    async fn request(&self, text: &str) -> Result<String> {
        if self.config.api_key.is_empty() {
            anyhow::bail!("GEMINI_API_KEY is not set");
        }

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text }],
            }],
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        debug!("Sending request to Gemini: {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to send request to Gemini")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to read Gemini response")?;

        if !status.is_success() {
            let detail = serde_json::from_str::<GenerateResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .map(|e| e.message)
                .unwrap_or(body);
            anyhow::bail!("Gemini API error ({}): {}", status, detail);
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).context("Failed to parse Gemini response")?;

        extract_text(parsed)
    }
}

fn extract_text(response: GenerateResponse) -> Result<String> {
    if let Some(error) = response.error {
        anyhow::bail!("Gemini error: {}", error.message);
    }

    let content = response
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .context("No candidates in Gemini response")?;

    let text: String = content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("No text in Gemini response");
    }

    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{http_client, serve, UNREACHABLE};
    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn config(base_url: &str, api_key: &str) -> GeminiConfig {
        GeminiConfig {
            api_key: api_key.to_string(),
            model: "gemini-1.5-flash".to_string(),
            base_url: base_url.to_string(),
        }
    }

    /// Echoes the prompt back, padded with whitespace, after checking the
    /// model path and that the key arrived as a header, not in the URL.
    async fn echo(
        Path(call): Path<String>,
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let key = headers.get("x-goog-api-key").and_then(|v| v.to_str().ok());
        if call != "gemini-1.5-flash:generateContent" || key != Some("k") || !params.is_empty() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": {"message": "API key not valid"}})),
            );
        }
        let prompt = body["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        (
            StatusCode::OK,
            Json(json!({
                "candidates": [{
                    "content": {"parts": [{"text": "  echo: "}, {"text": format!("{}\n\n", prompt)}]}
                }]
            })),
        )
    }

    fn mock() -> Router {
        Router::new().route("/models/{call}", post(echo))
    }

    #[tokio::test]
    async fn test_reply_is_trimmed_and_joined() {
        let base = serve(mock()).await;
        let client = GeminiClient::with_client(config(&base, "k"), http_client());

        let reply = client.generate("What is Rust?").await.unwrap();
        assert_eq!(reply, "echo: What is Rust?");
    }

    #[tokio::test]
    async fn test_api_error_becomes_warning_reply() {
        let base = serve(mock()).await;
        let client = GeminiClient::with_client(config(&base, "wrong"), http_client());

        let reply = client.generate_reply("hello").await;
        assert!(reply.starts_with("⚠️ Gemini Error:"), "{}", reply);
        assert!(reply.contains("API key not valid"), "{}", reply);
    }

    #[tokio::test]
    async fn test_unreachable_provider_never_panics() {
        let client = GeminiClient::with_client(config(UNREACHABLE, "k"), http_client());

        let err = client.generate("hello").await.unwrap_err();
        assert!(matches!(err, BotError::Provider { provider: "Gemini", .. }));
    }

    #[tokio::test]
    async fn test_unreachable_provider_does_not_reveal_key() {
        let client = GeminiClient::with_client(config(UNREACHABLE, "GSECRET"), http_client());

        let reply = client.generate_reply("hello").await;
        assert!(reply.starts_with("⚠️ Gemini Error:"), "{}", reply);
        assert!(!reply.contains("GSECRET"), "{}", reply);
    }

    #[tokio::test]
    async fn test_missing_key_fails_on_first_use() {
        let client = GeminiClient::with_client(config(UNREACHABLE, ""), http_client());

        let reply = client.generate_reply("hello").await;
        assert_eq!(reply, "⚠️ Gemini Error: GEMINI_API_KEY is not set");
    }

    #[test]
    fn test_blocked_prompt_without_text_is_an_error() {
        let response: GenerateResponse =
            serde_json::from_value(json!({"candidates": [{"content": {"parts": []}}]})).unwrap();
        assert!(extract_text(response).is_err());

        let response: GenerateResponse =
            serde_json::from_value(json!({"candidates": []})).unwrap();
        assert!(extract_text(response).is_err());
    }
}
