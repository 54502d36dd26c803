//! AI commentary over an OpenAI-compatible chat-completions endpoint
//!
//! Works with api.openai.com as well as local deployments (vLLM,
//! llama.cpp server) through a custom `api_base`. When no AI endpoint
//! is configured, [`CannedAnalyst`] produces a fixed disclaimer so the
//! rest of the bot keeps working.

use crate::config::AiConfig;
use async_trait::async_trait;
use folio_core::{AiAnalyst, FolioError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are a careful financial analyst. You receive a JSON \
    summary of an asset comparison or a weighted portfolio. Write a short, plain-language \
    commentary (3-6 sentences) on what the numbers show. Mention risk alongside return. \
    Never give personalized investment advice.";

pub struct OpenAiAnalyst {
    client: Client,
    config: AiConfig,
}

impl OpenAiAnalyst {
    pub fn new(config: AiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FolioError::Config(format!("http client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl AiAnalyst for OpenAiAnalyst {
    async fn analyze(&self, data: &serde_json::Value) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: data.to_string(),
                },
            ],
            max_tokens: 400,
            temperature: 0.4,
        };

        debug!(model = %self.config.model, api_base = %self.config.api_base, "requesting commentary");
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| FolioError::UpstreamUnavailable(format!("ai request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => FolioError::Config("ai api key rejected".to_string()),
                _ => FolioError::UpstreamUnavailable(format!("ai HTTP {status}: {body}")),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| FolioError::UpstreamUnavailable(format!("ai response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| FolioError::UpstreamUnavailable("ai returned no text".to_string()))
    }
}

/// Fallback analyst used when no AI endpoint is configured
#[derive(Debug, Default)]
pub struct CannedAnalyst;

#[async_trait]
impl AiAnalyst for CannedAnalyst {
    async fn analyze(&self, _data: &serde_json::Value) -> Result<String> {
        Ok("AI commentary is not configured. Set OPENAI_API_KEY to enable it; the \
            metrics above still tell the full story."
            .to_string())
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_canned_analyst_always_answers() {
        let analyst = CannedAnalyst;
        let text = analyst.analyze(&serde_json::json!({})).await.unwrap();
        assert!(text.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "{}".to_string(),
            }],
            max_tokens: 400,
            temperature: 0.4,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"Looks risky."}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "Looks risky.");
    }
}
