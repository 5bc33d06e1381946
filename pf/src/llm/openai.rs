//! OpenAI API client implementation
//!
//! Implements the LlmClient trait for OpenAI's Chat Completions API. A call
//! is made exactly once; failures go straight back to the caller.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, StopReason, TokenUsage};
use crate::config::LlmConfig;

/// OpenAI API client
pub struct OpenAIClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    timeout: Option<Duration>,
}

impl OpenAIClient {
    /// Create a new client from configuration and an API key
    pub fn from_config(config: &LlmConfig, api_key: &str) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "from_config: called");
        if api_key.trim().is_empty() {
            return Err(LlmError::InvalidResponse("API key is empty".to_string()));
        }

        let timeout = config.timeout_ms.map(Duration::from_millis);
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            debug!(?timeout, "from_config: request timeout set");
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key: api_key.trim().to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_tokens: config.max_tokens,
            timeout,
        })
    }

    /// Value for the Authorization header; a stored `Bearer ` key is used as-is
    fn authorization(&self) -> String {
        if self.api_key.starts_with("Bearer ") {
            self.api_key.clone()
        } else {
            format!("Bearer {}", self.api_key)
        }
    }

    /// Build the request body for the OpenAI API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_tokens, "build_request_body: called");

        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": request.system_prompt,
        })];

        messages.extend(request.messages.iter().map(|msg| {
            serde_json::json!({
                "role": msg.role.as_str(),
                "content": msg.content,
            })
        }));

        let max_tokens = request.max_tokens.min(self.max_tokens);

        // o1/o3 and gpt-5 models use max_completion_tokens instead of max_tokens
        let uses_completion_tokens =
            self.model.starts_with("gpt-5") || self.model.starts_with("o1") || self.model.starts_with("o3");

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        if uses_completion_tokens {
            body["max_completion_tokens"] = serde_json::json!(max_tokens);
        } else {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }

        body
    }

    /// Parse the OpenAI API response body
    fn parse_response(&self, body: &str) -> Result<CompletionResponse, LlmError> {
        debug!(len = body.len(), "parse_response: called");
        let api_response: OpenAIResponse = serde_json::from_str(body)?;
        debug!(choices = api_response.choices.len(), "parse_response: decoded");
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response has no choices".to_string()))?;

        let content = choice
            .message
            .content
            .ok_or_else(|| LlmError::InvalidResponse("response message has no content".to_string()))?;

        let stop_reason = match choice.finish_reason.as_deref() {
            Some("length") => StopReason::MaxTokens,
            Some("content_filter") => StopReason::ContentFilter,
            _ => StopReason::EndTurn,
        };

        let usage = api_response
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: Some(content),
            stop_reason,
            usage,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "complete: called");
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request_body(&request);

        let response = self
            .http
            .post(&url)
            .header("Authorization", self.authorization())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| match self.timeout {
                Some(timeout) if e.is_timeout() => LlmError::Timeout(timeout),
                _ => LlmError::Network(e),
            })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            debug!(%status, "complete: API error");
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, message: text });
        }

        debug!("complete: success");
        let body = response.text().await?;
        self.parse_response(&body)
    }
}

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;

    fn client(model: &str, api_key: &str) -> OpenAIClient {
        OpenAIClient {
            model: model.to_string(),
            api_key: api_key.to_string(),
            base_url: "https://api.openai.com".to_string(),
            http: Client::new(),
            max_tokens: 1000,
            timeout: None,
        }
    }

    fn request(max_tokens: u32) -> CompletionRequest {
        CompletionRequest {
            system_prompt: "You are helpful".to_string(),
            messages: vec![Message::user("Hello")],
            max_tokens,
            temperature: Some(0.7),
        }
    }

    #[test]
    fn test_build_request_body_basic() {
        let body = client("gpt-4o", "sk-test").build_request_body(&request(1000));

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 1000);
        assert!(body["messages"].is_array());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are helpful");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Hello");
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_max_tokens_capped() {
        let body = client("gpt-4o", "sk-test").build_request_body(&request(5000));
        assert_eq!(body["max_tokens"], 1000);
    }

    #[test]
    fn test_completion_tokens_models() {
        let body = client("o3-mini", "sk-test").build_request_body(&request(500));
        assert_eq!(body["max_completion_tokens"], 500);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_temperature_omitted_when_unset() {
        let mut req = request(100);
        req.temperature = None;
        let body = client("gpt-4o", "sk-test").build_request_body(&req);
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_authorization_header() {
        assert_eq!(client("gpt-4o", "sk-abc").authorization(), "Bearer sk-abc");
        assert_eq!(client("gpt-4o", "Bearer sk-abc").authorization(), "Bearer sk-abc");
    }

    #[test]
    fn test_parse_response() {
        let body = serde_json::json!({
            "choices": [{"message": {"content": "[]"}, "finish_reason": "length"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        })
        .to_string();

        let resp = client("gpt-4o", "sk-test").parse_response(&body).unwrap();
        assert_eq!(resp.content.as_deref(), Some("[]"));
        assert_eq!(resp.stop_reason, StopReason::MaxTokens);
        assert_eq!(resp.usage.input_tokens, 12);
    }

    #[test]
    fn test_parse_response_without_content() {
        let body = r#"{"choices": [{"message": {"content": null}, "finish_reason": "stop"}]}"#;
        assert!(matches!(
            client("gpt-4o", "sk-test").parse_response(body),
            Err(LlmError::InvalidResponse(_))
        ));

        assert!(matches!(
            client("gpt-4o", "sk-test").parse_response(r#"{"choices": []}"#),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_response_malformed_body() {
        let err = client("gpt-4o", "sk-test")
            .parse_response("<html>502 Bad Gateway</html>")
            .unwrap_err();
        assert!(matches!(err, LlmError::Json(_)));
        assert!(err.to_string().starts_with("JSON serialization error"));
    }

    #[test]
    fn test_from_config_rejects_empty_key() {
        assert!(OpenAIClient::from_config(&LlmConfig::default(), "  ").is_err());

        let mut config = LlmConfig::default();
        config.base_url = "http://localhost:9999/".to_string();
        config.timeout_ms = Some(5000);
        let client = OpenAIClient::from_config(&config, "sk-x").unwrap();
        assert_eq!(client.base_url, "http://localhost:9999");
        assert_eq!(client.timeout, Some(Duration::from_millis(5000)));
    }
}
