//! LLM Backend Client
//!
//! Sends the assembled prompt to a locally hosted model and extracts the
//! answer text. Two wire formats are supported: an OpenAI-compatible chat
//! completions endpoint (LM Studio and friends) and Ollama's native generate
//! API. Which one is used is purely configuration; nothing else in the
//! program knows or cares.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{RelayError, RelayResult};
use crate::prompt::PromptPayload;

/// Wire format of the configured endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    #[serde(rename = "openai-chat")]
    OpenAiChat,
    #[serde(rename = "ollama")]
    Ollama,
}

/// HTTP client for the configured backend
#[derive(Clone)]
pub struct LlmClient {
    backend: Backend,
    endpoint: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn from_config(config: &Config) -> RelayResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            backend: config.backend,
            endpoint: config.endpoint_url.trim_end_matches('/').to_string(),
            model: config.model_name.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            http,
        })
    }

    /// Health check - verify the backend is reachable
    pub async fn health_check(&self) -> bool {
        let url = match self.backend {
            Backend::OpenAiChat => format!("{}/v1/models", self.endpoint),
            Backend::Ollama => format!("{}/api/tags", self.endpoint),
        };
        match self
            .http
            .get(url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Send one request and return the model's answer text.
    pub async fn complete(&self, payload: &PromptPayload) -> RelayResult<String> {
        let (url, body) = match self.backend {
            Backend::OpenAiChat => (self.chat_url(), self.chat_body(payload)),
            Backend::Ollama => (
                format!("{}/api/generate", self.endpoint),
                self.generate_body(payload),
            ),
        };

        debug!("POST {} (model {})", url, self.model);
        let response = self.http.post(url).json(&body).send().await?;

        let status = response.status();
        let body_text = response.text().await?;

        if !status.is_success() {
            let message = extract_error_message(status.as_u16(), &body_text);
            warn!("backend error ({}): {}", status, message);
            return Err(RelayError::Backend(message));
        }

        match self.backend {
            Backend::OpenAiChat => parse_chat_content(&body_text),
            Backend::Ollama => parse_generate_content(&body_text),
        }
    }

    /// Accept endpoints given with or without the chat-completions path.
    fn chat_url(&self) -> String {
        if self.endpoint.ends_with("/v1/chat/completions") {
            self.endpoint.clone()
        } else {
            format!("{}/v1/chat/completions", self.endpoint)
        }
    }

    fn chat_body(&self, payload: &PromptPayload) -> serde_json::Value {
        let mut messages = Vec::new();
        if !payload.system.is_empty() {
            messages.push(serde_json::json!({"role": "system", "content": payload.system}));
        }
        messages.push(serde_json::json!({"role": "user", "content": payload.user}));

        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "stream": false,
        })
    }

    fn generate_body(&self, payload: &PromptPayload) -> serde_json::Value {
        let prompt = if payload.system.is_empty() {
            payload.user.clone()
        } else {
            format!("{}\n\n{}", payload.system, payload.user)
        };
        serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": self.max_tokens,
            }
        })
    }
}

/// Pull a readable message out of an error body, falling back to the status.
fn extract_error_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
    }
    format!("HTTP {}: {}", status, body.trim())
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

fn parse_chat_content(body: &str) -> RelayResult<String> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| RelayError::Backend(format!("malformed chat response: {}", e)))?;
    Ok(parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .unwrap_or_default())
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

fn parse_generate_content(body: &str) -> RelayResult<String> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| RelayError::Backend(format!("malformed generate response: {}", e)))?;
    Ok(parsed.response)
}
