//! Ollama chat backend (`POST /api/chat`).
//!
//! In [`ModelMode::Structured`] the selection schema is passed as Ollama's
//! `format`, so the reply is constrained to `{name, arguments}` and is
//! returned as [`ModelOutput::Structured`]. The other modes return the
//! assistant text for the extractor to dig through.

use crate::backends::LanguageModel;
use crate::config::ModelMode;
use crate::error::ModelError;
use crate::selection::{ModelOutput, ModelPrompt};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

pub struct OllamaBackend {
    http: reqwest::Client,
    host: String,
    model: String,
    mode: ModelMode,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    stream: bool,
    options: ChatOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

impl OllamaBackend {
    pub fn new(
        host: &str,
        model: impl Into<String>,
        mode: ModelMode,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            host: normalize_host(host),
            model: model.into(),
            mode,
            temperature,
        })
    }

    fn format_for(&self, prompt: &ModelPrompt) -> Option<Value> {
        match self.mode {
            ModelMode::Structured => Some(
                prompt
                    .response_schema
                    .clone()
                    .unwrap_or_else(|| json!("json")),
            ),
            ModelMode::Json => Some(json!("json")),
            ModelMode::Text => None,
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaBackend {
    async fn generate(&self, prompt: &ModelPrompt) -> Result<ModelOutput, ModelError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
            format: self.format_for(prompt),
        };

        let start = std::time::Instant::now();
        let response = self
            .http
            .post(format!("{}/api/chat", self.host))
            .json(&request)
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        tracing::debug!(
            model = %self.model,
            mode = ?self.mode,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model selection received"
        );

        Ok(into_output(self.mode, parsed.message.content))
    }
}

/// Structured mode hands back a parsed object when the content is one;
/// anything else stays text so the extractor can still recover it.
fn into_output(mode: ModelMode, content: String) -> ModelOutput {
    if mode == ModelMode::Structured {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(content.trim()) {
            return ModelOutput::Structured(value);
        }
    }
    ModelOutput::Text(content)
}

/// Ensure a scheme and drop trailing slashes. `localhost` is pinned to IPv4
/// because Ollama usually only listens there.
fn normalize_host(host: &str) -> String {
    let mut host = host.trim().trim_end_matches('/').to_string();
    if !host.starts_with("http://") && !host.starts_with("https://") {
        host = format!("http://{host}");
    }
    host.replacen("://localhost", "://127.0.0.1", 1)
}
