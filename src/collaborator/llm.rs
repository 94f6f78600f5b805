//! Collaborators backed by an OpenAI-compatible chat completions API

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::prompts;
use super::{ContentAnalyzer, TemplateAdapter};
use crate::config::LlmConfig;
use crate::template::{AdaptationRequest, ContentInput, SourceContent, Template};

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
}

/// Minimal chat completions client
#[derive(Clone)]
pub struct LlmClient {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
}

impl LlmClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("viral-templates/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Build a client from config, reading the API key from the configured env var
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .with_context(|| format!("{} is not set", config.api_key_env))?;
        Self::new(&config.base_url, api_key, Duration::from_secs(config.timeout_secs))
    }

    /// Send one system + user exchange and return the reply text
    pub async fn complete(&self, model: &str, system: &str, user: String, max_tokens: u32) -> Result<String> {
        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens,
            temperature: 0.3,
            response_format: ResponseFormat { r#type: "json_object" },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .context("Failed to send request to LLM provider")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("LLM API error ({}): {}", status, body);
        }

        let body = response.text().await.context("Failed to read response body")?;
        let raw: Value = serde_json::from_str(&body)
            .map_err(|e| anyhow!("Failed to parse JSON response: {} (body: {})", e, truncate(&body, 500)))?;

        let content = message_content(&raw);
        debug!("LLM reply from {}: {} chars", model, content.len());
        Ok(content)
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Pull `choices[0].message.content`, which is either a string or a list of text parts
fn message_content(raw: &Value) -> String {
    let content = raw
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"));

    match content {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter(|part| part.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    }
}

/// Parse a reply as JSON, tolerating a surrounding ```json fence
pub fn parse_json_reply(reply: &str) -> Result<Value> {
    let trimmed = reply.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```").trim())
        .unwrap_or(trimmed);

    if body.is_empty() {
        bail!("Model returned an empty reply");
    }
    serde_json::from_str(body).with_context(|| format!("Model reply is not JSON: {}", truncate(body, 200)))
}

pub struct LlmContentAnalyzer {
    client: LlmClient,
    model: String,
    max_tokens: u32,
}

impl LlmContentAnalyzer {
    pub fn new(client: LlmClient, config: &LlmConfig) -> Self {
        Self {
            client,
            model: config.analysis_model.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl ContentAnalyzer for LlmContentAnalyzer {
    async fn analyze(&self, input: &ContentInput, source: &SourceContent) -> Result<Value> {
        let reply = self
            .client
            .complete(
                &self.model,
                prompts::ANALYSIS_SYSTEM_PROMPT,
                prompts::analysis_prompt(input, source),
                self.max_tokens,
            )
            .await?;
        parse_json_reply(&reply)
    }
}

pub struct LlmTemplateAdapter {
    client: LlmClient,
    model: String,
    max_tokens: u32,
}

impl LlmTemplateAdapter {
    pub fn new(client: LlmClient, config: &LlmConfig) -> Self {
        Self {
            client,
            model: config.adaptation_model.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl TemplateAdapter for LlmTemplateAdapter {
    async fn adapt(&self, template: &Template, request: &AdaptationRequest) -> Result<Value> {
        let reply = self
            .client
            .complete(
                &self.model,
                prompts::ADAPTATION_SYSTEM_PROMPT,
                prompts::adaptation_prompt(template, request),
                self.max_tokens,
            )
            .await?;
        parse_json_reply(&reply)
    }
}
