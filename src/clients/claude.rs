//! Anthropic Messages client. Structured output is forced through a single tool call.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::config::KeyFromEnv;
use crate::core::{LowLevelClient, OutputSchema};
use crate::error::{AIError, ClaudeError};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const OUTPUT_TOOL: &str = "record_output";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClaudeModel {
    #[default]
    Haiku35,
    Sonnet4,
    Override(String),
}

impl ClaudeModel {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Haiku35 => "claude-3-5-haiku-latest",
            Self::Sonnet4 => "claude-sonnet-4-20250514",
            Self::Override(s) => s.as_str(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    pub api_key: String,
    pub model: ClaudeModel,
    pub max_tokens: u32,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: ClaudeModel::default(),
            max_tokens: 4096,
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<[Tool; 1]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    input_schema: Value,
}

#[derive(Debug, Serialize)]
struct ToolChoice {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'static str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    ToolUse { input: Value },
    #[serde(other)]
    Other,
}

impl MessagesResponse {
    fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn tool_input(self) -> Option<Value> {
        self.content.into_iter().find_map(|block| match block {
            ContentBlock::ToolUse { input } => Some(input),
            _ => None,
        })
    }
}

#[derive(Clone, Debug)]
pub struct ClaudeClient {
    config: ClaudeConfig,
    client: Client,
}

impl KeyFromEnv for ClaudeClient {
    const KEY_NAME: &'static str = "ANTHROPIC_API_KEY";
}

impl ClaudeClient {
    pub fn new(config: ClaudeConfig) -> Self {
        info!(model = %config.model.id(), "Creating new Claude client");
        Self { config, client: Client::new() }
    }

    pub fn with_api_key(api_key: String) -> Self {
        Self::new(ClaudeConfig { api_key, ..ClaudeConfig::default() })
    }

    fn request(&self, prompt: String, schema: Option<&OutputSchema>) -> MessagesRequest<'_> {
        MessagesRequest {
            model: self.config.model.id(),
            max_tokens: self.config.max_tokens,
            messages: [Message { role: "user", content: prompt }],
            tools: schema.map(|schema| {
                [Tool {
                    name: OUTPUT_TOOL,
                    description: "Record the requested output.",
                    input_schema: schema.object_form(),
                }]
            }),
            tool_choice: schema.map(|_| ToolChoice { kind: "tool", name: OUTPUT_TOOL }),
        }
    }

    async fn send(&self, request: &MessagesRequest<'_>) -> Result<MessagesResponse, AIError> {
        debug!(tools = request.tools.is_some(), "Sending request to Anthropic API");
        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                ClaudeError::Http(e.to_string())
            })?;

        let status = response.status();
        debug!(status = %status, "Received response from Anthropic API");
        match status.as_u16() {
            429 => {
                warn!("Anthropic API rate limit exceeded");
                return Err(ClaudeError::RateLimit.into());
            }
            401 | 403 => {
                error!("Anthropic API authentication failed");
                return Err(ClaudeError::Authentication.into());
            }
            _ if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                error!(status = %status, error = %body, "Anthropic API error");
                return Err(ClaudeError::Api(format!("HTTP {}: {}", status, body)).into());
            }
            _ => {}
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Anthropic response JSON");
            ClaudeError::Http(e.to_string())
        })?;
        if let Some(reason) = &parsed.stop_reason {
            debug!(stop_reason = %reason, "Anthropic message finished");
        }
        Ok(parsed)
    }

    /// The forced tool call's output field, or the reply text when the model answered in prose.
    fn structured_output(response: MessagesResponse, schema: &OutputSchema) -> Option<String> {
        let text = response.text();
        match response.tool_input() {
            Some(Value::Object(mut input)) => Some(match input.remove(schema.field) {
                Some(output) => output.to_string(),
                None => Value::Object(input).to_string(),
            }),
            Some(other) => Some(other.to_string()),
            None if text.trim().is_empty() => None,
            None => Some(text),
        }
    }
}

#[async_trait]
impl LowLevelClient for ClaudeClient {
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len(), model = %self.config.model.id()))]
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError> {
        let response = self.send(&self.request(prompt, None)).await?;
        let text = response.text();
        info!(response_len = text.len(), "Received Anthropic response");
        Ok(text)
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }

    #[instrument(skip(self, prompt, schema), fields(prompt_len = prompt.len(), model = %self.config.model.id()))]
    async fn ask_structured(&self, prompt: String, schema: &OutputSchema) -> Result<Option<String>, AIError> {
        let response = self.send(&self.request(prompt, Some(schema))).await?;
        let output = Self::structured_output(response, schema);
        match &output {
            Some(o) => info!(response_len = o.len(), "Received structured Anthropic response"),
            None => warn!("Anthropic response carried no output"),
        }
        Ok(output)
    }
}
