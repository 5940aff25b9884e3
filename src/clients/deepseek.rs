//! DeepSeek chat-completions client. Structured output uses JSON-object mode.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::config::KeyFromEnv;
use crate::core::{LowLevelClient, OutputSchema};
use crate::error::{AIError, DeepSeekError};

const COMPLETIONS_URL: &str = "https://api.deepseek.com/v1/chat/completions";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeepSeekModel {
    #[default]
    Chat,
    Reasoner,
    Override(String),
}

impl DeepSeekModel {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Chat => "deepseek-chat",
            Self::Reasoner => "deepseek-reasoner",
            Self::Override(s) => s.as_str(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeepSeekConfig {
    pub api_key: String,
    pub model: DeepSeekModel,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for DeepSeekConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DeepSeekModel::default(),
            max_tokens: 4096,
            temperature: 0.3,
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage; 1],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionResponse {
    fn into_text(self) -> String {
        let Some(choice) = self.choices.into_iter().next() else {
            return String::new();
        };
        if let Some(reason) = &choice.finish_reason {
            debug!(finish_reason = %reason, "DeepSeek choice finished");
        }
        choice.message.content.unwrap_or_default()
    }
}

#[derive(Clone, Debug)]
pub struct DeepSeekClient {
    config: DeepSeekConfig,
    client: Client,
}

impl KeyFromEnv for DeepSeekClient {
    const KEY_NAME: &'static str = "DEEPSEEK_API_KEY";
}

impl DeepSeekClient {
    pub fn new(config: DeepSeekConfig) -> Self {
        info!(model = %config.model.id(), "Creating new DeepSeek client");
        Self { config, client: Client::new() }
    }

    pub fn with_api_key(api_key: String) -> Self {
        Self::new(DeepSeekConfig { api_key, ..DeepSeekConfig::default() })
    }

    fn request(&self, prompt: String, json_object: bool) -> CompletionRequest<'_> {
        CompletionRequest {
            model: self.config.model.id(),
            messages: [ChatMessage { role: "user", content: prompt }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            response_format: json_object.then_some(ResponseFormat { kind: "json_object" }),
        }
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, AIError> {
        debug!(json_object = request.response_format.is_some(), "Sending request to DeepSeek API");
        let response = self
            .client
            .post(COMPLETIONS_URL)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                DeepSeekError::Http(e.to_string())
            })?;

        let status = response.status();
        debug!(status = %status, "Received response from DeepSeek API");
        match status.as_u16() {
            429 => {
                warn!("DeepSeek API rate limit exceeded");
                return Err(DeepSeekError::RateLimit.into());
            }
            401 => {
                error!("DeepSeek API authentication failed");
                return Err(DeepSeekError::Authentication.into());
            }
            _ if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                error!(status = %status, error = %body, "DeepSeek API error");
                return Err(DeepSeekError::Api(format!("HTTP {}: {}", status, body)).into());
            }
            _ => {}
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse DeepSeek response JSON");
            DeepSeekError::Http(e.to_string())
        })?;
        Ok(parsed.into_text())
    }
}

#[async_trait]
impl LowLevelClient for DeepSeekClient {
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len(), model = %self.config.model.id()))]
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError> {
        let text = self.complete(&self.request(prompt, false)).await?;
        info!(response_len = text.len(), "Received DeepSeek response");
        Ok(text)
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }

    /// JSON-object mode needs the schema in the prompt and only yields objects, so the
    /// output travels in [`OutputSchema::field`] and is unwrapped here.
    #[instrument(skip(self, prompt, schema), fields(prompt_len = prompt.len(), model = %self.config.model.id()))]
    async fn ask_structured(&self, prompt: String, schema: &OutputSchema) -> Result<Option<String>, AIError> {
        let request = self.request(schema.object_guidance(&prompt), true);
        let text = self.complete(&request).await?;
        if text.trim().is_empty() {
            warn!("DeepSeek response carried no content");
            return Ok(None);
        }
        info!(response_len = text.len(), "Received structured DeepSeek response");
        Ok(Some(schema.unwrap_object(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn json_object_mode_is_only_requested_for_structured_calls() {
        let client = DeepSeekClient::new(DeepSeekConfig {
            model: DeepSeekModel::Reasoner,
            ..DeepSeekConfig::default()
        });

        let value = serde_json::to_value(client.request("quiz me".into(), false)).unwrap();
        assert_eq!(value["model"], "deepseek-reasoner");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "quiz me");
        assert!(value.get("response_format").is_none());

        let value = serde_json::to_value(client.request("quiz me".into(), true)).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
    }

    #[test]
    fn structured_prompt_mentions_json_and_the_wrapper_field() {
        let schema = OutputSchema::for_type::<Vec<String>>(Value::Null).with_field("lines");
        let prompt = schema.object_guidance("List things");
        assert!(prompt.contains("JSON"));
        assert!(prompt.contains("\"lines\""));
    }

    #[test]
    fn null_or_missing_content_is_empty_text() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null},"finish_reason":"stop"}]}"#;
        let response: CompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.into_text(), "");

        let response: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(response.into_text(), "");
    }
}
