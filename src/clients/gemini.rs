//! Google Gemini client with native structured output

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::config::KeyFromEnv;
use crate::core::{LowLevelClient, OutputSchema};
use crate::error::{AIError, GeminiError};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GeminiModel {
    #[default]
    Flash25,
    Pro25,
    FlashLite25,
    Override(String),
}

impl GeminiModel {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Flash25 => "gemini-2.5-flash",
            Self::Pro25 => "gemini-2.5-pro",
            Self::FlashLite25 => "gemini-2.5-flash-lite",
            Self::Override(s) => s.as_str(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: GeminiModel,
    pub base_url: String,
    pub temperature: Option<f32>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: GeminiModel::default(),
            base_url: API_BASE.to_string(),
            temperature: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

#[derive(Clone, Debug)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl KeyFromEnv for GeminiClient {
    const KEY_NAME: &'static str = "GEMINI_API_KEY";
    const FALLBACK_KEY_NAMES: &'static [&'static str] = &["API_KEY"];
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        info!(model = %config.model.id(), "Creating new Gemini client");
        Self { config, client: Client::new() }
    }

    pub fn with_api_key(api_key: String) -> Self {
        Self::new(GeminiConfig { api_key, ..GeminiConfig::default() })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model.id()
        )
    }

    /// Send one generateContent request and return the concatenated candidate text.
    async fn generate_content(&self, prompt: String, schema: Option<&Value>) -> Result<Option<String>, AIError> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: Some(prompt) }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: schema.map(|_| "application/json"),
                response_schema: schema,
                temperature: self.config.temperature,
            }),
        };

        debug!(structured = schema.is_some(), "Sending request to Gemini API");
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                AIError::Gemini(GeminiError::Http(e.to_string()))
            })?;

        let status = response.status();
        debug!(status = %status, "Received response from Gemini API");

        if status == 429 {
            warn!("Gemini API rate limit exceeded");
            return Err(AIError::Gemini(GeminiError::RateLimit));
        }

        if status == 401 || status == 403 {
            error!("Gemini API authentication failed");
            return Err(AIError::Gemini(GeminiError::Authentication));
        }

        let body = response.text().await.map_err(|e| {
            error!(error = %e, "Failed to read Gemini response body");
            AIError::Gemini(GeminiError::Http(e.to_string()))
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map(|r| r.error.message)
                .unwrap_or(body);
            error!(status = %status, error = %message, "Gemini API error");
            return Err(AIError::Gemini(GeminiError::Api(format!("HTTP {}: {}", status, message))));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, "Failed to parse Gemini response JSON");
            AIError::Gemini(GeminiError::Api(format!("Failed to parse response: {}", e)))
        })?;

        Ok(Self::candidate_text(gemini_response))
    }

    fn candidate_text(response: GeminiResponse) -> Option<String> {
        let candidate = response.candidates.into_iter().next()?;
        if let Some(reason) = &candidate.finish_reason {
            debug!(finish_reason = %reason, "Gemini candidate finished");
        }
        let text: String = candidate
            .content?
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait]
impl LowLevelClient for GeminiClient {
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len(), model = %self.config.model.id()))]
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError> {
        let text = self.generate_content(prompt, None).await?;
        text.ok_or_else(|| AIError::Gemini(GeminiError::Api("No candidates in response".to_string())))
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }

    #[instrument(skip(self, prompt, schema), fields(prompt_len = prompt.len(), model = %self.config.model.id()))]
    async fn ask_structured(&self, prompt: String, schema: &OutputSchema) -> Result<Option<String>, AIError> {
        let text = self.generate_content(prompt, Some(&schema.native)).await?;
        match &text {
            Some(t) => info!(response_len = t.len(), "Received structured Gemini response"),
            None => warn!("Gemini response carried no text"),
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_structured_output_config() {
        let schema = serde_json::json!({"type": "ARRAY"});
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".into()),
                parts: vec![GeminiPart { text: Some("hi".into()) }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json"),
                response_schema: Some(&schema),
                temperature: None,
            }),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(value["generationConfig"]["responseSchema"]["type"], "ARRAY");
        assert!(value["generationConfig"].get("temperature").is_none());
    }

    #[test]
    fn candidate_parts_are_concatenated() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"[{\"id\":"},{"text":"1}]"}]},"finishReason":"STOP"}]}"#;
        let response: GeminiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(GeminiClient::candidate_text(response).as_deref(), Some(r#"[{"id":1}]"#));
    }

    #[test]
    fn missing_candidates_or_text_is_no_payload() {
        let response: GeminiResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(GeminiClient::candidate_text(response).is_none());

        let response: GeminiResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(GeminiClient::candidate_text(response).is_none());

        let body = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        let response: GeminiResponse = serde_json::from_str(body).unwrap();
        assert!(GeminiClient::candidate_text(response).is_none());
    }

    #[test]
    fn endpoint_uses_model_id() {
        let client = GeminiClient::new(GeminiConfig {
            base_url: "http://localhost:9/models/".into(),
            model: GeminiModel::Override("custom".into()),
            ..GeminiConfig::default()
        });
        assert_eq!(client.endpoint(), "http://localhost:9/models/custom:generateContent");
    }
}
