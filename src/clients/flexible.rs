use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::claude::ClaudeClient;
use super::deepseek::DeepSeekClient;
use super::gemini::GeminiClient;
use super::mock::{MockClient, MockHandle, MockResponse};
use crate::config::KeyFromEnv;
use crate::core::{LowLevelClient, OutputSchema};
use crate::error::{AIError, ConfigError};

/// Which backend answers generation requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientType {
    Gemini,
    Claude,
    DeepSeek,
    Mock,
}

impl ClientType {
    /// Pick the first backend whose key is present, in order of preference.
    pub fn detect_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let has = |name: &str| lookup(name).is_some_and(|value| !value.trim().is_empty());

        if has(GeminiClient::KEY_NAME) || GeminiClient::FALLBACK_KEY_NAMES.iter().any(|&name| has(name)) {
            Self::Gemini
        } else if has(ClaudeClient::KEY_NAME) {
            Self::Claude
        } else if has(DeepSeekClient::KEY_NAME) {
            Self::DeepSeek
        } else {
            Self::Mock
        }
    }

    /// Construct the backend. With `interactive`, a missing key is asked for on the terminal.
    /// `Mock` needs no key and answers every request with the demo quiz.
    pub fn build(self, interactive: bool) -> Result<Box<dyn LowLevelClient>, ConfigError> {
        fn key<C: KeyFromEnv>(interactive: bool) -> Result<String, ConfigError> {
            if interactive {
                C::find_key_with_user()
            } else {
                C::require_key()
            }
        }

        let client: Box<dyn LowLevelClient> = match self {
            Self::Gemini => Box::new(GeminiClient::with_api_key(key::<GeminiClient>(interactive)?)),
            Self::Claude => Box::new(ClaudeClient::with_api_key(key::<ClaudeClient>(interactive)?)),
            Self::DeepSeek => Box::new(DeepSeekClient::with_api_key(key::<DeepSeekClient>(interactive)?)),
            Self::Mock => Box::new(MockClient::demo()),
        };
        info!(client = %self, "Client ready");
        Ok(client)
    }
}

impl FromStr for ClientType {
    type Err = String;

    /// Parse client type from string (case insensitive)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "claude" => Ok(Self::Claude),
            "deepseek" => Ok(Self::DeepSeek),
            "mock" => Ok(Self::Mock),
            _ => Err(format!(
                "Unknown client type: '{}'. Supported: gemini, claude, deepseek, mock",
                s
            )),
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientType::Gemini => write!(f, "Gemini"),
            ClientType::Claude => write!(f, "Claude"),
            ClientType::DeepSeek => write!(f, "DeepSeek"),
            ClientType::Mock => write!(f, "Mock"),
        }
    }
}

/// Flexible client that wraps any LowLevelClient and provides factory functions
#[derive(Clone)]
pub struct FlexibleClient {
    inner: Arc<dyn LowLevelClient>,
}

impl fmt::Debug for FlexibleClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlexibleClient").finish_non_exhaustive()
    }
}

impl FlexibleClient {
    /// Create a new FlexibleClient wrapping the given client
    pub fn new(client: Box<dyn LowLevelClient>) -> Self {
        Self { inner: Arc::from(client) }
    }

    pub fn from_type(client_type: ClientType, interactive: bool) -> Result<Self, ConfigError> {
        client_type.build(interactive).map(Self::new)
    }

    /// Create a FlexibleClient with a mock and return the handle for configuration
    pub fn mock() -> (Self, Arc<MockHandle>) {
        Self::mock_with_responses(Vec::new())
    }

    pub fn mock_with_responses(responses: Vec<MockResponse>) -> (Self, Arc<MockHandle>) {
        let (client, handle) = MockClient::with_responses(responses);
        (Self::new(Box::new(client)), handle)
    }
}

#[async_trait]
impl LowLevelClient for FlexibleClient {
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError> {
        self.inner.ask_raw(prompt).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }

    async fn ask_structured(&self, prompt: String, schema: &OutputSchema) -> Result<Option<String>, AIError> {
        self.inner.ask_structured(prompt, schema).await
    }
}
