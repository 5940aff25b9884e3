pub mod claude;
pub mod deepseek;
pub mod flexible;
pub mod gemini;
pub mod mock;

pub use claude::{ClaudeClient, ClaudeConfig, ClaudeModel};
pub use deepseek::{DeepSeekClient, DeepSeekConfig, DeepSeekModel};
pub use flexible::{ClientType, FlexibleClient};
pub use gemini::{GeminiClient, GeminiConfig, GeminiModel};
pub use mock::{MockClient, MockHandle, MockResponse};
