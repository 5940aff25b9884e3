//! Low-level model client abstraction.
//!
//! Every provider implements [`LowLevelClient::ask_raw`]. Providers that can constrain
//! their output override [`LowLevelClient::ask_structured`]: Gemini takes the native
//! schema, Claude and DeepSeek take [`OutputSchema::object_form`] because their
//! structured modes only produce objects. Anything else gets the JSON Schema appended
//! to the prompt as guidance.

use std::fmt::Debug;

use async_trait::async_trait;
use schemars::{schema_for, JsonSchema};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::AIError;

/// Output shape requested from a model, in both dialects providers understand.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    /// OpenAPI-subset schema accepted by Gemini's `responseSchema`
    pub native: Value,
    /// Full JSON Schema, generated from the Rust type, used for prompt guidance
    pub json_schema: Value,
    /// Property that carries the output when a provider only accepts top-level objects
    pub field: &'static str,
}

impl OutputSchema {
    /// Build an output schema whose guidance half is derived from `T`.
    pub fn for_type<T: JsonSchema>(native: Value) -> Self {
        let json_schema = serde_json::to_value(schema_for!(T)).unwrap_or(Value::Null);
        Self { native, json_schema, field: "result" }
    }

    pub fn with_field(mut self, field: &'static str) -> Self {
        self.field = field;
        self
    }

    /// The JSON Schema as an object with one required property, `field`, holding the output.
    ///
    /// Definitions stay at the root so `$ref`s keep resolving.
    pub fn object_form(&self) -> Value {
        let mut inner = self.json_schema.clone();
        let defs = inner.as_object_mut().and_then(|schema| {
            schema.remove("$schema");
            schema.remove("$defs")
        });

        let mut properties = Map::new();
        properties.insert(self.field.to_string(), inner);

        let mut object = Map::new();
        object.insert("type".into(), Value::from("object"));
        object.insert("properties".into(), Value::Object(properties));
        object.insert("required".into(), json!([self.field]));
        if let Some(defs) = defs {
            object.insert("$defs".into(), defs);
        }
        Value::Object(object)
    }

    /// Append the JSON Schema to a prompt for providers without structured output.
    pub fn guidance(&self, prompt: &str) -> String {
        append_schema(prompt, &self.json_schema, "Respond with only valid JSON matching this schema")
    }

    /// Like [`guidance`](Self::guidance), for providers constrained to a JSON object.
    pub fn object_guidance(&self, prompt: &str) -> String {
        append_schema(prompt, &self.object_form(), "Respond with a single JSON object matching this schema")
    }

    /// Take the output out of an object-form answer. Text of any other shape is returned as is.
    pub fn unwrap_object(&self, text: String) -> String {
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(mut object)) => match object.remove(self.field) {
                Some(output) => output.to_string(),
                None => text,
            },
            _ => text,
        }
    }
}

fn append_schema(prompt: &str, schema: &Value, instruction: &str) -> String {
    let schema_json = serde_json::to_string_pretty(schema)
        .unwrap_or_else(|_| "Schema serialization failed".to_string());

    format!(
        "{}\n\n## Response Format\n{}, without any surrounding text:\n```json\n{}\n```",
        prompt, instruction, schema_json
    )
}

#[async_trait]
pub trait LowLevelClient: Send + Sync + Debug {
    /// Execute a prompt and return the raw model text
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError>;

    /// Clone this client into a boxed trait object
    fn clone_box(&self) -> Box<dyn LowLevelClient>;

    /// Execute a prompt whose answer must follow `schema`.
    ///
    /// `Ok(None)` means the service answered without any payload.
    async fn ask_structured(&self, prompt: String, schema: &OutputSchema) -> Result<Option<String>, AIError> {
        let guided = schema.guidance(&prompt);
        debug!(prompt_len = guided.len(), "Using schema-guided prompt");
        let text = self.ask_raw(guided).await?;
        Ok(if text.trim().is_empty() { None } else { Some(text) })
    }
}

impl Clone for Box<dyn LowLevelClient> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[async_trait]
impl LowLevelClient for Box<dyn LowLevelClient> {
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError> {
        self.as_ref().ask_raw(prompt).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        self.as_ref().clone_box()
    }

    async fn ask_structured(&self, prompt: String, schema: &OutputSchema) -> Result<Option<String>, AIError> {
        self.as_ref().ask_structured(prompt, schema).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct Answer {
        /// The value
        value: i32,
    }

    #[derive(Debug, Clone)]
    struct Echo;

    #[async_trait]
    impl LowLevelClient for Echo {
        async fn ask_raw(&self, prompt: String) -> Result<String, AIError> {
            Ok(prompt)
        }

        fn clone_box(&self) -> Box<dyn LowLevelClient> {
            Box::new(self.clone())
        }
    }

    #[derive(Debug, Clone)]
    struct Silent;

    #[async_trait]
    impl LowLevelClient for Silent {
        async fn ask_raw(&self, _prompt: String) -> Result<String, AIError> {
            Ok("  \n".to_string())
        }

        fn clone_box(&self) -> Box<dyn LowLevelClient> {
            Box::new(self.clone())
        }
    }

    #[test]
    fn json_schema_is_derived_from_type() {
        let schema = OutputSchema::for_type::<Answer>(serde_json::json!({"type": "OBJECT"}));
        assert_eq!(schema.json_schema["properties"]["value"]["type"], "integer");
        assert_eq!(schema.native["type"], "OBJECT");
    }

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct Wrapper {
        inner: Answer,
    }

    #[test]
    fn object_form_wraps_output_and_hoists_definitions() {
        let schema = OutputSchema::for_type::<Vec<Wrapper>>(Value::Null).with_field("answers");
        let object = schema.object_form();
        assert_eq!(object["type"], "object");
        assert_eq!(object["required"], json!(["answers"]));
        assert_eq!(object["properties"]["answers"]["type"], "array");
        assert!(object["properties"]["answers"].get("$defs").is_none());
        assert!(object["properties"]["answers"].get("$schema").is_none());
        assert!(object["$defs"].get("Answer").is_some());
        assert!(schema.object_guidance("Q").contains("single JSON object"));
    }

    #[test]
    fn unwrap_object_extracts_the_field_only() {
        let schema = OutputSchema::for_type::<Vec<Answer>>(Value::Null).with_field("answers");
        assert_eq!(schema.unwrap_object(r#"{"answers":[{"value":1}]}"#.into()), r#"[{"value":1}]"#);
        assert_eq!(schema.unwrap_object(r#"{"other":[]}"#.into()), r#"{"other":[]}"#);
        assert_eq!(schema.unwrap_object("not json".into()), "not json");
    }

    #[tokio::test]
    async fn default_structured_call_appends_guidance() {
        let schema = OutputSchema::for_type::<Answer>(Value::Null);
        let text = Echo.ask_structured("Give me a number".to_string(), &schema).await.unwrap().unwrap();
        assert!(text.starts_with("Give me a number"));
        assert!(text.contains("## Response Format"));
        assert!(text.contains("\"value\""));
    }

    #[tokio::test]
    async fn blank_answer_is_reported_as_missing_payload() {
        let schema = OutputSchema::for_type::<Answer>(Value::Null);
        let boxed: Box<dyn LowLevelClient> = Box::new(Silent);
        assert!(boxed.ask_structured("anything".to_string(), &schema).await.unwrap().is_none());
    }
}
