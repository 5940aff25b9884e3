use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::{core::LowLevelClient, error::AIError};

/// One scripted answer of a [`MockClient`]
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return this text as the model output
    Payload(String),
    /// Answer without any content
    Empty,
    /// Fail as if the service call errored
    Failure(String),
    /// Wait before producing the inner response
    Delayed(Duration, Box<MockResponse>),
}

impl MockResponse {
    pub fn payload(text: impl Into<String>) -> Self {
        Self::Payload(text.into())
    }

    pub fn delayed(self, delay: Duration) -> Self {
        Self::Delayed(delay, Box::new(self))
    }
}

/// Shared control surface of a [`MockClient`]: queue responses, inspect prompts.
#[derive(Debug, Default)]
pub struct MockHandle {
    responses: Mutex<VecDeque<MockResponse>>,
    /// Answer used once the queue is exhausted
    fallback: Option<MockResponse>,
    prompts: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockHandle {
    pub fn push(&self, response: MockResponse) {
        lock(&self.responses).push_back(response);
    }

    pub fn push_payload(&self, text: impl Into<String>) {
        self.push(MockResponse::payload(text));
    }

    /// Every prompt received so far, in order
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.responses).len()
    }
}

/// Mock client for testing that replays queued responses
#[derive(Debug, Clone)]
pub struct MockClient {
    handle: Arc<MockHandle>,
}

impl MockClient {
    pub fn new() -> (Self, Arc<MockHandle>) {
        Self::with_responses(Vec::new())
    }

    pub fn with_responses(responses: Vec<MockResponse>) -> (Self, Arc<MockHandle>) {
        Self::build(responses, None)
    }

    /// A mock that answers every prompt with `response`, after any queued responses.
    pub fn repeating(response: MockResponse) -> (Self, Arc<MockHandle>) {
        Self::build(Vec::new(), Some(response))
    }

    /// Offline stand-in for a model: every request gets [`sample_payload`].
    pub fn demo() -> Self {
        Self::repeating(MockResponse::payload(sample_payload())).0
    }

    fn build(responses: Vec<MockResponse>, fallback: Option<MockResponse>) -> (Self, Arc<MockHandle>) {
        let handle = Arc::new(MockHandle {
            responses: Mutex::new(responses.into()),
            fallback,
            prompts: Mutex::default(),
        });
        (Self { handle: handle.clone() }, handle)
    }
}

#[async_trait]
impl LowLevelClient for MockClient {
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError> {
        lock(&self.handle.prompts).push(prompt);
        let next = lock(&self.handle.responses)
            .pop_front()
            .or_else(|| self.handle.fallback.clone());

        let mut response = next.ok_or_else(|| AIError::Mock("No mock response queued".to_string()))?;
        while let MockResponse::Delayed(delay, inner) = response {
            debug!(delay_ms = delay.as_millis() as u64, "Mock response delayed");
            tokio::time::sleep(delay).await;
            response = *inner;
        }

        match response {
            MockResponse::Payload(text) => Ok(text),
            MockResponse::Empty => Ok(String::new()),
            MockResponse::Failure(message) => Err(AIError::Mock(message)),
            MockResponse::Delayed(..) => unreachable!("delays are unwrapped above"),
        }
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}

/// A well-formed five-question payload, for offline runs and tests.
pub fn sample_payload() -> String {
    let questions: Vec<_> = (0..5)
        .map(|i| {
            json!({
                "id": i + 1,
                "question": format!("Sample question {}: which option is number {}?", i + 1, i % 4 + 1),
                "options": ["Alpha", "Bravo", "Charlie", "Delta"],
                "correctAnswerIndex": i % 4,
                "explanation": format!("Option {} is correct for sample question {}.", i % 4 + 1, i + 1),
            })
        })
        .collect();
    serde_json::Value::Array(questions).to_string()
}
