//! Shared test helpers for agent tests. Repository fakes come from
//! `relicbot_core::testing`.

use std::sync::Mutex;

use async_trait::async_trait;
use relicbot_core::error::ProviderError;
use relicbot_core::message::{Message, Role};
use relicbot_core::provider::{
    Provider, ProviderRequest, ProviderResponse, StopReason, ToolDefinition, Usage,
};
use relicbot_core::tool::{ToolCall, ToolExecutor};
use serde_json::{Value, json};

pub use relicbot_core::testing::{FakeScm, pr_info};

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and
/// records the request. Panics if more calls are made than responses
/// provided.
pub struct ScriptedProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    call_count: Mutex<usize>,
    pub requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    pub fn with_results(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut count = self.call_count.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        if *count >= responses.len() {
            panic!(
                "ScriptedProvider: no more responses (call #{}, have {})",
                *count,
                responses.len()
            );
        }
        self.requests.lock().unwrap().push(request);
        let response = responses[*count].clone();
        *count += 1;
        response
    }
}

pub fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// Final answer: text with `end_turn`.
pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        stop_reason: StopReason::EndTurn,
        usage: usage(),
        model: "mock-model".into(),
    }
}

/// Tool request with optional thought text.
pub fn tool_response(calls: Vec<ToolCall>, thought: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_tools(thought, calls),
        stop_reason: StopReason::ToolUse,
        usage: usage(),
        model: "mock-model".into(),
    }
}

pub fn call(id: &str, name: &str, input: Value) -> ToolCall {
    ToolCall::new(id, name, input)
}

/// Echoes every call back as `{"tool": name, "input": input}`.
#[derive(Default)]
pub struct RecordingTools {
    pub calls: Mutex<Vec<(String, Value)>>,
}

#[async_trait]
impl ToolExecutor for RecordingTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "get_pr_diff".into(),
            description: "Get the full diff of PR changes".into(),
            parameters: json!({"type": "object", "properties": {}, "required": []}),
        }]
    }

    async fn execute(&self, name: &str, input: Value) -> Value {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), input.clone()));
        json!({ "tool": name, "input": input })
    }
}

pub fn roles(messages: &[Message]) -> Vec<Role> {
    messages.iter().map(|m| m.role).collect()
}
