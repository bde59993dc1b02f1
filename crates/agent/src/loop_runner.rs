//! The conversation loop: model call, tool execution, repeat.

use std::sync::Arc;

use relicbot_config::AppConfig;
use relicbot_core::message::{Conversation, Message};
use relicbot_core::provider::{Provider, ProviderRequest, StopReason};
use relicbot_core::tool::{ToolExecutor, ToolResult};
use tracing::{debug, info, warn};

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The model ended its turn.
    EndTurn,
    /// The model stopped without finishing and without asking for tools
    /// (e.g. it ran out of tokens).
    Stalled(StopReason),
    /// The model-call ceiling was reached.
    IterationLimit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveSummary {
    pub model_calls: u32,
    pub tool_calls: usize,
    pub completion: Completion,
}

/// Drives the model through a conversation, executing the tools it asks
/// for until it ends its turn.
pub struct ConversationDriver {
    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    /// Tools offered to the model
    tools: Arc<dyn ToolExecutor>,

    /// The model to use
    model: String,

    /// Temperature setting
    temperature: f32,

    /// Max tokens per response
    max_tokens: Option<u32>,

    /// Hard ceiling on model calls per run
    max_iterations: u32,
}

impl ConversationDriver {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<dyn ToolExecutor>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            tools,
            model: model.into(),
            temperature: 0.2,
            max_tokens: None,
            max_iterations: 10,
        }
    }

    /// A driver using the model settings and iteration ceiling of `config`.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        tools: Arc<dyn ToolExecutor>,
        config: &AppConfig,
    ) -> Self {
        Self::new(provider, tools, config.model())
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
            .with_max_iterations(config.max_iterations())
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set the maximum number of model calls.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn tools(&self) -> &dyn ToolExecutor {
        self.tools.as_ref()
    }

    /// Run the loop on `conversation`, which must already hold the system
    /// and initial user messages.
    ///
    /// Every tool call of a turn is executed in request order and all the
    /// results are appended as one tool turn before the next model call.
    /// Provider failures abort the loop.
    pub async fn drive(
        &self,
        conversation: &mut Conversation,
    ) -> Result<DriveSummary, relicbot_core::Error> {
        info!(
            conversation_id = %conversation.id,
            model = %self.model,
            max_iterations = self.max_iterations,
            "Starting conversation"
        );

        let tool_definitions = self.tools.definitions();
        let mut tool_calls = 0;

        for iteration in 1..=self.max_iterations {
            info!(iteration, max = self.max_iterations, "Agent loop iteration");

            let request = ProviderRequest {
                model: self.model.clone(),
                messages: conversation.messages.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tool_definitions.clone(),
            };

            let response = self.provider.complete(request).await?;
            if let Some(usage) = &response.usage {
                debug!(
                    iteration,
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "Model responded"
                );
            }

            let stop_reason = response.stop_reason.clone();
            let calls = response.message.tool_calls.clone();
            conversation.push(response.message);

            if stop_reason.is_complete() {
                return Ok(DriveSummary {
                    model_calls: iteration,
                    tool_calls,
                    completion: Completion::EndTurn,
                });
            }

            if calls.is_empty() {
                warn!(?stop_reason, iteration, "Model stopped without completing or calling tools");
                return Ok(DriveSummary {
                    model_calls: iteration,
                    tool_calls,
                    completion: Completion::Stalled(stop_reason),
                });
            }

            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                info!(tool = %call.name, call_id = %call.id, "Executing tool");
                let output = self.tools.execute(&call.name, call.input.clone()).await;
                results.push(ToolResult::new(&call.id, output.to_string()));
            }
            tool_calls += calls.len();
            conversation.push(Message::tool_results(results));
        }

        warn!(
            max_iterations = self.max_iterations,
            "Iteration ceiling reached, publishing partial analysis"
        );
        Ok(DriveSummary {
            model_calls: self.max_iterations,
            tool_calls,
            completion: Completion::IterationLimit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use relicbot_core::error::ProviderError;
    use relicbot_core::message::Role;
    use relicbot_core::provider::ProviderResponse;
    use serde_json::{Value, json};

    fn seeded() -> Conversation {
        let mut conv = Conversation::new();
        conv.push(Message::system("You are an observability expert."));
        conv.push(Message::user("Analyze PR #12"));
        conv
    }

    fn driver(provider: Arc<ScriptedProvider>, tools: Arc<RecordingTools>) -> ConversationDriver {
        ConversationDriver::new(provider, tools, "mock-model")
    }

    #[tokio::test]
    async fn end_turn_without_tools() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_response("No monitoring needed")]));
        let tools = Arc::new(RecordingTools::default());
        let mut conv = seeded();

        let summary = driver(provider.clone(), tools.clone())
            .drive(&mut conv)
            .await
            .unwrap();

        assert_eq!(summary.completion, Completion::EndTurn);
        assert_eq!(summary.model_calls, 1);
        assert_eq!(summary.tool_calls, 0);
        assert!(tools.calls.lock().unwrap().is_empty());
        assert_eq!(roles(&conv.messages), vec![Role::System, Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn three_calls_get_three_correlated_results() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_response(
                vec![
                    call("toolu_a", "get_pr_diff", json!({})),
                    call("toolu_b", "analyze_file", json!({"filepath": "app/a.rb"})),
                    call("toolu_c", "check_existing_infrastructure", json!({})),
                ],
                "Let me look around.",
            ),
            text_response("Add an error-rate alert."),
        ]));
        let tools = Arc::new(RecordingTools::default());
        let mut conv = seeded();

        let summary = driver(provider.clone(), tools.clone())
            .drive(&mut conv)
            .await
            .unwrap();
        assert_eq!(summary.tool_calls, 3);
        assert_eq!(summary.model_calls, 2);

        let executed: Vec<_> = tools
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        assert_eq!(
            executed,
            vec!["get_pr_diff", "analyze_file", "check_existing_infrastructure"]
        );

        // The second request already carries all three results in one turn.
        let requests = provider.requests.lock().unwrap();
        let second = &requests[1].messages;
        assert_eq!(
            roles(second),
            vec![Role::System, Role::User, Role::Assistant, Role::Tool]
        );
        let results = &second[3].tool_results;
        let ids: Vec<_> = results.iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(ids, vec!["toolu_a", "toolu_b", "toolu_c"]);

        let second_output: Value = serde_json::from_str(&results[1].content).unwrap();
        assert_eq!(second_output["tool"], "analyze_file");
        assert_eq!(second_output["input"]["filepath"], "app/a.rb");
    }

    #[tokio::test]
    async fn tool_definitions_are_offered_every_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_response(vec![call("c1", "get_pr_diff", json!({}))], ""),
            text_response("done"),
        ]));
        let mut conv = seeded();
        driver(provider.clone(), Arc::new(RecordingTools::default()))
            .with_temperature(0.7)
            .with_max_tokens(1024)
            .drive(&mut conv)
            .await
            .unwrap();

        for request in provider.requests.lock().unwrap().iter() {
            assert_eq!(request.tools.len(), 1);
            assert_eq!(request.model, "mock-model");
            assert_eq!(request.max_tokens, Some(1024));
            assert!((request.temperature - 0.7).abs() < f32::EPSILON);
        }
    }

    #[tokio::test]
    async fn ceiling_bounds_model_calls() {
        let looping: Vec<ProviderResponse> = (0..3)
            .map(|i| tool_response(vec![call(&format!("c{i}"), "get_pr_diff", json!({}))], ""))
            .collect();
        let provider = Arc::new(ScriptedProvider::new(looping));
        let tools = Arc::new(RecordingTools::default());
        let mut conv = seeded();

        let summary = driver(provider.clone(), tools.clone())
            .with_max_iterations(3)
            .drive(&mut conv)
            .await
            .unwrap();

        assert_eq!(summary.completion, Completion::IterationLimit);
        assert_eq!(summary.model_calls, 3);
        assert_eq!(provider.call_count(), 3);
        assert_eq!(tools.calls.lock().unwrap().len(), 3);
        assert_eq!(conv.assistant_turns(), 3);
    }

    #[tokio::test]
    async fn max_tokens_without_calls_stops() {
        let mut truncated = text_response("The PR adds a new endp");
        truncated.stop_reason = StopReason::MaxTokens;
        let provider = Arc::new(ScriptedProvider::new(vec![truncated]));
        let mut conv = seeded();

        let summary = driver(provider.clone(), Arc::new(RecordingTools::default()))
            .drive(&mut conv)
            .await
            .unwrap();

        assert_eq!(summary.completion, Completion::Stalled(StopReason::MaxTokens));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let provider = Arc::new(ScriptedProvider::with_results(vec![Err(
            ProviderError::AuthenticationFailed("invalid x-api-key".into()),
        )]));
        let mut conv = seeded();

        let err = driver(provider, Arc::new(RecordingTools::default()))
            .drive(&mut conv)
            .await
            .unwrap_err();
        assert!(matches!(err, relicbot_core::Error::Provider(_)));
        assert!(err.to_string().contains("invalid x-api-key"));
        assert_eq!(conv.len(), 2);
    }
}
