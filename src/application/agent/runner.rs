//! Bounded agentic loop.
//!
//! Drives the model, extracts and filters tool calls, dispatches them, and
//! folds formatted results back into the conversation until the model stops
//! asking for capabilities or the turn budget runs out. The whole run races
//! a wall-clock timeout; the timeout is cooperative and an in-flight model
//! or capability call is left to finish in the background.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::definition::SubagentDefinition;
use super::errors::AgentError;
use super::models::{TaskRequest, TaskResult};
use crate::application::dispatch::{extractor, RawCall, ToolDispatcher};
use crate::domain::types::ChatMessage;
use crate::infrastructure::model::{ModelProvider, ModelRequest};

pub struct SubagentRunner {
    provider: Arc<dyn ModelProvider>,
    dispatcher: Arc<ToolDispatcher>,
    default_model: String,
}

impl SubagentRunner {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        dispatcher: Arc<ToolDispatcher>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            default_model: default_model.into(),
        }
    }

    pub fn dispatcher(&self) -> &Arc<ToolDispatcher> {
        &self.dispatcher
    }

    pub async fn run(
        &self,
        definition: &SubagentDefinition,
        request: &TaskRequest,
    ) -> Result<TaskResult, AgentError> {
        info!(subagent = %definition.name, "Subagent run started");
        match tokio::time::timeout(definition.timeout, self.drive(definition, request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(subagent = %definition.name, "Subagent run timed out");
                Err(AgentError::Timeout {
                    timeout_ms: definition.timeout.as_millis() as u64,
                })
            }
        }
    }

    async fn drive(
        &self,
        definition: &SubagentDefinition,
        request: &TaskRequest,
    ) -> Result<TaskResult, AgentError> {
        let model = definition
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let mut messages = vec![
            ChatMessage::system(self.compose_system_prompt(definition)),
            ChatMessage::user(request.prompt.clone()),
        ];
        let mut dispatches = Vec::new();
        let mut last_response = String::new();

        for turn in 1..=definition.max_turns {
            debug!(subagent = %definition.name, turn, "Submitting turn to model provider");
            let response = self
                .provider
                .chat(ModelRequest {
                    model: model.clone(),
                    messages: messages.clone(),
                })
                .await?;
            last_response = response.content.clone();

            let extracted = extractor::extract_from_text(&response.content, self.dispatcher.resolver());
            let requested = extracted.len();
            let allowed: Vec<RawCall> = extracted
                .into_iter()
                .filter(|call| {
                    let permitted = definition
                        .allowed
                        .permits(&call.name, self.dispatcher.resolver());
                    if !permitted {
                        debug!(
                            subagent = %definition.name,
                            capability = %call.name,
                            "Dropping call outside the allow-list"
                        );
                    }
                    permitted
                })
                .collect();

            if allowed.is_empty() {
                if requested > 0 {
                    info!(
                        subagent = %definition.name,
                        requested,
                        "Every requested call was disallowed; treating response as final"
                    );
                }
                return Ok(TaskResult::completed(last_response, turn, dispatches));
            }

            let dispatch = self.dispatcher.dispatch(allowed).await;
            let block = self.dispatcher.format_results(&dispatch);
            messages.push(ChatMessage::assistant(response.content));
            messages.push(ChatMessage::user(block));
            dispatches.push(dispatch);
        }

        warn!(
            subagent = %definition.name,
            max_turns = definition.max_turns,
            "Turn budget exhausted; returning last model response"
        );
        Ok(TaskResult::completed(
            last_response,
            definition.max_turns,
            dispatches,
        ))
    }

    fn compose_system_prompt(&self, definition: &SubagentDefinition) -> String {
        let mut lines = vec![definition.system_prompt.clone()];
        lines.push(
            "To invoke a capability, emit a block of the form \
             <tool_use name=\"capability\"><param name=\"key\">value</param></tool_use>."
                .to_string(),
        );
        lines.push(
            "Execution results arrive in the next user turn as a TOOL EXECUTION RESULTS block."
                .to_string(),
        );
        lines.push(
            "To discover what is available, invoke the list_capabilities capability.".to_string(),
        );
        lines.push(
            "When you have the final answer, respond plainly without any tool blocks.".to_string(),
        );
        lines.join(" ")
    }
}
