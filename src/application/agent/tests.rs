use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::*;
use crate::application::dispatch::ToolDispatcher;
use crate::application::registry::{Capability, CapabilityError, CapabilityRegistry};
use crate::application::tooling::NullRemoteService;
use crate::config::tables::{default_aliases, default_routes};
use crate::config::DispatchSettings;
use crate::domain::types::MessageRole;
use crate::infrastructure::model::{ModelError, ModelProvider, ModelRequest, ModelResponse};

/// Replays a fixed script of responses; the last entry repeats once the
/// script is exhausted. Records every request it sees.
struct ScriptedProvider {
    script: Vec<String>,
    cursor: AtomicUsize,
    requests: Mutex<Vec<ModelRequest>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    fn new(script: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            script: script.iter().map(|s| s.to_string()).collect(),
            cursor: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            delay: None,
        })
    }

    fn delayed(script: &[&str], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: script.iter().map(|s| s.to_string()).collect(),
            cursor: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            delay: Some(delay),
        })
    }

    fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let index = self
            .cursor
            .fetch_add(1, Ordering::SeqCst)
            .min(self.script.len() - 1);
        Ok(ModelResponse {
            content: self.script[index].clone(),
            usage: None,
        })
    }
}

struct FileEchoCapability;

#[async_trait]
impl Capability for FileEchoCapability {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Reads a file"
    }

    async fn execute(&self, parameters: &Map<String, Value>) -> Result<Value, CapabilityError> {
        Ok(json!({ "read": Value::Object(parameters.clone()) }))
    }
}

fn runner_with(provider: Arc<ScriptedProvider>) -> Arc<SubagentRunner> {
    let mut registry = CapabilityRegistry::new();
    registry.register(Arc::new(FileEchoCapability));
    let dispatcher = Arc::new(ToolDispatcher::new(
        default_aliases(),
        default_routes(),
        Arc::new(registry),
        Arc::new(NullRemoteService),
        DispatchSettings::default(),
    ));
    Arc::new(SubagentRunner::new(provider, dispatcher, "scripted"))
}

fn supervisor_with(provider: Arc<ScriptedProvider>, max_running: usize) -> TaskSupervisor {
    let mut definitions = HashMap::new();
    definitions.insert(
        "general".to_string(),
        SubagentDefinition::unrestricted("general", "You are a capable assistant."),
    );
    TaskSupervisor::new(runner_with(provider), definitions, max_running)
}

const READ_BLOCK: &str =
    "<tool_use name=\"read_file\"><param name=\"path\">notes.txt</param></tool_use>";

#[tokio::test]
async fn plain_response_finishes_in_one_turn() {
    let provider = ScriptedProvider::new(&["The answer is 42."]);
    let runner = runner_with(Arc::clone(&provider));
    let definition = SubagentDefinition::unrestricted("general", "Assist.");

    let result = runner
        .run(&definition, &TaskRequest::new("What is the answer?"))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.response, "The answer is 42.");
    assert_eq!(result.turns, 1);
    assert!(result.dispatches.is_empty());
}

#[tokio::test]
async fn tool_results_are_folded_back_into_the_conversation() {
    let provider = ScriptedProvider::new(&[READ_BLOCK, "The file says hello."]);
    let runner = runner_with(Arc::clone(&provider));
    let definition = SubagentDefinition::unrestricted("general", "Assist.");

    let result = runner
        .run(&definition, &TaskRequest::new("Read my notes."))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.turns, 2);
    assert_eq!(result.dispatches.len(), 1);
    assert!(result.dispatches[0].success);

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    let folded = requests[1].messages.last().unwrap();
    assert_eq!(folded.role, MessageRole::User);
    assert!(folded.content.contains("TOOL EXECUTION RESULTS"));
    assert!(folded.content.contains("[read_file] success"));
}

#[tokio::test]
async fn disallowed_calls_make_the_response_final() {
    // The model asks for a write through an alias; only reads are allowed,
    // so nothing is dispatched and the response stands as the final answer.
    let provider = ScriptedProvider::new(&[
        "<tool_use name=\"writefile\"><param name=\"path\">out.txt</param></tool_use>",
    ]);
    let runner = runner_with(Arc::clone(&provider));
    let mut definition = SubagentDefinition::unrestricted("scribe", "Read things.");
    definition.allowed = AllowedCapabilities::List(vec!["read_file".to_string()]);

    let result = runner
        .run(&definition, &TaskRequest::new("Write a file."))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.turns, 1);
    assert!(result.dispatches.is_empty());
}

#[tokio::test]
async fn turn_budget_exhaustion_is_normal_completion() {
    // The script never stops requesting tools; the loop must stop anyway.
    let provider = ScriptedProvider::new(&[READ_BLOCK]);
    let runner = runner_with(Arc::clone(&provider));
    let mut definition = SubagentDefinition::unrestricted("general", "Assist.");
    definition.max_turns = 3;

    let result = runner
        .run(&definition, &TaskRequest::new("Loop forever."))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.turns, 3);
    assert_eq!(result.dispatches.len(), 3);
    assert_eq!(result.response, READ_BLOCK);
}

#[tokio::test(start_paused = true)]
async fn run_times_out_when_the_model_stalls() {
    let provider = ScriptedProvider::delayed(&["too late"], Duration::from_secs(3600));
    let runner = runner_with(provider);
    let mut definition = SubagentDefinition::unrestricted("general", "Assist.");
    definition.timeout = Duration::from_millis(200);

    let error = runner
        .run(&definition, &TaskRequest::new("Hurry up."))
        .await
        .unwrap_err();

    assert!(matches!(error, AgentError::Timeout { timeout_ms: 200 }));
}

#[tokio::test(start_paused = true)]
async fn background_task_runs_to_completion() {
    let provider = ScriptedProvider::delayed(&["All done."], Duration::from_millis(50));
    let supervisor = supervisor_with(provider, 4);

    let task_id = supervisor
        .submit_background("general", TaskRequest::new("Summarize the report."))
        .await
        .unwrap();

    let early = supervisor.get_task(&task_id).await.unwrap();
    assert!(!early.status.is_settled());
    assert_eq!(early.description, "Summarize the report.");

    let settled = supervisor
        .wait_for_task(&task_id, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(settled.status, TaskStatus::Completed);
    let result = settled.result.unwrap();
    assert!(result.success);
    assert_eq!(result.response, "All done.");
    assert!(settled.finished_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn cancelled_task_discards_its_late_result() {
    let provider = ScriptedProvider::delayed(&["irrelevant"], Duration::from_secs(30));
    let supervisor = supervisor_with(provider, 4);

    let task_id = supervisor
        .submit_background("general", TaskRequest::new("Slow work."))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let cancelled = supervisor.cancel_task(&task_id).await.unwrap();
    assert_eq!(cancelled.status, TaskStatus::Cancelled);

    // Let the underlying run finish; the record must stay cancelled.
    tokio::time::sleep(Duration::from_secs(60)).await;
    let after = supervisor.get_task(&task_id).await.unwrap();
    assert_eq!(after.status, TaskStatus::Cancelled);
    assert!(after.result.is_none());
}

#[tokio::test(start_paused = true)]
async fn task_ceiling_rejects_extra_submissions() {
    let provider = ScriptedProvider::delayed(&["busy"], Duration::from_secs(30));
    let supervisor = supervisor_with(provider, 1);

    supervisor
        .submit_background("general", TaskRequest::new("First."))
        .await
        .unwrap();
    let error = supervisor
        .submit_background("general", TaskRequest::new("Second."))
        .await
        .unwrap_err();

    assert!(matches!(error, AgentError::TaskLimit(1)));
}

#[tokio::test(start_paused = true)]
async fn waiting_on_a_stuck_task_times_out() {
    let provider = ScriptedProvider::delayed(&["never"], Duration::from_secs(3600));
    let supervisor = supervisor_with(provider, 4);

    let task_id = supervisor
        .submit_background("general", TaskRequest::new("Stall."))
        .await
        .unwrap();
    let error = supervisor
        .wait_for_task(&task_id, Duration::from_millis(500))
        .await
        .unwrap_err();

    assert!(matches!(error, AgentError::WaitTimeout { .. }));
}

#[tokio::test]
async fn unknown_names_are_rejected() {
    let provider = ScriptedProvider::new(&["unused"]);
    let supervisor = supervisor_with(provider, 4);

    let error = supervisor
        .submit_background("nonexistent", TaskRequest::new("Hi."))
        .await
        .unwrap_err();
    assert!(matches!(error, AgentError::UnknownSubagent(_)));

    let error = supervisor.get_task("no-such-task").await.unwrap_err();
    assert!(matches!(error, AgentError::UnknownTask(_)));
}

#[tokio::test]
async fn run_sync_uses_the_named_definition() {
    let provider = ScriptedProvider::new(&["Synchronous answer."]);
    let supervisor = supervisor_with(Arc::clone(&provider), 4);

    let result = supervisor
        .run_sync("general", TaskRequest::new("Quick question."))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.response, "Synchronous answer.");
    let system = &provider.requests()[0].messages[0];
    assert_eq!(system.role, MessageRole::System);
    assert!(system.content.contains("You are a capable assistant."));
}
