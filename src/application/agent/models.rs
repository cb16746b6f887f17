use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::dispatch::DispatchResult;

/// Input of a single agentic-loop run.
#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub prompt: String,
    pub description: String,
}

impl TaskRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        let description = summarize(&prompt);
        Self {
            prompt,
            description,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

fn summarize(prompt: &str) -> String {
    const LIMIT: usize = 80;
    let line = prompt.lines().next().unwrap_or_default().trim();
    if line.chars().count() <= LIMIT {
        line.to_string()
    } else {
        let truncated: String = line.chars().take(LIMIT).collect();
        format!("{truncated}…")
    }
}

/// Output of a single agentic-loop run. Running out of turns is normal
/// completion: the last model response stands.
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    pub success: bool,
    pub response: String,
    pub turns: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dispatches: Vec<DispatchResult>,
}

impl TaskResult {
    pub(crate) fn completed(response: String, turns: usize, dispatches: Vec<DispatchResult>) -> Self {
        Self {
            success: true,
            response,
            turns,
            error: None,
            dispatches,
        }
    }

    pub(crate) fn failed(error: String, turns: usize, dispatches: Vec<DispatchResult>) -> Self {
        Self {
            success: false,
            response: String::new(),
            turns,
            error: Some(error),
            dispatches,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// A settled task will never change status again.
    pub fn is_settled(self) -> bool {
        !matches!(self, TaskStatus::Pending | TaskStatus::Running)
    }
}

/// Supervisor-owned record of one background run. Mutated only by the
/// supervisor; retained until explicitly queried (no automatic eviction).
#[derive(Debug, Clone, Serialize)]
pub struct BackgroundTask {
    pub task_id: String,
    pub description: String,
    pub subagent: String,
    pub status: TaskStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
}
