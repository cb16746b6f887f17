//! Background task supervision.
//!
//! Tracks spawned subagent runs by id, enforces a ceiling on concurrently
//! running tasks, and exposes poll, wait, and cancel operations. Cancellation
//! is a bookkeeping transition; a task already executing finishes its work
//! but its result is discarded.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::definition::SubagentDefinition;
use super::errors::AgentError;
use super::models::{BackgroundTask, TaskRequest, TaskResult, TaskStatus};
use super::runner::SubagentRunner;

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct TaskSupervisor {
    runner: Arc<SubagentRunner>,
    definitions: HashMap<String, SubagentDefinition>,
    tasks: Arc<Mutex<HashMap<String, BackgroundTask>>>,
    max_running: usize,
}

impl TaskSupervisor {
    pub fn new(
        runner: Arc<SubagentRunner>,
        definitions: HashMap<String, SubagentDefinition>,
        max_running: usize,
    ) -> Self {
        Self {
            runner,
            definitions,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            max_running,
        }
    }

    pub fn definitions(&self) -> impl Iterator<Item = &SubagentDefinition> {
        self.definitions.values()
    }

    fn definition(&self, subagent: &str) -> Result<&SubagentDefinition, AgentError> {
        self.definitions
            .get(subagent)
            .ok_or_else(|| AgentError::UnknownSubagent(subagent.to_string()))
    }

    /// Runs a subagent to completion on the caller's task.
    pub async fn run_sync(
        &self,
        subagent: &str,
        request: TaskRequest,
    ) -> Result<TaskResult, AgentError> {
        let definition = self.definition(subagent)?.clone();
        self.runner.run(&definition, &request).await
    }

    /// Spawns a subagent run in the background and returns its task id.
    pub async fn submit_background(
        &self,
        subagent: &str,
        request: TaskRequest,
    ) -> Result<String, AgentError> {
        let definition = self.definition(subagent)?.clone();

        let task_id = Uuid::new_v4().to_string();
        {
            let mut tasks = self.tasks.lock().await;
            let active = tasks
                .values()
                .filter(|task| matches!(task.status, TaskStatus::Pending | TaskStatus::Running))
                .count();
            if active >= self.max_running {
                warn!(active, limit = self.max_running, "Background task ceiling reached");
                return Err(AgentError::TaskLimit(self.max_running));
            }
            tasks.insert(
                task_id.clone(),
                BackgroundTask {
                    task_id: task_id.clone(),
                    description: request.description.clone(),
                    subagent: subagent.to_string(),
                    status: TaskStatus::Pending,
                    started_at: Utc::now(),
                    finished_at: None,
                    result: None,
                },
            );
        }

        let runner = Arc::clone(&self.runner);
        let tasks = Arc::clone(&self.tasks);
        let id = task_id.clone();
        tokio::spawn(async move {
            {
                let mut guard = tasks.lock().await;
                if let Some(task) = guard.get_mut(&id) {
                    if task.status != TaskStatus::Pending {
                        // Cancelled before it ever started.
                        return;
                    }
                    task.status = TaskStatus::Running;
                }
            }

            let outcome = runner.run(&definition, &request).await;

            let mut guard = tasks.lock().await;
            if let Some(task) = guard.get_mut(&id) {
                if task.status != TaskStatus::Running {
                    debug!(task_id = %id, "Discarding result of a cancelled task");
                    return;
                }
                task.finished_at = Some(Utc::now());
                match outcome {
                    Ok(result) => {
                        task.status = if result.success {
                            TaskStatus::Completed
                        } else {
                            TaskStatus::Failed
                        };
                        task.result = Some(result);
                    }
                    Err(error) => {
                        task.status = TaskStatus::Failed;
                        task.result = Some(TaskResult::failed(error.to_string(), 0, Vec::new()));
                    }
                }
            }
        });

        info!(task_id = %task_id, subagent, "Background task submitted");
        Ok(task_id)
    }

    pub async fn get_task(&self, task_id: &str) -> Result<BackgroundTask, AgentError> {
        let tasks = self.tasks.lock().await;
        tasks
            .get(task_id)
            .cloned()
            .ok_or_else(|| AgentError::UnknownTask(task_id.to_string()))
    }

    /// Snapshot of every tracked task, newest first.
    pub async fn list_tasks(&self) -> Vec<BackgroundTask> {
        let tasks = self.tasks.lock().await;
        let mut snapshot: Vec<BackgroundTask> = tasks.values().cloned().collect();
        snapshot.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        snapshot
    }

    /// Polls until the task settles or the deadline passes.
    pub async fn wait_for_task(
        &self,
        task_id: &str,
        timeout: Duration,
    ) -> Result<BackgroundTask, AgentError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let task = self.get_task(task_id).await?;
            if task.status.is_settled() {
                return Ok(task);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AgentError::WaitTimeout {
                    task_id: task_id.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    /// Marks a pending or running task as cancelled. Settled tasks are left alone.
    pub async fn cancel_task(&self, task_id: &str) -> Result<BackgroundTask, AgentError> {
        let mut tasks = self.tasks.lock().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| AgentError::UnknownTask(task_id.to_string()))?;
        if !task.status.is_settled() {
            task.status = TaskStatus::Cancelled;
            task.finished_at = Some(Utc::now());
            info!(task_id, "Background task cancelled");
        }
        Ok(task.clone())
    }
}
