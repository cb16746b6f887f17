use crate::infrastructure::model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("subagent run exceeded its {timeout_ms}ms time budget")]
    Timeout { timeout_ms: u64 },
    #[error("no subagent named '{0}' is configured")]
    UnknownSubagent(String),
    #[error("background task limit reached: {0} tasks already running")]
    TaskLimit(usize),
    #[error("no task with id '{0}'")]
    UnknownTask(String),
    #[error("timed out after {timeout_ms}ms waiting for task '{task_id}'")]
    WaitTimeout { task_id: String, timeout_ms: u64 },
}
