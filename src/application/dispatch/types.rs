use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionSource {
    Local,
    Remote,
}

/// A fully resolved, routed invocation. Immutable once produced; consumed
/// exactly once by the batch executor.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub parameters: Map<String, Value>,
    pub source: ExecutionSource,
    pub service: Option<String>,
}

/// One outcome per [`ToolCall`]; never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub call_id: String,
    pub name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    pub source: ExecutionSource,
}

impl ToolResult {
    pub(crate) fn completed(call: &ToolCall, data: Value, duration_ms: u64) -> Self {
        Self {
            call_id: call.id.clone(),
            name: call.name.clone(),
            success: true,
            data: Some(data),
            error: None,
            duration_ms,
            source: call.source,
        }
    }

    pub(crate) fn failed(call: &ToolCall, error: &DispatchError, duration_ms: u64) -> Self {
        Self {
            call_id: call.id.clone(),
            name: call.name.clone(),
            success: false,
            data: None,
            error: Some(error.to_string()),
            duration_ms,
            source: call.source,
        }
    }
}

/// Aggregate of one dispatch invocation. `success` is the AND of every
/// per-call result; the group counters are observability only.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchResult {
    pub success: bool,
    pub results: Vec<ToolResult>,
    pub total_duration_ms: u64,
    pub parallel_groups: usize,
    pub sequential_groups: usize,
}

impl DispatchResult {
    pub fn failed_names(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|result| !result.success)
            .map(|result| result.name.as_str())
            .collect()
    }
}

/// Per-call failure classes. These are captured into [`ToolResult`] entries
/// inside the executor and never thrown past it.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown capability '{0}': no local or remote binding")]
    UnknownCapability(String),
    #[error("capability '{0}' is not bound to any remote service")]
    MissingServiceBinding(String),
    #[error("invalid parameters for '{name}': {reason}")]
    ValidationFailed { name: String, reason: String },
    #[error("capability '{name}' failed: {message}")]
    ExecutionFailed { name: String, message: String },
    #[error("capability '{name}' timed out after {timeout_ms}ms")]
    Timeout { name: String, timeout_ms: u64 },
}

/// A call that survived routing, paired against one that was rejected before
/// execution. Rejected entries keep their slot so the result list always
/// matches the input call list in length and order.
#[derive(Debug)]
pub(crate) enum PreparedCall {
    Ready(ToolCall),
    Rejected(ToolResult),
}
