//! Orrery is a tool-calling orchestration runtime for model-driven agents.
//!
//! The pipeline turns raw model output into executed capability calls:
//! free-text extraction, alias and context-rule name resolution, routing
//! between in-process capabilities and remote services, validated batch
//! execution with bounded parallelism, and result formatting that feeds the
//! outcome back into a bounded agentic loop. Background runs are tracked by
//! a supervisor with poll, wait, and cancel semantics.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::agent::{
    AgentError, AllowedCapabilities, BackgroundTask, SubagentDefinition, SubagentRunner,
    TaskRequest, TaskResult, TaskStatus, TaskSupervisor,
};
pub use application::dispatch::{
    DispatchError, DispatchPhase, DispatchResult, ExecutionSource, NameResolver, ToolCall,
    ToolDispatcher, ToolResult,
};
pub use application::registry::{
    Capability, CapabilityDescriptor, CapabilityError, CapabilityRegistry, ValidationVerdict,
};
pub use application::tooling::{
    NullRemoteService, RemoteCallError, RemoteCapabilityInfo, RemoteResponse,
    RemoteServiceInterface,
};
pub use config::{AppConfig, ConfigError, DispatchSettings};
pub use infrastructure::model::{
    ModelError, ModelProvider, ModelRequest, ModelResponse, OllamaClient, TokenUsage,
};
