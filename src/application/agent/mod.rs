mod definition;
mod errors;
mod models;
mod runner;
mod supervisor;

#[cfg(test)]
mod tests;

pub use definition::{AllowedCapabilities, SubagentDefinition};
pub use errors::AgentError;
pub use models::{BackgroundTask, TaskRequest, TaskResult, TaskStatus};
pub use runner::SubagentRunner;
pub use supervisor::TaskSupervisor;
