//! Bounded-parallel batch execution.
//!
//! Calls are chunked positionally into groups of at most `max_parallel`.
//! Groups run strictly sequentially; within a group every call runs
//! concurrently and the group completes only once each member has produced a
//! result. A failing call never aborts its siblings.

use chrono::Utc;
use futures::future::join_all;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::router::{is_pseudo_capability, Router};
use super::types::{DispatchError, DispatchResult, ExecutionSource, PreparedCall, ToolCall, ToolResult};
use crate::application::registry::CapabilityRegistry;
use crate::application::tooling::{RemoteCallError, RemoteServiceInterface};

pub(crate) struct BatchExecutor<'a> {
    registry: &'a CapabilityRegistry,
    remote: &'a dyn RemoteServiceInterface,
    router: &'a Router,
    call_timeout: Duration,
    verbose: bool,
}

impl<'a> BatchExecutor<'a> {
    pub(crate) fn new(
        registry: &'a CapabilityRegistry,
        remote: &'a dyn RemoteServiceInterface,
        router: &'a Router,
        call_timeout: Duration,
        verbose: bool,
    ) -> Self {
        Self {
            registry,
            remote,
            router,
            call_timeout,
            verbose,
        }
    }

    pub(crate) async fn run(&self, calls: Vec<PreparedCall>, max_parallel: usize) -> DispatchResult {
        let started = Instant::now();
        let max_parallel = max_parallel.max(1);
        let total = calls.len();

        let mut results: Vec<ToolResult> = Vec::with_capacity(total);
        let mut parallel_groups = 0;
        let mut sequential_groups = 0;

        let mut remaining = calls;
        while !remaining.is_empty() {
            let rest = remaining.split_off(remaining.len().min(max_parallel));
            let group = std::mem::replace(&mut remaining, rest);
            if group.len() > 1 {
                parallel_groups += 1;
            } else {
                sequential_groups += 1;
            }

            let futures = group.into_iter().map(|prepared| async move {
                match prepared {
                    PreparedCall::Rejected(result) => result,
                    PreparedCall::Ready(call) => self.execute_one(call).await,
                }
            });
            results.extend(join_all(futures).await);
        }

        let success = results.iter().all(|result| result.success);
        debug!(
            calls = total,
            parallel_groups, sequential_groups, success, "Dispatch batch finished"
        );

        DispatchResult {
            success,
            results,
            total_duration_ms: started.elapsed().as_millis() as u64,
            parallel_groups,
            sequential_groups,
        }
    }

    async fn execute_one(&self, call: ToolCall) -> ToolResult {
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.call_timeout, self.invoke(&call)).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(Ok(data)) => ToolResult::completed(&call, data, duration_ms),
            Ok(Err(error)) => {
                warn!(capability = %call.name, %error, "Capability call failed");
                ToolResult::failed(&call, &error, duration_ms)
            }
            Err(_) => {
                let error = DispatchError::Timeout {
                    name: call.name.clone(),
                    timeout_ms: self.call_timeout.as_millis() as u64,
                };
                warn!(capability = %call.name, %error, "Capability call timed out");
                ToolResult::failed(&call, &error, duration_ms)
            }
        };

        if self.verbose {
            info!(
                capability = %result.name,
                success = result.success,
                duration_ms = result.duration_ms,
                "Capability executed"
            );
        }
        result
    }

    async fn invoke(&self, call: &ToolCall) -> Result<Value, DispatchError> {
        match call.source {
            ExecutionSource::Local => {
                if is_pseudo_capability(&call.name) {
                    return Ok(self.answer_pseudo(&call.name));
                }
                let Some(capability) = self.registry.get(&call.name) else {
                    return Err(DispatchError::UnknownCapability(call.name.clone()));
                };
                capability
                    .execute(&call.parameters)
                    .await
                    .map_err(|source| DispatchError::ExecutionFailed {
                        name: call.name.clone(),
                        message: source.to_string(),
                    })
            }
            ExecutionSource::Remote => {
                let Some(service) = call.service.as_deref() else {
                    return Err(DispatchError::MissingServiceBinding(call.name.clone()));
                };
                let parameters = Value::Object(call.parameters.clone());
                let response = self
                    .remote
                    .call(service, &call.name, parameters)
                    .await
                    .map_err(|source| match source {
                        RemoteCallError::NotConfigured { .. } => {
                            DispatchError::MissingServiceBinding(call.name.clone())
                        }
                        other => DispatchError::ExecutionFailed {
                            name: call.name.clone(),
                            message: other.to_string(),
                        },
                    })?;
                if response.success {
                    Ok(response.data.unwrap_or(Value::Null))
                } else {
                    Err(DispatchError::ExecutionFailed {
                        name: call.name.clone(),
                        message: response
                            .error
                            .unwrap_or_else(|| "remote service reported failure".to_string()),
                    })
                }
            }
        }
    }

    fn answer_pseudo(&self, name: &str) -> Value {
        match name {
            "current_time" => {
                let now = Utc::now();
                json!({
                    "iso": now.to_rfc3339(),
                    "unix": now.timestamp(),
                })
            }
            "list_capabilities" => {
                let local: Vec<Value> = self
                    .registry
                    .descriptors()
                    .into_iter()
                    .map(|descriptor| {
                        json!({
                            "name": descriptor.name,
                            "description": descriptor.description,
                        })
                    })
                    .collect();
                let mut remote: Vec<Value> = self
                    .router
                    .remote_bindings()
                    .map(|(name, service)| json!({ "name": name, "service": service }))
                    .collect();
                remote.sort_by_key(|entry| entry["name"].as_str().map(String::from));
                json!({ "local": local, "remote": remote })
            }
            other => json!({ "error": format!("unhandled pseudo capability '{other}'") }),
        }
    }
}
