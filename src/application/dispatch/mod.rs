//! Call normalization and dispatch engine.
//!
//! Free text or pre-structured calls come in; canonicalized, routed,
//! validated calls run under a parallelism cap; one result per call comes
//! out, in input order, failures included.

mod executor;
pub mod extractor;
mod formatter;
pub mod resolver;
mod router;
mod types;


pub use extractor::{RawCall, StructuredCall, StructuredFunction};
pub use resolver::NameResolver;
pub use router::{is_pseudo_capability, Route, Router, PSEUDO_CAPABILITIES};
pub use types::{DispatchError, DispatchResult, ExecutionSource, ToolCall, ToolResult};

use executor::BatchExecutor;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::debug;
use types::PreparedCall;
use uuid::Uuid;

use crate::application::registry::CapabilityRegistry;
use crate::application::tooling::RemoteServiceInterface;
use crate::config::DispatchSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    Validating,
    Executing,
    Complete,
}

pub type ProgressCallback = Arc<dyn Fn(DispatchPhase) + Send + Sync>;

pub struct ToolDispatcher {
    resolver: NameResolver,
    router: Router,
    registry: Arc<CapabilityRegistry>,
    remote: Arc<dyn RemoteServiceInterface>,
    settings: DispatchSettings,
    history: Mutex<VecDeque<ToolResult>>,
    progress: Option<ProgressCallback>,
}

impl ToolDispatcher {
    pub fn new(
        aliases: HashMap<String, String>,
        routes: HashMap<String, String>,
        registry: Arc<CapabilityRegistry>,
        remote: Arc<dyn RemoteServiceInterface>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            resolver: NameResolver::new(aliases),
            router: Router::new(routes),
            registry,
            remote,
            settings,
            history: Mutex::new(VecDeque::new()),
            progress: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn resolver(&self) -> &NameResolver {
        &self.resolver
    }

    /// Extract every invocation the text contains and dispatch the batch.
    pub async fn dispatch_text(&self, text: &str) -> DispatchResult {
        let calls = extractor::extract_from_text(text, &self.resolver);
        self.dispatch(calls).await
    }

    pub async fn dispatch_structured(&self, calls: Vec<StructuredCall>) -> DispatchResult {
        let calls = extractor::from_structured(calls, &self.resolver);
        self.dispatch(calls).await
    }

    /// Route, validate, and execute a batch of resolved calls. The result
    /// list always has one entry per input call, in input order.
    pub async fn dispatch(&self, calls: Vec<RawCall>) -> DispatchResult {
        self.report(DispatchPhase::Validating);
        let prepared: Vec<PreparedCall> = calls.into_iter().map(|call| self.prepare(call)).collect();

        self.report(DispatchPhase::Executing);
        let executor = BatchExecutor::new(
            &self.registry,
            self.remote.as_ref(),
            &self.router,
            self.settings.call_timeout,
            self.settings.verbose,
        );
        let result = executor.run(prepared, self.settings.max_parallel).await;

        self.record(&result);
        self.report(DispatchPhase::Complete);
        result
    }

    /// Format a dispatch outcome as a context block for the model.
    pub fn format_results(&self, result: &DispatchResult) -> String {
        formatter::format_results(result)
    }

    /// Recent results, oldest first, bounded by the configured history limit.
    pub fn history(&self) -> Vec<ToolResult> {
        self.history
            .lock()
            .expect("dispatch history lock")
            .iter()
            .cloned()
            .collect()
    }

    /// Routing plus the two-tier validation policy: local capabilities may
    /// reject parameters up front, remote ones only need a service binding
    /// (which routing already established).
    fn prepare(&self, call: RawCall) -> PreparedCall {
        // Resolution is idempotent, so calls that already went through the
        // extractor pass through unchanged.
        let name = self.resolver.resolve(&call.name, &call.parameters);
        let route = self.router.route(&name, &self.registry, &self.resolver);
        let (source, service) = match route {
            Route::Local => (ExecutionSource::Local, None),
            Route::Remote { service } => (ExecutionSource::Remote, Some(service)),
        };
        let call = ToolCall {
            id: if call.id.is_empty() {
                Uuid::new_v4().to_string()
            } else {
                call.id
            },
            name,
            parameters: call.parameters,
            source,
            service,
        };

        if call.source == ExecutionSource::Local && !is_pseudo_capability(&call.name) {
            if let Some(capability) = self.registry.get(&call.name) {
                let verdict = capability.validate(&call.parameters);
                if !verdict.valid {
                    let error = DispatchError::ValidationFailed {
                        name: call.name.clone(),
                        reason: verdict
                            .reason
                            .unwrap_or_else(|| "parameters rejected".to_string()),
                    };
                    debug!(capability = %call.name, %error, "Call rejected before execution");
                    return PreparedCall::Rejected(ToolResult::failed(&call, &error, 0));
                }
            }
        }

        PreparedCall::Ready(call)
    }

    fn record(&self, result: &DispatchResult) {
        let mut history = self.history.lock().expect("dispatch history lock");
        for entry in &result.results {
            if history.len() >= self.settings.history_limit {
                history.pop_front();
            }
            history.push_back(entry.clone());
        }
    }

    fn report(&self, phase: DispatchPhase) {
        if let Some(callback) = &self.progress {
            callback(phase);
        }
    }
}
