use async_trait::async_trait;
use serde_json::Value;

use super::error::RemoteCallError;

/// Outcome of a single remote capability invocation. A transport that reaches
/// the service but is refused by it reports `success: false` here rather than
/// an `Err`; only connectivity-level problems surface as `RemoteCallError`.
#[derive(Debug, Clone)]
pub struct RemoteResponse {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl RemoteResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RemoteCapabilityInfo {
    pub name: String,
    pub description: Option<String>,
}

/// Boundary to whatever owns remote capability execution. Discovery is used
/// only for advertising capabilities to the model; dispatch correctness never
/// depends on it.
#[async_trait]
pub trait RemoteServiceInterface: Send + Sync {
    async fn call(
        &self,
        service: &str,
        capability: &str,
        parameters: Value,
    ) -> Result<RemoteResponse, RemoteCallError>;

    async fn discover(&self, service: &str) -> Option<Vec<RemoteCapabilityInfo>>;
}

/// Stand-in used when no remote transport has been wired up. Every call fails
/// with `NotConfigured`, which the executor turns into an ordinary failure
/// result.
pub struct NullRemoteService;

#[async_trait]
impl RemoteServiceInterface for NullRemoteService {
    async fn call(
        &self,
        service: &str,
        _capability: &str,
        _parameters: Value,
    ) -> Result<RemoteResponse, RemoteCallError> {
        Err(RemoteCallError::NotConfigured {
            service: service.to_string(),
        })
    }

    async fn discover(&self, _service: &str) -> Option<Vec<RemoteCapabilityInfo>> {
        None
    }
}
