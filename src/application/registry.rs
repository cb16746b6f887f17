//! Local capability registry.
//!
//! Local capabilities are trusted code running in-process; they may enforce
//! their parameter contract up front through [`Capability::validate`].
//! Remote capabilities never appear here.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct CapabilityError(pub String);

impl CapabilityError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Verdict of an up-front parameter check.
#[derive(Debug, Clone)]
pub struct ValidationVerdict {
    pub valid: bool,
    pub reason: Option<String>,
}

impl ValidationVerdict {
    pub fn valid() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

#[async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Optional admissibility check, consulted before `execute`. The default
    /// accepts everything.
    fn validate(&self, _parameters: &Map<String, Value>) -> ValidationVerdict {
        ValidationVerdict::valid()
    }

    async fn execute(&self, parameters: &Map<String, Value>) -> Result<Value, CapabilityError>;
}

#[derive(Debug, Clone)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub description: String,
}

#[derive(Default)]
pub struct CapabilityRegistry {
    entries: HashMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        self.entries
            .insert(capability.name().to_string(), capability);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Capability>> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn descriptors(&self) -> Vec<CapabilityDescriptor> {
        let mut descriptors: Vec<_> = self
            .entries
            .values()
            .map(|capability| CapabilityDescriptor {
                name: capability.name().to_string(),
                description: capability.description().to_string(),
            })
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
