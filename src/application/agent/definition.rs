use std::time::Duration;

use crate::application::dispatch::NameResolver;

/// Capabilities a subagent run may dispatch. The wildcard admits anything
/// routable; a list admits its canonical members plus anything one alias hop
/// away in either direction, since the model and the operator rarely agree
/// on spelling.
#[derive(Debug, Clone)]
pub enum AllowedCapabilities {
    All,
    List(Vec<String>),
}

impl AllowedCapabilities {
    pub fn permits(&self, canonical: &str, resolver: &NameResolver) -> bool {
        let names = match self {
            AllowedCapabilities::All => return true,
            AllowedCapabilities::List(names) => names,
        };

        if names.iter().any(|name| name == canonical) {
            return true;
        }
        if let Some(target) = resolver.resolve_alias(canonical) {
            if names.iter().any(|name| *name == target) {
                return true;
            }
        }
        names
            .iter()
            .any(|name| resolver.resolve_alias(name).as_deref() == Some(canonical))
    }
}

/// Static description of a restricted subagent. Read-only during execution.
#[derive(Debug, Clone)]
pub struct SubagentDefinition {
    pub name: String,
    pub system_prompt: String,
    pub allowed: AllowedCapabilities,
    pub model: Option<String>,
    pub timeout: Duration,
    pub max_turns: usize,
}

impl SubagentDefinition {
    /// Wildcard definition used when no configured subagent is requested.
    pub fn unrestricted(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            allowed: AllowedCapabilities::All,
            model: None,
            timeout: Duration::from_secs(120),
            max_turns: 8,
        }
    }
}
