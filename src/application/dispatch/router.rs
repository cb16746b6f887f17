//! Local/remote routing of canonical capability names.

use std::collections::HashMap;

use super::resolver::NameResolver;
use crate::application::registry::CapabilityRegistry;

/// Internal pseudo-capabilities the executor answers inline, without a
/// registry entry or a service binding.
pub const PSEUDO_CAPABILITIES: &[&str] = &["current_time", "list_capabilities"];

pub fn is_pseudo_capability(name: &str) -> bool {
    PSEUDO_CAPABILITIES.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Local,
    Remote { service: String },
}

pub struct Router {
    routes: HashMap<String, String>,
}

impl Router {
    pub fn new(routes: HashMap<String, String>) -> Self {
        Self { routes }
    }

    /// Decide where `name` executes. Unknown names deliberately route local
    /// so they fail with a clear "unknown capability" error instead of being
    /// dropped.
    pub fn route(
        &self,
        name: &str,
        registry: &CapabilityRegistry,
        resolver: &NameResolver,
    ) -> Route {
        if is_pseudo_capability(name) {
            return Route::Local;
        }
        if registry.contains(name) {
            return Route::Local;
        }
        if let Some(service) = self.routes.get(name) {
            return Route::Remote {
                service: service.clone(),
            };
        }
        // One more alias pass covers names that reached the router without
        // ever matching the alias table (e.g. a raw name a context rule
        // ignored).
        if let Some(alias) = resolver.resolve_alias(name) {
            if let Some(service) = self.routes.get(&alias) {
                return Route::Remote {
                    service: service.clone(),
                };
            }
        }
        Route::Local
    }

    /// Remote bindings, for capability advertising.
    pub fn remote_bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.routes
            .iter()
            .map(|(name, service)| (name.as_str(), service.as_str()))
    }
}
