//! Capability name canonicalization.
//!
//! Models name the same capability in dozens of inconsistent ways. Resolution
//! runs in strict priority order: context rules keyed on parameter shape for
//! a handful of deliberately ambiguous generic names, then the alias table,
//! then the original name unchanged. The whole thing is a pure function of
//! (name, parameter shape), which the allow-list filter in the agent loop
//! relies on.

use serde_json::{Map, Value};
use std::collections::HashMap;

pub struct NameResolver {
    aliases: HashMap<String, String>,
}

impl NameResolver {
    pub fn new(aliases: HashMap<String, String>) -> Self {
        Self { aliases }
    }

    /// Canonicalize `name` given the parameters that accompanied it. Falls
    /// back to the original name when nothing matches; the router decides
    /// what happens to an unresolved name.
    pub fn resolve(&self, name: &str, parameters: &Map<String, Value>) -> String {
        if let Some(contextual) = resolve_contextual(name, parameters) {
            return contextual.to_string();
        }
        self.resolve_alias(name)
            .unwrap_or_else(|| name.to_string())
    }

    /// Alias table lookup only, without the context rules. Tried first under
    /// the normalized form, then the raw form, so that mixed-case
    /// canonical-like names with punctuation still hit.
    pub fn resolve_alias(&self, name: &str) -> Option<String> {
        let normalized = normalize(name);
        self.aliases
            .get(&normalized)
            .or_else(|| self.aliases.get(name))
            .cloned()
    }
}

pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase().replace('-', "_")
}

/// Shape-based disambiguation of generic verbs. Only a hand-picked set of
/// names is eligible; anything else falls through to the alias table.
fn resolve_contextual(name: &str, parameters: &Map<String, Value>) -> Option<&'static str> {
    let has = |keys: &[&str]| keys.iter().any(|key| parameters.contains_key(*key));

    match normalize(name).as_str() {
        "file" | "filesystem" | "fs" => {
            if has(&["content", "data", "text"]) {
                Some("write_file")
            } else if path_looks_like_file(parameters) {
                Some("read_file")
            } else {
                Some("list_directory")
            }
        }
        "search" => {
            if has(&["pattern", "regex", "repo"]) {
                Some("search_code")
            } else if has(&["path", "directory", "glob"]) {
                Some("search_files")
            } else {
                Some("web_search")
            }
        }
        "execute" | "run" => {
            if has(&["command", "cmd"]) {
                Some("run_command")
            } else if has(&["code", "script"]) {
                Some("run_code")
            } else {
                None
            }
        }
        _ => None,
    }
}

fn path_looks_like_file(parameters: &Map<String, Value>) -> bool {
    let Some(path) = parameters
        .get("path")
        .or_else(|| parameters.get("file"))
        .and_then(Value::as_str)
    else {
        return false;
    };
    // A dot in the final segment is the usual tell of a file rather than a
    // directory.
    path.rsplit('/').next().is_some_and(|leaf| leaf.contains('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tables::default_aliases;
    use serde_json::json;

    fn resolver() -> NameResolver {
        NameResolver::new(default_aliases())
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn canonical_names_resolve_to_themselves() {
        let resolver = resolver();
        for name in ["web_search", "read_file", "run_command", "current_time"] {
            assert_eq!(resolver.resolve(name, &Map::new()), name);
        }
    }

    #[test]
    fn resolves_aliases_case_and_separator_insensitively() {
        let resolver = resolver();
        assert_eq!(resolver.resolve("Web-Search", &Map::new()), "web_search");
        assert_eq!(resolver.resolve("LIST_TOOLS", &Map::new()), "list_capabilities");
        assert_eq!(resolver.resolve("fs.read", &Map::new()), "read_file");
    }

    #[test]
    fn filesystem_name_resolves_by_parameter_shape() {
        let resolver = resolver();
        assert_eq!(
            resolver.resolve("file", &params(json!({"path": "a.txt", "content": "hi"}))),
            "write_file"
        );
        assert_eq!(
            resolver.resolve("filesystem", &params(json!({"path": "src/main.rs"}))),
            "read_file"
        );
        assert_eq!(
            resolver.resolve("fs", &params(json!({"path": "src"}))),
            "list_directory"
        );
    }

    #[test]
    fn search_name_resolves_by_domain_keys() {
        let resolver = resolver();
        assert_eq!(
            resolver.resolve("search", &params(json!({"pattern": "fn main"}))),
            "search_code"
        );
        assert_eq!(
            resolver.resolve("search", &params(json!({"glob": "*.rs"}))),
            "search_files"
        );
        assert_eq!(
            resolver.resolve("search", &params(json!({"query": "weather"}))),
            "web_search"
        );
    }

    #[test]
    fn unknown_names_pass_through_unchanged() {
        let resolver = resolver();
        assert_eq!(
            resolver.resolve("summon_dragon", &Map::new()),
            "summon_dragon"
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let resolver = resolver();
        let shape = params(json!({"command": "ls"}));
        let first = resolver.resolve("run", &shape);
        let second = resolver.resolve("run", &shape);
        assert_eq!(first, second);
        assert_eq!(first, "run_command");
    }
}
