pub mod tables;

use crate::application::agent::{AllowedCapabilities, SubagentDefinition};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_MODEL: &str = "llama3";
const DEFAULT_MODEL_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_CONFIG_PATH: &str = "config/orrery.toml";

const DEFAULT_MAX_PARALLEL: usize = 4;
const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_HISTORY_LIMIT: usize = 256;
const DEFAULT_MAX_BACKGROUND_TASKS: usize = 8;
const DEFAULT_SUBAGENT_TIMEOUT_MS: u64 = 120_000;
const DEFAULT_SUBAGENT_MAX_TURNS: usize = 8;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: String,
    pub model_url: String,
    pub system_prompt: Option<String>,
    pub dispatch: DispatchSettings,
    pub aliases: HashMap<String, String>,
    pub routes: HashMap<String, String>,
    pub subagents: Vec<SubagentDefinition>,
    pub max_background_tasks: usize,
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub max_parallel: usize,
    pub call_timeout: Duration,
    pub history_limit: usize,
    pub verbose: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_parallel: DEFAULT_MAX_PARALLEL,
            call_timeout: Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS),
            history_limit: DEFAULT_HISTORY_LIMIT,
            verbose: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    model: Option<String>,
    model_url: Option<String>,
    system_prompt: Option<String>,
    #[serde(default)]
    dispatch: RawDispatch,
    #[serde(default)]
    aliases: HashMap<String, String>,
    #[serde(default)]
    routes: HashMap<String, String>,
    #[serde(default)]
    subagents: Vec<RawSubagent>,
    max_background_tasks: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct RawDispatch {
    max_parallel: Option<usize>,
    call_timeout_ms: Option<u64>,
    history_limit: Option<usize>,
    verbose: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawSubagent {
    name: String,
    system_prompt: String,
    #[serde(default)]
    allowed: RawAllowed,
    model: Option<String>,
    timeout_ms: Option<u64>,
    max_turns: Option<usize>,
}

/// `allowed = "*"` or `allowed = ["read_file", "web_search"]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAllowed {
    Wildcard(String),
    Names(Vec<String>),
}

impl Default for RawAllowed {
    fn default() -> Self {
        RawAllowed::Wildcard("*".to_string())
    }
}

impl From<RawAllowed> for AllowedCapabilities {
    fn from(value: RawAllowed) -> Self {
        match value {
            RawAllowed::Wildcard(_) => AllowedCapabilities::All,
            RawAllowed::Names(names) => AllowedCapabilities::List(names),
        }
    }
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return read_config(path);
        }
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        match read_config(default_path) {
            Ok(config) => Ok(config),
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                info!("Configuration file not found; using defaults");
                Ok(Self::default())
            }
            Err(other) => Err(other),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            model_url: DEFAULT_MODEL_URL.to_string(),
            system_prompt: None,
            dispatch: DispatchSettings::default(),
            aliases: tables::default_aliases(),
            routes: tables::default_routes(),
            subagents: Vec::new(),
            max_background_tasks: DEFAULT_MAX_BACKGROUND_TASKS,
        }
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    debug!(path = %path.display(), "Reading configuration file");
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: RawConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    // File entries extend and override the built-in tables.
    let mut aliases = tables::default_aliases();
    aliases.extend(parsed.aliases);
    let mut routes = tables::default_routes();
    routes.extend(parsed.routes);

    Ok(AppConfig {
        model: parsed.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        model_url: parsed
            .model_url
            .unwrap_or_else(|| DEFAULT_MODEL_URL.to_string()),
        system_prompt: parsed.system_prompt,
        dispatch: DispatchSettings {
            max_parallel: parsed.dispatch.max_parallel.unwrap_or(DEFAULT_MAX_PARALLEL).max(1),
            call_timeout: Duration::from_millis(
                parsed
                    .dispatch
                    .call_timeout_ms
                    .unwrap_or(DEFAULT_CALL_TIMEOUT_MS),
            ),
            history_limit: parsed
                .dispatch
                .history_limit
                .unwrap_or(DEFAULT_HISTORY_LIMIT),
            verbose: parsed.dispatch.verbose.unwrap_or(false),
        },
        aliases,
        routes,
        subagents: parsed.subagents.into_iter().map(SubagentDefinition::from).collect(),
        max_background_tasks: parsed
            .max_background_tasks
            .unwrap_or(DEFAULT_MAX_BACKGROUND_TASKS),
    })
}

impl From<RawSubagent> for SubagentDefinition {
    fn from(value: RawSubagent) -> Self {
        Self {
            name: value.name,
            system_prompt: value.system_prompt,
            allowed: value.allowed.into(),
            model: value.model,
            timeout: Duration::from_millis(
                value.timeout_ms.unwrap_or(DEFAULT_SUBAGENT_TIMEOUT_MS),
            ),
            max_turns: value.max_turns.unwrap_or(DEFAULT_SUBAGENT_MAX_TURNS).max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn returns_default_when_missing() {
        let config = AppConfig::load(Some(Path::new("/nonexistent/orrery.toml")));
        assert!(matches!(config, Err(ConfigError::Io { .. })));

        let defaults = AppConfig::default();
        assert_eq!(defaults.model, DEFAULT_MODEL);
        assert_eq!(defaults.dispatch.max_parallel, DEFAULT_MAX_PARALLEL);
        assert!(defaults.subagents.is_empty());
        assert!(defaults.aliases.contains_key("list_tools"));
    }

    #[test]
    fn reads_dispatch_settings_and_tables() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("orrery.toml");
        let mut file = File::create(&path).expect("create config");
        writeln!(
            file,
            r#"
model = "mistral"

[dispatch]
max_parallel = 2
call_timeout_ms = 500

[aliases]
lookup = "web_search"

[routes]
translate = "language"
"#
        )
        .expect("write");

        let config = AppConfig::load(Some(&path)).expect("load config");
        assert_eq!(config.model, "mistral");
        assert_eq!(config.dispatch.max_parallel, 2);
        assert_eq!(config.dispatch.call_timeout, Duration::from_millis(500));
        // File entries merge over the built-in tables.
        assert_eq!(config.aliases.get("lookup").map(String::as_str), Some("web_search"));
        assert_eq!(config.aliases.get("websearch").map(String::as_str), Some("web_search"));
        assert_eq!(config.routes.get("translate").map(String::as_str), Some("language"));
    }

    #[test]
    fn reads_subagent_definitions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("orrery.toml");
        fs::write(
            &path,
            r#"
[[subagents]]
name = "researcher"
system_prompt = "You research topics."
allowed = ["web_search", "http_get"]
max_turns = 4

[[subagents]]
name = "generalist"
system_prompt = "You do anything."
allowed = "*"
"#,
        )
        .expect("write subagents config");

        let config = AppConfig::load(Some(&path)).expect("load");
        assert_eq!(config.subagents.len(), 2);
        assert_eq!(config.subagents[0].name, "researcher");
        assert_eq!(config.subagents[0].max_turns, 4);
        assert!(matches!(
            config.subagents[0].allowed,
            AllowedCapabilities::List(ref names) if names.len() == 2
        ));
        assert!(matches!(config.subagents[1].allowed, AllowedCapabilities::All));
        assert_eq!(
            config.subagents[1].timeout,
            Duration::from_millis(DEFAULT_SUBAGENT_TIMEOUT_MS)
        );
    }
}
