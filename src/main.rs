use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use orrery::application::agent::{SubagentDefinition, SubagentRunner, TaskRequest, TaskSupervisor};
use orrery::application::dispatch::ToolDispatcher;
use orrery::application::registry::CapabilityRegistry;
use orrery::application::tooling::NullRemoteService;
use orrery::config::AppConfig;
use orrery::infrastructure::model::OllamaClient;
use serde_json::json;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a capable assistant with access to capabilities.";

#[derive(Parser, Debug)]
#[command(name = "orrery", version, about = "Tool-calling agent runtime powered by Ollama")]
struct Cli {
    #[arg(long)]
    model_url: Option<String>,
    #[arg(long)]
    config: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    system: Option<String>,
    /// Named subagent to run the prompt under.
    #[arg(long)]
    subagent: Option<String>,
    #[arg(long)]
    prompt_file: Option<String>,
    prompt: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    info!("Starting orrery");
    let cli = Cli::parse();
    debug!(config = ?cli.config, subagent = ?cli.subagent, "CLI arguments parsed");

    let config_path = cli.config.as_deref().map(Path::new);
    let config = AppConfig::load(config_path)?;
    if let Some(path) = config_path {
        info!(path = %path.display(), "Loaded configuration from file");
    } else {
        info!("Loaded configuration using default path or defaults");
    }

    let model_url = cli.model_url.clone().unwrap_or_else(|| config.model_url.clone());
    debug!(model_url = %model_url, "Creating Ollama provider");
    let provider = Arc::new(OllamaClient::new(model_url));

    let dispatcher = Arc::new(ToolDispatcher::new(
        config.aliases.clone(),
        config.routes.clone(),
        Arc::new(CapabilityRegistry::new()),
        Arc::new(NullRemoteService),
        config.dispatch.clone(),
    ));

    let model = cli.model.clone().unwrap_or_else(|| config.model.clone());
    let runner = Arc::new(SubagentRunner::new(provider, dispatcher, model));

    let system_prompt = cli
        .system
        .clone()
        .or_else(|| config.system_prompt.clone())
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
    let mut definitions: HashMap<String, SubagentDefinition> = config
        .subagents
        .iter()
        .cloned()
        .map(|definition| (definition.name.clone(), definition))
        .collect();
    definitions
        .entry("main".to_string())
        .or_insert_with(|| SubagentDefinition::unrestricted("main", system_prompt));

    let supervisor = TaskSupervisor::new(runner, definitions, config.max_background_tasks);

    let prompt = load_prompt(&cli)?;
    let subagent = cli.subagent.as_deref().unwrap_or("main");
    info!(subagent, "Dispatching prompt through the agentic loop");
    let result = supervisor.run_sync(subagent, TaskRequest::new(prompt)).await?;

    let output = json!({
        "content": result.response,
        "turns": result.turns,
        "dispatches": result.dispatches,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    info!("Run finished");
    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .init();
    });
}

fn load_prompt(cli: &Cli) -> Result<String, Box<dyn Error>> {
    if let Some(path) = &cli.prompt_file {
        info!(path = %path, "Loading prompt from file");
        let content = fs::read_to_string(path)?;
        return Ok(content.trim().to_string());
    }

    if !cli.prompt.is_empty() {
        return Ok(cli.prompt.join(" ").trim().to_string());
    }

    if !io::stdin().is_terminal() {
        info!("Reading prompt from standard input");
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        return Ok(buffer.trim().to_string());
    }

    warn!("Prompt not provided via arguments, file, or stdin");
    Err("prompt required via arguments, file, or stdin".into())
}
