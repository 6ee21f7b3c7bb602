use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nexusflow_core::providers::{FALLBACK_MODELS, OllamaProvider, ProviderKind};
use nexusflow_core::{AgentMode, AgentRouter, OrchestrationResult, profile};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod session;

use config::NexusConfig;
use session::{ChatSession, parse_agent, parse_command};

#[derive(Parser)]
#[command(name = "nexusflow")]
#[command(version)]
#[command(about = "NexusFlow — a multi-agent development team in your terminal")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory and default config
    Init,

    /// Show current configuration
    Config,

    /// Send a one-shot message to an agent
    Ask {
        /// The message to send
        message: String,

        /// Agent to address (defaults to [agents].default_agent)
        #[arg(short, long)]
        agent: Option<String>,
    },

    /// Interactive chat with the agent team
    Chat,

    /// List models installed in the local backend
    Models,

    /// Check the configured backend is ready (API key or installed models)
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config).await,
        Commands::Ask { message, agent } => cmd_ask(&cli.config, &message, agent.as_deref()).await,
        Commands::Chat => cmd_chat(&cli.config).await,
        Commands::Models => cmd_models(&cli.config).await,
        Commands::Doctor => cmd_doctor(&cli.config).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        let default_config = include_str!("../../../config/default.toml");
        tokio::fs::write(&config_path, default_config).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&config_path, std::fs::Permissions::from_mode(0o600))
                .await?;
        }
        info!("Created default config at {}", config_path.display());
    }

    println!("NexusFlow initialized at {}", config_dir.display());
    println!(
        "Edit {} to choose a backend and set GOOGLE_AI_API_KEY for the cloud provider.",
        config_path.display()
    );
    Ok(())
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = NexusConfig::load(config_path)?;
    println!("{}", toml::to_string_pretty(&cfg.redacted())?);
    Ok(())
}

/// Router and initial session for routed commands
fn build_session(cfg: &NexusConfig, agent: AgentMode) -> Result<(AgentRouter, ChatSession)> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let router = AgentRouter::from_settings(cfg.router_settings(), cfg.api_key());
    let session = ChatSession::new(agent, cfg.initial_tools(&cwd), cfg.project.summary.clone());
    Ok((router, session))
}

async fn cmd_ask(config_path: &Option<PathBuf>, message: &str, agent: Option<&str>) -> Result<()> {
    let cfg = NexusConfig::load(config_path)?;
    let agent = match agent {
        Some(id) => parse_agent(id).map_err(anyhow::Error::msg)?,
        None => cfg.agents.default_agent,
    };

    let (router, mut session) = build_session(&cfg, agent)?;
    let result = router.route(&session.request(message)).await;
    session.record(message, &result);
    print_result(agent, &result);

    if result.is_error {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_chat(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = NexusConfig::load(config_path)?;
    let (router, mut session) = build_session(&cfg, cfg.agents.default_agent)?;

    info!(
        "Chat started: provider={}, agent={}",
        router.settings().provider,
        session.agent()
    );
    if session.tools().any_active() {
        info!("Tools active at startup; type /tools for details");
    }
    println!("NexusFlow chat. Type /help for commands, /quit to leave.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let prompt = format!("{}> ", profile(session.agent()).display_name);
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_command(line) {
            Some(Ok(command)) => match session.apply(command) {
                Some(text) => println!("{}\n", text),
                None => break,
            },
            Some(Err(usage)) => println!("{}\n", usage),
            None => {
                let agent = session.agent();
                let result = router.route(&session.request(line)).await;
                session.record(line, &result);
                print_result(agent, &result);
            }
        }
    }

    if !session.tasks().is_empty() {
        println!("{} task(s) on the board.", session.tasks().len());
    }
    println!("Bye.");
    Ok(())
}

fn print_result(agent: AgentMode, result: &OrchestrationResult) {
    println!("\n[{}]", profile(agent).display_name);
    println!("{}", result.text);

    if let Some(sources) = &result.sources {
        println!("\nSources:");
        for source in sources {
            println!("  - {}", source);
        }
    }

    if let Some(next) = result.suggested_agent.filter(|s| *s != agent) {
        println!(
            "\n>> {} suggests handing off to {}. Type /switch to accept.",
            profile(agent).display_name,
            profile(next).display_name
        );
    }
    println!();
}

async fn cmd_models(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = NexusConfig::load(config_path)?;
    let ollama = OllamaProvider::new(cfg.backend.ollama_url.clone());

    match ollama.list_models().await {
        Ok(models) if !models.is_empty() => {
            println!("Models installed at {}:", ollama.base_url());
            for model in models {
                println!("  {}", model);
            }
        }
        Ok(_) => {
            println!("No models installed at {}. Suggested:", ollama.base_url());
            print_fallback_models();
        }
        Err(e) => {
            warn!("Could not list models from {}: {}", ollama.base_url(), e);
            println!("Could not reach Ollama. Common models:");
            print_fallback_models();
        }
    }
    Ok(())
}

fn print_fallback_models() {
    for model in FALLBACK_MODELS {
        println!("  {}", model);
    }
}

async fn cmd_doctor(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = NexusConfig::load(config_path)?;

    if cfg.backend.provider == ProviderKind::Gemini {
        if cfg.api_key().is_some() {
            println!("Cloud backend ready.");
            return Ok(());
        }
        println!("Cloud backend selected but no API key found. Set GOOGLE_AI_API_KEY.");
        std::process::exit(1);
    }

    let ollama = OllamaProvider::new(cfg.backend.ollama_url.clone());
    let required = [cfg.backend.general_model.as_str(), cfg.backend.coding_model.as_str()];
    match ollama.missing_models(&required).await {
        Ok(missing) if missing.is_empty() => {
            println!("Local backend ready at {}.", ollama.base_url());
            Ok(())
        }
        Ok(missing) => {
            println!("Local backend is missing models:");
            for model in &missing {
                println!("  ollama pull {}", model);
            }
            std::process::exit(1);
        }
        Err(e) => {
            println!(
                "Could not reach Ollama at {}: {}\nEnsure Ollama is running and OLLAMA_ORIGINS=\"*\" is set.",
                ollama.base_url(),
                e
            );
            std::process::exit(1);
        }
    }
}
