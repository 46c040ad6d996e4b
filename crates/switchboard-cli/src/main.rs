use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod session;

use config::SwitchboardConfig;

#[derive(Parser)]
#[command(name = "switchboard")]
#[command(version)]
#[command(about = "Switchboard: capacity-aware ticket routing")]
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

    /// List configured agents and the fallback table
    Agents,

    /// Ask the advisory model which agent suits a ticket
    Classify {
        /// low | medium | high
        priority: String,
        /// software | hardware | network
        #[arg(value_name = "TYPE")]
        ticket_type: String,
    },

    /// Run a routing session, reading commands from a script or stdin
    Run {
        /// Command script; stdin when omitted
        script: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config may be missing before `init`; logging still needs a level
    let level = match &cli.command {
        Commands::Init => None,
        _ => SwitchboardConfig::load(&cli.config)
            .ok()
            .map(|cfg| cfg.logging.level),
    };
    init_logging(cli.debug, level.as_deref());

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config).await,
        Commands::Agents => cmd_agents(&cli.config).await,
        Commands::Classify {
            priority,
            ticket_type,
        } => cmd_classify(&cli.config, &priority, &ticket_type).await,
        Commands::Run { script } => cmd_run(&cli.config, script).await,
    }
}

fn init_logging(debug: bool, configured: Option<&str>) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(configured.unwrap_or("info")))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
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
        info!("Created default config at {}", config_path.display());
    }

    println!("Switchboard initialized at {}", config_dir.display());
    println!("Edit {} to configure agents and fallbacks.", config_path.display());
    Ok(())
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = SwitchboardConfig::load(config_path)?;
    println!("{}", toml::to_string_pretty(&cfg)?);
    Ok(())
}

async fn cmd_agents(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = SwitchboardConfig::load(config_path)?;
    let policy = &cfg.routing;

    println!("Agents (capacity {}):", policy.capacity);
    for agent in &policy.agents {
        println!(
            "  {:<12} {:<26} {:<9} max {}",
            agent.name,
            agent.external_id,
            agent.specialization.to_string(),
            agent.effective_capacity(policy.capacity)
        );
    }

    println!("Fallbacks:");
    if policy.fallbacks.is_empty() {
        println!("  (none)");
    }
    for rule in &policy.fallbacks {
        println!(
            "  {:<6} {:<9} -> {}",
            rule.priority.to_string(),
            rule.ticket_type.to_string(),
            rule.agents.join(", ")
        );
    }
    Ok(())
}

async fn cmd_classify(config_path: &Option<PathBuf>, priority: &str, ticket_type: &str) -> Result<()> {
    let cfg = SwitchboardConfig::load(config_path)?;
    let engine = cfg.build_engine()?;
    let classification = engine
        .classify_only(priority, ticket_type)
        .context("Classification failed")?;
    println!("{}", serde_json::to_string_pretty(&classification)?);
    Ok(())
}

async fn cmd_run(config_path: &Option<PathBuf>, script: Option<PathBuf>) -> Result<()> {
    let cfg = SwitchboardConfig::load(config_path)?;
    let engine = cfg.build_engine()?;
    let stdout = tokio::io::stdout();

    let summary = match script {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("Failed to open script {}", path.display()))?;
            info!("Running session script {}", path.display());
            session::run(&engine, BufReader::new(file), stdout).await?
        }
        None => session::run(&engine, BufReader::new(tokio::io::stdin()), stdout).await?,
    };

    info!(
        "Session finished: {} commands, {} errors",
        summary.commands, summary.errors
    );
    Ok(())
}
