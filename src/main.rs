mod cli;
mod commands;
mod notify;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

// mimalloc keeps memory flat when batch mode fans out many flows.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use courtbot_core::config::AppConfig;

use crate::cli::{Cli, Commands};

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let mut config: AppConfig = toml::from_str(&config_str)?;

    // Environment variable overrides for the common toggles
    if let Ok(v) = std::env::var("COURTBOT_ENDPOINT") {
        config.webdriver.endpoint = v;
    }
    if let Ok(v) = std::env::var("COURTBOT_HEADLESS") {
        config.webdriver.headless = v != "0" && v.to_lowercase() != "false";
    }
    if let Ok(v) = std::env::var("COURTBOT_INSTANT_FILL") {
        config.flow.instant_fill = v != "0" && v.to_lowercase() != "false";
    }
    if let Ok(v) = std::env::var("COURTBOT_DEADLINE_SECONDS") {
        if let Ok(n) = v.parse::<u64>() {
            config.orchestrator.overall_deadline_seconds = n;
        }
    }

    match cli.command {
        Commands::Run { id, deadline, screenshot_dir } => {
            if let Some(n) = deadline {
                config.orchestrator.overall_deadline_seconds = n;
            }
            commands::run::run(config, id, screenshot_dir).await?;
        }
        Commands::Batch { screenshot_dir } => {
            commands::batch::run(config, screenshot_dir).await?;
        }
        Commands::Validate => {
            commands::validate::run(config)?;
        }
    }

    Ok(())
}
