use anyhow::{bail, Result};

use courtbot_core::config::AppConfig;

use crate::commands::build_orchestrator;

pub async fn run(config: AppConfig, screenshot_dir: Option<String>) -> Result<()> {
    if config.reservations.is_empty() {
        bail!("config has no reservations to run");
    }

    let orchestrator = build_orchestrator(&config, screenshot_dir)?;
    let results = orchestrator.run_batch(&config.reservations).await;

    println!("Batch of {} finished:\n", results.len());
    for (id, status) in &results {
        println!("  {:<24} {}", id, status);
    }

    Ok(())
}
