use anyhow::{bail, Result};

use courtbot_core::config::AppConfig;
use courtbot_core::types::RunType;

use crate::commands::build_orchestrator;

pub async fn run(config: AppConfig, id: String, screenshot_dir: Option<String>) -> Result<()> {
    let reservation = match config.reservations.iter().find(|r| r.id == id) {
        Some(r) => r.clone(),
        None => bail!("no reservation with id '{}' in config", id),
    };

    let orchestrator = build_orchestrator(&config, screenshot_dir)?;
    let status = orchestrator.run_one(&reservation, RunType::Manual).await;

    if let Some(snapshot) = orchestrator.board().get(&reservation.id) {
        println!("{}: {} (last step: {})", snapshot.id, snapshot.status, snapshot.step);
    } else {
        println!("{}: {}", reservation.id, status);
    }

    Ok(())
}
