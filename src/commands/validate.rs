use anyhow::Result;

use courtbot_core::config::AppConfig;

pub fn run(config: AppConfig) -> Result<()> {
    let mut problems = 0;

    match config.credentials.validate() {
        Ok(()) => println!("credentials: ok"),
        Err(e) => {
            problems += 1;
            println!("credentials: {}", e);
        }
    }

    if config.reservations.is_empty() {
        println!("reservations: none configured");
    }
    for reservation in &config.reservations {
        match reservation.validate() {
            Ok(()) => println!("{}: ok", reservation.id),
            Err(e) => {
                problems += 1;
                println!("{}: {}", reservation.id, e);
            }
        }
    }

    if problems > 0 {
        anyhow::bail!("{} configuration problem(s)", problems);
    }
    Ok(())
}
