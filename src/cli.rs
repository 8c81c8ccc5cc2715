use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "courtbot", about = "Automated sports-facility reservation runner")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single reservation flow to completion
    Run {
        /// Reservation id from the config file
        #[arg(short, long)]
        id: String,

        /// Overall deadline in seconds (overrides config)
        #[arg(short, long)]
        deadline: Option<u64>,

        /// Directory to drop result screenshots into (enables capture)
        #[arg(long)]
        screenshot_dir: Option<String>,
    },
    /// Run every configured reservation fully in parallel
    Batch {
        /// Directory to drop result screenshots into (enables capture)
        #[arg(long)]
        screenshot_dir: Option<String>,
    },
    /// Validate the config file without touching the network
    Validate,
}
