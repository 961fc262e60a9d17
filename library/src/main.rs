//! Retroplay launcher
//!
//! `retroplay game.nes` opens a window and plays. `retroplay saves list
//! game.nes` and friends inspect a title's files and exit.

use anyhow::Result;
use clap::Parser;
use retroplay_launcher::cli::{Cli, Command};
use retroplay_launcher::launch;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = launch::load_config(&cli);
    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Some(Command::Saves { action }) => launch::saves(&config, action, &mut stdout),
        Some(Command::Cheats { action }) => launch::cheats(&config, action, &mut stdout),
        None => {
            tracing::info!("Launching Retroplay");
            launch::play(config, cli.rom.as_deref())
        }
    }
}
