//! Command line definition

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use retroplay_shared::title::TitleId;

/// Retroplay retro-game session runtime
#[derive(Parser, Debug)]
#[command(name = "retroplay", version)]
#[command(about = "Play a ROM with saves, cheats and controller hotplug", long_about = None)]
pub struct Cli {
    /// ROM file to load; without one the window waits empty
    pub rom: Option<PathBuf>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory for save slots
    #[arg(long, value_name = "DIR")]
    pub saves_dir: Option<PathBuf>,

    /// Directory for cheat tables
    #[arg(long, value_name = "DIR")]
    pub cheats_dir: Option<PathBuf>,

    /// Window scale factor (1-6)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..=6))]
    pub scale: Option<u32>,

    /// Keyboard only, skip controller support
    #[arg(long)]
    pub no_gamepad: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Inspect or delete save slots
    Saves {
        #[command(subcommand)]
        action: SavesAction,
    },
    /// Inspect cheat tables
    Cheats {
        #[command(subcommand)]
        action: CheatsAction,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum SavesAction {
    /// Show every slot of a title
    List {
        /// ROM path or title id
        title: String,
    },
    /// Delete one slot
    Delete {
        /// ROM path or title id
        title: String,
        slot: u32,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum CheatsAction {
    /// Show a title's cheat table
    List {
        /// ROM path or title id
        title: String,
    },
}

/// Resolve a subcommand's title argument.
///
/// An existing file is hashed like a loaded ROM; anything else is taken
/// as a title id.
pub fn resolve_title(arg: &str) -> TitleId {
    let path = Path::new(arg);
    if path.is_file() {
        TitleId::from_rom_path(path)
    } else {
        TitleId::new(arg)
    }
}
