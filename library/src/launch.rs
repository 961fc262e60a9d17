//! Wiring: config overrides, service construction and the subcommands

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use retroplay_core::config::{self, Config};
use retroplay_core::{
    CheatEngine, DeviceRegistry, PadTable, Platform, RenderLoop, SaveCoordinator, SystemShell,
};
use retroplay_shared::title::TitleInfo;
use tracing::info;

use crate::cli::{CheatsAction, Cli, SavesAction, resolve_title};
use crate::desktop::DesktopFrontend;

/// Load the config file, then apply command line overrides.
pub fn load_config(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => config::load_from(path),
        None => config::load(),
    };
    if let Some(dir) = &cli.saves_dir {
        config.saves.dir = Some(dir.clone());
    }
    if let Some(dir) = &cli.cheats_dir {
        config.cheats.dir = Some(dir.clone());
    }
    if let Some(scale) = cli.scale {
        config.video.scale = scale;
    }
    if cli.no_gamepad {
        config.devices.gamepad = false;
    }
    config
}

/// Build the session services and the loop that owns them.
pub fn build_session(config: Config) -> RenderLoop {
    let pads = PadTable::new();
    let saves = SaveCoordinator::new(&config.saves);
    let cheats = CheatEngine::new(&config.cheats);
    let devices = DeviceRegistry::new(
        &config.devices,
        Arc::new(pads.clone()),
        Arc::new(SystemShell),
        Platform::current(),
    );
    let gamepad = config.devices.gamepad;
    let session = RenderLoop::new(config, saves, cheats, devices);

    #[cfg(feature = "gamepad")]
    if gamepad && let Some(pump) = retroplay_core::GamepadPump::new(pads) {
        return session.with_gamepad(pump);
    }
    #[cfg(not(feature = "gamepad"))]
    let _ = (gamepad, pads);

    session
}

/// Open the window and play until it closes.
pub fn play(config: Config, rom: Option<&Path>) -> Result<()> {
    let scale = config.video.scale;
    let mut session = build_session(config);

    if let Some(path) = rom {
        let info = TitleInfo::from_rom_path(path);
        session
            .load_title(info)
            .with_context(|| format!("failed to load {}", path.display()))?;
    } else {
        info!("No ROM given, waiting in an empty window");
    }

    let mut frontend = DesktopFrontend::new(scale)?;
    session.run(&mut frontend)
}

pub fn saves(config: &Config, action: &SavesAction, out: &mut impl Write) -> Result<()> {
    let saves = SaveCoordinator::new(&config.saves);
    match action {
        SavesAction::List { title } => {
            let title = resolve_title(title);
            writeln!(out, "Saves for {} in {}", title, saves.dir().display())?;
            for (slot, listing) in saves.list(&title) {
                match (listing.exists, listing.datetime) {
                    (true, Some(datetime)) => {
                        writeln!(out, "  slot {}: {} ({} bytes)", slot, datetime, listing.size)?
                    }
                    (true, None) => writeln!(out, "  slot {}: ({} bytes)", slot, listing.size)?,
                    (false, _) => writeln!(out, "  slot {}: empty", slot)?,
                }
            }
        }
        SavesAction::Delete { title, slot } => {
            let title = resolve_title(title);
            saves
                .delete(&title, *slot)
                .with_context(|| format!("failed to delete slot {} of {}", slot, title))?;
            writeln!(out, "Deleted slot {} of {}", slot, title)?;
        }
    }
    Ok(())
}

pub fn cheats(config: &Config, action: &CheatsAction, out: &mut impl Write) -> Result<()> {
    let cheats = CheatEngine::new(&config.cheats);
    match action {
        CheatsAction::List { title } => {
            let title = resolve_title(title);
            let patches = cheats
                .read_table(&title)
                .with_context(|| format!("failed to read cheat table for {}", title))?;
            writeln!(out, "Cheats for {} ({} total)", title, patches.len())?;
            for patch in patches {
                let flag = if patch.auto_enable { " [auto]" } else { "" };
                writeln!(
                    out,
                    "  {}: {} sets {} = {}{}",
                    patch.id, patch.name, patch.target_key, patch.value, flag
                )?;
            }
        }
    }
    Ok(())
}
