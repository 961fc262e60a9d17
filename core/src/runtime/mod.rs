//! Game loop orchestration
//!
//! [`RenderLoop`] is the only place the game state changes in response to
//! input. It owns the three background services and their workers: they
//! start when a title loads and stop when it unloads or the loop exits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

use retroplay_shared::game_state::GameState;
use retroplay_shared::title::TitleInfo;

use crate::cheat::CheatEngine;
use crate::config::Config;
use crate::device::DeviceRegistry;
#[cfg(feature = "gamepad")]
use crate::device::gamepad::GamepadPump;
use crate::hud::{HudStatus, NOTICE_DURATION, StatusLine};
use crate::input::{ControlState, InputMultiplexer, Key, KeyboardState};
use crate::render::{self, Frame};
use crate::save::{AUTOSAVE_SLOT, SaveCoordinator, SaveError, StateProvider};
use crate::state::{SharedState, unix_now};

mod frontend;
mod game_loop;
pub mod rules;
mod timing;

#[cfg(test)]
mod tests;

pub use timing::TickTiming;
pub use frontend::{Frontend, FrontendEvent};

/// Slots bound to the quick-save hotkeys
pub const QUICK_SLOTS: std::ops::RangeInclusive<u32> = 1..=3;

/// Whether the loop keeps going after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// The single-threaded render/input loop and the services it drives.
pub struct RenderLoop {
    config: Config,
    timing: TickTiming,
    accumulator: Duration,
    last_update: Option<Instant>,

    state: SharedState,
    saves: SaveCoordinator,
    cheats: CheatEngine,
    devices: DeviceRegistry,
    input: InputMultiplexer,
    keyboard: KeyboardState,
    #[cfg(feature = "gamepad")]
    pump: Option<GamepadPump>,

    title: Option<TitleInfo>,
    /// Read by the autosave provider; false while no title is running
    active: Arc<AtomicBool>,
    paused: bool,
    status: StatusLine,
    known_controllers: usize,
    frame: Frame,
}

impl RenderLoop {
    pub fn new(
        config: Config,
        saves: SaveCoordinator,
        cheats: CheatEngine,
        devices: DeviceRegistry,
    ) -> Self {
        let timing = TickTiming::from(&config.video);
        let input = InputMultiplexer::new(config.input.keyboard.clone());

        Self {
            config,
            timing,
            accumulator: Duration::ZERO,
            last_update: None,
            state: SharedState::default(),
            saves,
            cheats,
            devices,
            input,
            keyboard: KeyboardState::new(),
            #[cfg(feature = "gamepad")]
            pump: None,
            title: None,
            active: Arc::new(AtomicBool::new(false)),
            paused: false,
            status: StatusLine::default(),
            known_controllers: 0,
            frame: Frame::new(),
        }
    }

    /// Pump gilrs on the loop thread before every frame.
    #[cfg(feature = "gamepad")]
    pub fn with_gamepad(mut self, pump: GamepadPump) -> Self {
        self.pump = Some(pump);
        self
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn saves(&self) -> &SaveCoordinator {
        &self.saves
    }

    pub fn cheats(&self) -> &CheatEngine {
        &self.cheats
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    pub fn title(&self) -> Option<&TitleInfo> {
        self.title.as_ref()
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn keyboard_mut(&mut self) -> &mut KeyboardState {
        &mut self.keyboard
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status.current()
    }

    pub fn tick_duration(&self) -> Duration {
        self.timing.tick
    }

    // ------------------------------------------------------------------
    // Title lifecycle
    // ------------------------------------------------------------------

    /// Switch to `info`.
    ///
    /// Stops the previous title's workers, resets the game, restores the
    /// autosave slot if configured, then starts autosave, the cheat monitor
    /// and the device monitor, in that order.
    pub fn load_title(&mut self, info: TitleInfo) -> Result<()> {
        self.unload_title();

        self.state.set(GameState::new_game());
        self.paused = false;
        self.accumulator = Duration::ZERO;
        self.last_update = None;
        if self.config.saves.auto_load {
            self.restore_autosave(&info);
        }

        info!("Loading title {} ({})", info.name, info.id);
        self.title = Some(info.clone());
        self.active.store(true, Ordering::SeqCst);

        let provider = self.state_provider();
        self.saves
            .start_autosave(info.id.clone(), provider)
            .context("failed to start autosave worker")?;

        let enabled = self.cheats.auto_enable(&info.id);
        self.cheats
            .start_monitor(self.state.clone())
            .context("failed to start cheat monitor")?;

        let (controllers, audio) = self.devices.auto_connect();
        self.known_controllers = controllers;
        self.devices
            .start_monitor()
            .context("failed to start device monitor")?;

        info!(
            "Title ready: {} cheats enabled, {} controllers, {} audio devices",
            enabled, controllers, audio
        );
        Ok(())
    }

    fn restore_autosave(&mut self, info: &TitleInfo) {
        match self.saves.load(&info.id, AUTOSAVE_SLOT) {
            Ok(state) => {
                info!("Restored autosave for {} (score {})", info.name, state.score);
                self.state.set(state);
                self.status.set("Resumed from autosave");
            }
            Err(SaveError::NotFound { .. }) => {}
            Err(e) => {
                warn!("Could not restore autosave for {}: {}", info.name, e);
                self.status.set("Save unreadable, starting fresh");
            }
        }
    }

    /// Hands the autosave worker a stamped copy of the state while a title runs.
    fn state_provider(&self) -> StateProvider {
        let state = self.state.clone();
        let active = Arc::clone(&self.active);
        Box::new(move || {
            active.load(Ordering::SeqCst).then(|| {
                let mut copy = state.get();
                copy.timestamp = unix_now();
                copy
            })
        })
    }

    fn stop_workers(&mut self) {
        self.saves.stop_autosave();
        self.cheats.stop_monitor();
        self.devices.stop_monitor();
    }

    /// Stop every worker and persist the cheat table. No-op without a title.
    pub fn unload_title(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        self.stop_workers();
        if let Err(e) = self.cheats.unload() {
            warn!("Failed to persist cheats: {}", e);
        }
        if let Some(info) = self.title.take() {
            info!("Unloaded title {}", info.name);
        }
    }

    /// Stop workers in order autosave, cheat monitor, device monitor, then
    /// persist the cheat table.
    pub fn shutdown(&mut self) {
        self.unload_title();
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    pub fn handle_event(&mut self, event: FrontendEvent) -> Flow {
        match event {
            FrontendEvent::Quit => Flow::Quit,
            FrontendEvent::KeyPressed(key) => self.handle_key(key),
        }
    }

    /// Hotkeys. Modifier state comes from the held-key set.
    pub fn handle_key(&mut self, key: Key) -> Flow {
        if key == Key::Escape {
            return Flow::Quit;
        }
        if self.title.is_none() {
            return Flow::Continue;
        }

        match key {
            Key::P => {
                self.paused = !self.paused;
                debug!("Paused: {}", self.paused);
            }
            Key::R => {
                self.state.set(GameState::new_game());
                self.status.set("Game reset");
            }
            Key::F5 => self.quick_save(1),
            Key::F9 => self.quick_load(1),
            _ => {
                if let Some(slot) = key.digit().filter(|d| QUICK_SLOTS.contains(d)) {
                    if self.keyboard.ctrl() {
                        self.quick_save(slot);
                    } else if self.keyboard.alt() {
                        self.quick_load(slot);
                    }
                }
            }
        }
        Flow::Continue
    }

    pub fn quick_save(&mut self, slot: u32) {
        let Some(info) = &self.title else {
            return;
        };
        let mut state = self.state.get();
        state.timestamp = unix_now();
        match self.saves.save(&info.id, slot, &state) {
            Ok(_) => {
                info!("Saved {} to slot {}", info.name, slot);
                self.status.set(format!("Saved to slot {}", slot));
            }
            Err(e) => {
                warn!("Save to slot {} failed: {}", slot, e);
                self.status.set(format!("Save failed: {}", e));
            }
        }
    }

    /// Load `slot`. On failure the current game keeps running.
    pub fn quick_load(&mut self, slot: u32) {
        let Some(info) = &self.title else {
            return;
        };
        match self.saves.load(&info.id, slot) {
            Ok(state) => {
                info!("Loaded {} from slot {}", info.name, slot);
                self.state.set(state);
                self.status.set(format!("Loaded slot {}", slot));
            }
            Err(e) if e.is_missing() => {
                debug!("Slot {} not loadable: {}", slot, e);
                self.status.set(format!("Slot {} is empty", slot));
            }
            Err(e) => {
                warn!("Load from slot {} failed: {}", slot, e);
                self.status.set(format!("Load failed: {}", e));
            }
        }
    }

    /// Keyboard OR the active controller
    pub fn controls(&self) -> ControlState {
        let pad = self
            .devices
            .read_active_input(self.config.devices.active_controller);
        self.input.merge(&self.keyboard, pad)
    }

    // ------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------

    /// One fixed tick with the current input
    pub fn tick(&mut self) {
        let controls = self.controls();
        self.tick_with(controls);
    }

    fn tick_with(&mut self, controls: ControlState) {
        if self.title.is_none() {
            return;
        }
        let paused = self.paused;
        self.state.with(|state| rules::tick(state, controls, paused));
    }

    /// Run the ticks due at `now`. Input is read once for the whole frame.
    pub fn advance(&mut self, now: Instant) -> u32 {
        let controls = self.controls();
        let timing = self.timing;
        let mut accumulator = self.accumulator;
        let mut last_update = self.last_update;
        let ticks = game_loop::execute_frame(
            &timing,
            &mut accumulator,
            &mut last_update,
            now,
            || self.tick_with(controls),
        );
        self.accumulator = accumulator;
        self.last_update = last_update;
        ticks
    }

    pub fn hud(&mut self) -> HudStatus {
        let state = self.state.get();
        let devices = self.devices.status();

        let controllers = devices.controllers.len();
        if self.title.is_some() && controllers != self.known_controllers {
            let change = if controllers > self.known_controllers {
                "Controller connected"
            } else {
                "Controller disconnected"
            };
            self.status.set(change);
            self.known_controllers = controllers;
        }

        let autosaved = self.saves.last_save_time().is_some_and(|at| {
            (Utc::now() - at)
                .to_std()
                .is_ok_and(|age| age < NOTICE_DURATION)
        });

        HudStatus {
            title: self.title.as_ref().map(|t| t.name.clone()),
            score: state.score,
            lives: state.lives,
            level: state.level,
            paused: self.paused,
            cheats_enabled: self.cheats.status().enabled_count,
            controllers,
            audio_sinks: devices.audio_sinks.len(),
            autosaved,
            message: self.status.current().map(str::to_string),
        }
    }

    /// Draw the current state and return the frame with its HUD
    pub fn render(&mut self) -> (&Frame, HudStatus) {
        let hud = self.hud();
        let state = self.state.get();
        render::draw(&mut self.frame, &state, &hud);
        (&self.frame, hud)
    }

    /// Poll, tick, render and present until the front-end quits.
    ///
    /// Workers are shut down on the way out, including on error.
    pub fn run(&mut self, frontend: &mut dyn Frontend) -> Result<()> {
        info!("Render loop running at {} Hz", self.timing.tick_rate);
        let result = self.run_frames(frontend);
        self.shutdown();
        info!("Render loop stopped");
        result
    }

    fn run_frames(&mut self, frontend: &mut dyn Frontend) -> Result<()> {
        loop {
            #[cfg(feature = "gamepad")]
            if let Some(pump) = &mut self.pump {
                pump.pump();
            }

            for event in frontend.poll(&mut self.keyboard) {
                if self.handle_event(event) == Flow::Quit {
                    return Ok(());
                }
            }

            self.advance(Instant::now());

            let (frame, hud) = self.render();
            frontend.present(frame, &hud).context("failed to present frame")?;

            thread::sleep(game_loop::time_to_next_tick(&self.timing, self.accumulator));
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}
