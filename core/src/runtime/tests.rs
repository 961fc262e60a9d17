//! Runtime tests

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use retroplay_shared::game_state::GameState;
use retroplay_shared::title::{TitleId, TitleInfo};

use super::*;
use crate::cheat::{CheatPatch, CheatPhase};
use crate::device::audio::Platform;
use crate::device::backend::PadTable;
use crate::test_utils::{ScriptedFrontend, ScriptedShell, test_pad, wait_until};

fn render_loop(dir: &Path, pads: &PadTable) -> RenderLoop {
    let config = Config::default();
    let saves = SaveCoordinator::with_dir(dir.join("saves"), &config.saves)
        .with_autosave_timing(Duration::from_millis(20), Duration::from_millis(20));
    let cheats = CheatEngine::with_dir(dir.join("cheats"), &config.cheats)
        .with_monitor_timing(Duration::from_millis(10), Duration::from_millis(10));
    let devices = DeviceRegistry::new(
        &config.devices,
        Arc::new(pads.clone()),
        Arc::new(ScriptedShell::new()),
        Platform::Other,
    )
    .with_monitor_timing(Duration::from_millis(10), Duration::from_millis(10));
    RenderLoop::new(config, saves, cheats, devices)
}

fn title(id: &str) -> TitleInfo {
    TitleInfo::new(TitleId::new(id), format!("Game {}", id))
}

// ============================================================================
// TickTiming Tests
// ============================================================================

#[test]
fn test_timing_at_sixty_hz() {
    let timing = TickTiming::at_rate(60);
    assert_eq!(timing.tick_rate, 60);
    assert_eq!(timing.tick, Duration::from_secs_f64(1.0 / 60.0));
    assert_eq!(timing.max_delta, Duration::from_millis(100));
    assert!(timing.cpu_budget < timing.tick);
    assert!(timing.cpu_budget > Duration::from_millis(4));
}

#[test]
fn test_timing_from_video() {
    let video = crate::config::VideoConfig {
        tick_rate: 30,
        ..Default::default()
    };
    let timing = TickTiming::from(&video);
    assert_eq!(timing.tick_rate, 30);
    assert_eq!(timing.tick, Duration::from_secs_f64(1.0 / 30.0));
    assert_eq!(timing.max_delta, Duration::from_millis(200));
}

#[test]
fn test_zero_rate_runs_at_one_hz() {
    let timing = TickTiming::at_rate(0);
    assert_eq!(timing.tick_rate, 1);
    assert_eq!(timing.tick, Duration::from_secs(1));
}

// ============================================================================
// Pacing Tests
// ============================================================================

#[test]
fn test_first_frame_runs_one_tick() {
    let timing = TickTiming::at_rate(60);
    let (mut acc, mut last) = (Duration::ZERO, None);
    let mut count = 0;
    let ticks = game_loop::execute_frame(&timing, &mut acc, &mut last, Instant::now(), || count += 1);
    assert_eq!(ticks, 1);
    assert_eq!(count, 1);
}

#[test]
fn test_stall_is_clamped() {
    let timing = TickTiming {
        tick: Duration::from_millis(10),
        max_delta: Duration::from_millis(100),
        ..TickTiming::at_rate(100)
    };
    let start = Instant::now();
    let (mut acc, mut last) = (Duration::ZERO, Some(start));

    // Ten seconds late: only max_delta worth of ticks
    let ticks = game_loop::execute_frame(
        &timing,
        &mut acc,
        &mut last,
        start + Duration::from_secs(10),
        || {},
    );
    assert_eq!(ticks, 10);
}

#[test]
fn test_time_to_next_tick() {
    let timing = TickTiming {
        tick: Duration::from_millis(16),
        ..TickTiming::at_rate(60)
    };
    assert_eq!(game_loop::time_to_next_tick(&timing, Duration::from_millis(10)), Duration::from_millis(6));
    assert_eq!(game_loop::time_to_next_tick(&timing, Duration::from_millis(20)), Duration::ZERO);
}

// ============================================================================
// Title Lifecycle Tests
// ============================================================================

#[test]
fn test_load_title_starts_all_workers() {
    let dir = tempfile::tempdir().unwrap();
    let mut lp = render_loop(dir.path(), &PadTable::new());

    lp.load_title(title("aaaa000000000001")).unwrap();

    assert!(lp.saves().autosave_running());
    assert_eq!(lp.cheats().phase(), CheatPhase::Monitoring);
    assert!(lp.devices().monitoring());
    assert_eq!(lp.state().get(), GameState::new_game());
}

#[test]
fn test_load_title_restores_autosave() {
    let dir = tempfile::tempdir().unwrap();
    let mut lp = render_loop(dir.path(), &PadTable::new());
    let info = title("aaaa000000000002");

    let mut saved = GameState::new_game();
    saved.score = 120;
    lp.saves().save(&info.id, AUTOSAVE_SLOT, &saved).unwrap();

    lp.load_title(info).unwrap();
    assert_eq!(lp.state().get().score, 120);
    assert_eq!(lp.status_message(), Some("Resumed from autosave"));
}

#[test]
fn test_corrupt_autosave_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let mut lp = render_loop(dir.path(), &PadTable::new());
    let info = title("aaaa000000000003");

    std::fs::create_dir_all(dir.path().join("saves")).unwrap();
    std::fs::write(
        dir.path().join("saves/aaaa000000000003_slot_0.save"),
        b"{ definitely not a snapshot",
    )
    .unwrap();

    lp.load_title(info).unwrap();
    assert_eq!(lp.state().get(), GameState::new_game());
    assert_eq!(lp.status_message(), Some("Save unreadable, starting fresh"));
}

#[test]
fn test_switching_titles_keeps_one_worker_each() {
    let dir = tempfile::tempdir().unwrap();
    let mut lp = render_loop(dir.path(), &PadTable::new());

    lp.load_title(title("aaaa000000000004")).unwrap();
    lp.load_title(title("bbbb000000000004")).unwrap();

    assert!(wait_until(|| lp.saves().live_autosave_workers() == 1));
    assert!(wait_until(|| lp.cheats().live_monitor_workers() == 1));
    assert!(wait_until(|| lp.devices().live_monitor_workers() == 1));
    assert_eq!(lp.cheats().title(), Some(&TitleId::new("bbbb000000000004")));
}

#[test]
fn test_autosave_writes_running_state() {
    let dir = tempfile::tempdir().unwrap();
    let mut lp = render_loop(dir.path(), &PadTable::new());
    let info = title("aaaa000000000005");
    lp.load_title(info.clone()).unwrap();

    lp.state().with(|state| state.score = 70);
    assert!(wait_until(|| {
        lp.saves()
            .load(&info.id, AUTOSAVE_SLOT)
            .is_ok_and(|state| state.score == 70 && state.timestamp > 0.0)
    }));
}

#[test]
fn test_cheats_pin_field_while_running() {
    let dir = tempfile::tempdir().unwrap();
    let info = title("aaaa000000000006");
    let patch = CheatPatch {
        auto_enable: true,
        ..CheatPatch::new("lives", "Infinite Lives", "lives", 99)
    };
    std::fs::create_dir_all(dir.path().join("cheats")).unwrap();
    std::fs::write(
        dir.path().join("cheats/aaaa000000000006.json"),
        serde_json::to_vec(&vec![patch]).unwrap(),
    )
    .unwrap();

    let mut lp = render_loop(dir.path(), &PadTable::new());
    lp.load_title(info).unwrap();
    assert!(wait_until(|| lp.state().get().lives == 99));
    assert_eq!(lp.hud().cheats_enabled, 1);
}

#[test]
fn test_shutdown_stops_workers_and_persists_cheats() {
    let dir = tempfile::tempdir().unwrap();
    let mut lp = render_loop(dir.path(), &PadTable::new());
    lp.load_title(title("aaaa000000000007")).unwrap();

    lp.shutdown();
    assert!(!lp.saves().autosave_running());
    assert_eq!(lp.cheats().phase(), CheatPhase::Unloaded);
    assert!(!lp.devices().monitoring());
    assert!(lp.title().is_none());
    assert!(dir.path().join("cheats/aaaa000000000007.json").exists());

    // Second shutdown is a no-op
    lp.shutdown();
}

// ============================================================================
// Input Tests
// ============================================================================

#[test]
fn test_tick_without_title_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let mut lp = render_loop(dir.path(), &PadTable::new());
    lp.tick();
    assert_eq!(lp.state().get().frame_count, 0);
}

#[test]
fn test_keyboard_moves_player() {
    let dir = tempfile::tempdir().unwrap();
    let mut lp = render_loop(dir.path(), &PadTable::new());
    lp.load_title(title("aaaa000000000008")).unwrap();

    lp.keyboard_mut().set(Key::D, true);
    lp.tick();
    let state = lp.state().get();
    assert_eq!(state.player_x, 53);
    assert_eq!(state.frame_count, 1);
}

#[test]
fn test_controller_input_is_merged() {
    let dir = tempfile::tempdir().unwrap();
    let pads = PadTable::new();
    pads.upsert(test_pad("0", "Xbox Wireless Controller"));
    let mut lp = render_loop(dir.path(), &pads);
    lp.load_title(title("aaaa000000000009")).unwrap();

    let mut pad = test_pad("0", "Xbox Wireless Controller");
    pad.hats = vec![(0, 1)];
    pads.upsert(pad);

    // Keyboard right plus pad up
    lp.keyboard_mut().set(Key::Right, true);
    let controls = lp.controls();
    assert!(controls.right && controls.up);

    lp.tick();
    let state = lp.state().get();
    assert_eq!((state.player_x, state.player_y), (53, 197));
}

#[test]
fn test_missing_controller_is_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    let pads = PadTable::new();
    pads.upsert(test_pad("0", "Xbox Wireless Controller"));
    let mut lp = render_loop(dir.path(), &pads);
    lp.load_title(title("aaaa00000000000a")).unwrap();

    pads.remove("0");
    assert_eq!(lp.controls(), ControlState::default());
    lp.tick();
    assert_eq!(lp.state().get().frame_count, 1);
}

// ============================================================================
// Hotkey Tests
// ============================================================================

#[test]
fn test_escape_quits_without_title() {
    let dir = tempfile::tempdir().unwrap();
    let mut lp = render_loop(dir.path(), &PadTable::new());
    assert_eq!(lp.handle_key(Key::Escape), Flow::Quit);
    assert_eq!(lp.handle_event(FrontendEvent::Quit), Flow::Quit);
    assert_eq!(lp.handle_key(Key::P), Flow::Continue);
    assert!(!lp.paused());
}

#[test]
fn test_pause_and_reset() {
    let dir = tempfile::tempdir().unwrap();
    let mut lp = render_loop(dir.path(), &PadTable::new());
    lp.load_title(title("aaaa00000000000b")).unwrap();

    lp.handle_key(Key::P);
    assert!(lp.paused());
    lp.keyboard_mut().set(Key::D, true);
    lp.tick();
    assert_eq!(lp.state().get().player_x, 50);
    lp.handle_key(Key::P);
    assert!(!lp.paused());

    lp.state().with(|state| state.score = 40);
    lp.handle_key(Key::R);
    assert_eq!(lp.state().get(), GameState::new_game());
    assert_eq!(lp.status_message(), Some("Game reset"));
}

#[test]
fn test_quick_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let mut lp = render_loop(dir.path(), &PadTable::new());
    let info = title("aaaa00000000000c");
    lp.load_title(info.clone()).unwrap();

    lp.state().with(|state| state.score = 250);
    lp.handle_key(Key::F5);
    assert_eq!(lp.status_message(), Some("Saved to slot 1"));

    lp.handle_key(Key::R);
    assert_eq!(lp.state().get().score, 0);

    lp.handle_key(Key::F9);
    assert_eq!(lp.state().get().score, 250);
    assert_eq!(lp.status_message(), Some("Loaded slot 1"));
}

#[test]
fn test_modifier_slots() {
    let dir = tempfile::tempdir().unwrap();
    let mut lp = render_loop(dir.path(), &PadTable::new());
    let info = title("aaaa00000000000d");
    lp.load_title(info.clone()).unwrap();

    lp.state().with(|state| state.level = 4);
    lp.keyboard_mut().set(Key::LeftCtrl, true);
    lp.handle_key(Key::Key2);
    lp.keyboard_mut().set(Key::LeftCtrl, false);
    assert!(lp.saves().list(&info.id)[&2].exists);
    assert!(!lp.saves().list(&info.id)[&3].exists);

    lp.handle_key(Key::R);
    lp.keyboard_mut().set(Key::RightAlt, true);
    lp.handle_key(Key::Key2);
    assert_eq!(lp.state().get().level, 4);

    // Unsaved slot leaves the game alone
    lp.handle_key(Key::Key3);
    assert_eq!(lp.state().get().level, 4);
    assert_eq!(lp.status_message(), Some("Slot 3 is empty"));

    // No modifier, no action
    lp.keyboard_mut().set(Key::RightAlt, false);
    lp.handle_key(Key::Key1);
    assert!(!lp.saves().list(&info.id)[&1].exists);
}

// ============================================================================
// HUD / Run Tests
// ============================================================================

#[test]
fn test_hud_reports_state_and_devices() {
    let dir = tempfile::tempdir().unwrap();
    let pads = PadTable::new();
    pads.upsert(test_pad("0", "DualSense"));
    let mut lp = render_loop(dir.path(), &pads);
    lp.load_title(title("aaaa00000000000e")).unwrap();

    let hud = lp.hud();
    assert_eq!(hud.title.as_deref(), Some("Game aaaa00000000000e"));
    assert_eq!((hud.score, hud.lives, hud.level), (0, 3, 1));
    assert_eq!(hud.controllers, 1);
    assert!(!hud.paused);

    pads.remove("0");
    assert!(wait_until(|| lp.devices().controllers().is_empty()));
    let hud = lp.hud();
    assert_eq!(hud.controllers, 0);
    assert_eq!(hud.message.as_deref(), Some("Controller disconnected"));
}

#[test]
fn test_run_presents_until_quit() {
    let dir = tempfile::tempdir().unwrap();
    let mut lp = render_loop(dir.path(), &PadTable::new());
    lp.load_title(title("aaaa00000000000f")).unwrap();

    let mut frontend = ScriptedFrontend::new(vec![
        vec![],
        vec![FrontendEvent::KeyPressed(Key::P)],
        vec![],
    ]);
    lp.run(&mut frontend).unwrap();

    assert_eq!(frontend.presented, 3);
    assert!(frontend.last_hud.unwrap().paused);
    // Exit shuts everything down
    assert!(lp.title().is_none());
    assert!(!lp.saves().autosave_running());
    assert!(!lp.devices().monitoring());
}
