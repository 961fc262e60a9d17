//! Whole-session behavior with every worker running

use retroplay_shared::title::{TitleId, TitleInfo};

use crate::cheat::CheatPatch;
use crate::device::backend::PadTable;
use crate::input::Key;
use crate::runtime::FrontendEvent;
use crate::test_utils::{ScriptedFrontend, test_pad, wait_until};

use super::test_utils::*;

#[test]
fn test_cheat_wins_over_loop_writes() {
    let root = tempfile::tempdir().unwrap();
    let pads = PadTable::new();
    let mut session = session(root.path(), &pads);
    let info = TitleInfo::new(TitleId::new("1111222233334444"), "Shooter");
    session.load_title(info).unwrap();

    session
        .cheats()
        .insert(CheatPatch { enabled: true, ..CheatPatch::new("lives", "Lives", "lives", 99) });

    // The loop keeps knocking lives down; the monitor keeps pinning them
    for _ in 0..5 {
        session.state().with(|state| state.lives = 1);
        assert!(wait_until(|| session.state().get().lives == 99));
    }
}

#[test]
fn test_hotplug_during_play() {
    let root = tempfile::tempdir().unwrap();
    let pads = PadTable::new();
    let mut session = session(root.path(), &pads);
    session
        .load_title(TitleInfo::new(TitleId::new("5555666677778888"), "Shooter"))
        .unwrap();
    assert_eq!(session.hud().controllers, 0);

    let mut pad = test_pad("0", "Nintendo Switch Pro Controller");
    pad.buttons = vec![true, false, false, false];
    pads.upsert(pad);
    assert!(wait_until(|| session.devices().controllers().len() == 1));
    assert!(session.controls().a);

    pads.remove("0");
    assert!(wait_until(|| session.devices().controllers().is_empty()));
    assert!(!session.controls().a);
}

#[test]
fn test_run_then_quit_saves_on_the_way() {
    let root = tempfile::tempdir().unwrap();
    let pads = PadTable::new();
    let mut session = session(root.path(), &pads);
    let info = TitleInfo::new(TitleId::new("9999aaaabbbbcccc"), "Shooter");
    session.load_title(info.clone()).unwrap();
    session.state().with(|state| state.score = 30);

    let mut frontend = ScriptedFrontend::new(vec![
        vec![FrontendEvent::KeyPressed(Key::F5)],
        vec![FrontendEvent::KeyPressed(Key::Escape)],
    ]);
    session.run(&mut frontend).unwrap();

    assert_eq!(frontend.presented, 1);
    assert_eq!(session.saves().load(&info.id, 1).unwrap().score, 30);
    assert!(session.title().is_none());
}
