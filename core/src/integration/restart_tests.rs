//! Progress survives a process restart

use retroplay_shared::game_state::GameState;
use retroplay_shared::title::{TitleId, TitleInfo};

use crate::cheat::{CheatEngine, CheatPatch};
use crate::device::backend::PadTable;
use crate::save::SaveCoordinator;

use super::test_utils::*;

#[test]
fn test_saved_score_survives_restart() {
    let root = tempfile::tempdir().unwrap();
    let config = config_in(root.path());
    let title = TitleId::from_rom_bytes(b"NES\x1a stand-in rom");

    {
        let saves = SaveCoordinator::new(&config.saves);
        let mut state = GameState::new_game();
        state.score = 120;
        saves.save(&title, 0, &state).unwrap();
    }

    // Fresh coordinator, nothing cached
    let saves = SaveCoordinator::new(&config.saves);
    assert_eq!(saves.load(&title, 0).unwrap().score, 120);
    assert_eq!(saves.index(&title).total_saves, 1);
}

#[test]
fn test_session_resumes_where_it_left_off() {
    let root = tempfile::tempdir().unwrap();
    let pads = PadTable::new();
    let info = TitleInfo::new(TitleId::new("0123456789abcdef"), "Stand-in");

    {
        let mut session = session(root.path(), &pads);
        session.load_title(info.clone()).unwrap();
        session.state().with(|state| state.score = 120);
        session.quick_save(0);
        session.shutdown();
    }

    let mut session = session(root.path(), &pads);
    session.load_title(info).unwrap();
    assert_eq!(session.state().get().score, 120);
}

#[test]
fn test_cheat_toggles_survive_restart() {
    let root = tempfile::tempdir().unwrap();
    let config = config_in(root.path());
    let title = TitleId::new("feedfacefeedface");

    {
        let mut cheats = CheatEngine::new(&config.cheats);
        cheats.auto_enable(&title);
        cheats.insert(CheatPatch::new("score", "Max Score", "score", 9990));
        cheats.toggle("score", true).unwrap();
        cheats.unload().unwrap();
    }

    let mut cheats = CheatEngine::new(&config.cheats);
    assert_eq!(cheats.auto_enable(&title), 1);
    assert!(cheats.status().patches[0].enabled);
}
