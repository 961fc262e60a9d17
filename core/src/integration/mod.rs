//! End-to-end tests across the save, cheat and device services
//!
//! Each test plays the part of a whole process: services are built from
//! scratch over a temp directory, dropped, and built again to simulate a
//! restart.

#[cfg(test)]
mod restart_tests;
#[cfg(test)]
mod session_tests;

#[cfg(test)]
pub(crate) mod test_utils {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::cheat::CheatEngine;
    use crate::config::Config;
    use crate::device::DeviceRegistry;
    use crate::device::audio::Platform;
    use crate::device::backend::PadTable;
    use crate::runtime::RenderLoop;
    use crate::save::SaveCoordinator;
    use crate::test_utils::ScriptedShell;

    /// Config whose save and cheat directories live under `root`
    pub fn config_in(root: &Path) -> Config {
        let mut config = Config::default();
        config.saves.dir = Some(root.join("saves"));
        config.cheats.dir = Some(root.join("cheats"));
        config
    }

    /// A full session as the launcher would build it, with fast workers
    pub fn session(root: &Path, pads: &PadTable) -> RenderLoop {
        let config = config_in(root);
        let fast = Duration::from_millis(10);
        let saves = SaveCoordinator::new(&config.saves).with_autosave_timing(fast, fast);
        let cheats = CheatEngine::new(&config.cheats).with_monitor_timing(fast, fast);
        let devices = DeviceRegistry::new(
            &config.devices,
            Arc::new(pads.clone()),
            Arc::new(ScriptedShell::new()),
            Platform::Other,
        )
        .with_monitor_timing(fast, fast);
        RenderLoop::new(config, saves, cheats, devices)
    }
}
