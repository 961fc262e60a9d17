//! Retroplay Core - session runtime for retro titles
//!
//! Everything that runs while a title is loaded, minus the window:
//!
//! - [`SaveCoordinator`] - Slot files, per-title index and the autosave worker
//! - [`CheatEngine`] - Per-title patch tables and the re-apply monitor
//! - [`DeviceRegistry`] - Controller and audio sink discovery, hotplug monitor
//! - [`RenderLoop`] - Fixed-timestep game loop that owns all of the above
//!
//! Front-ends implement [`Frontend`] to put frames on screen and feed keys in.

pub mod cheat;
pub mod config;
pub mod device;
pub(crate) mod fs;
pub mod hud;
pub mod input;
#[cfg(test)]
mod integration;
pub mod render;
pub mod runtime;
pub mod save;
pub mod state;
#[cfg(test)]
pub(crate) mod test_utils;
pub mod worker;

pub use cheat::{CheatEngine, CheatError, CheatPatch, CheatPhase, CheatStatus};
pub use config::Config;
pub use device::audio::{Platform, SystemShell};
pub use device::backend::{PadSnapshot, PadTable};
#[cfg(feature = "gamepad")]
pub use device::gamepad::GamepadPump;
pub use device::{DeviceError, DeviceEvent, DeviceRecord, DeviceRegistry, DeviceStatus};
pub use hud::HudStatus;
pub use input::{ControlState, InputMultiplexer, Key, KeyboardState};
pub use render::Frame;
pub use runtime::{Frontend, FrontendEvent, RenderLoop, TickTiming};
pub use save::{AUTOSAVE_SLOT, SaveCoordinator, SaveError, SaveSlotIndex, SlotEntry};
pub use state::SharedState;
