//! Window seam between the render loop and a desktop (or test) front-end

use anyhow::Result;

use crate::hud::HudStatus;
use crate::input::{Key, KeyboardState};
use crate::render::Frame;

/// Discrete events from one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontendEvent {
    /// Window closed
    Quit,
    /// Key went down this frame (no auto-repeat)
    KeyPressed(Key),
}

pub trait Frontend {
    /// Refresh the held-key set and return this frame's events.
    fn poll(&mut self, keys: &mut KeyboardState) -> Vec<FrontendEvent>;

    /// Show `frame`, with `hud` as text wherever the front-end puts it.
    fn present(&mut self, frame: &Frame, hud: &HudStatus) -> Result<()>;
}
