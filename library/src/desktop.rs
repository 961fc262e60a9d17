//! minifb window front-end
//!
//! Presents the 256x240 framebuffer scaled up, shows the HUD text in the
//! window title and translates minifb keys into runtime keys.

use anyhow::{Context, Result};
use minifb::{Key as WinKey, KeyRepeat, Scale, Window, WindowOptions};
use retroplay_core::render::{Frame, HEIGHT, WIDTH};
use retroplay_core::{FrontendEvent, HudStatus, Key, KeyboardState};

pub struct DesktopFrontend {
    window: Window,
    title: String,
}

impl DesktopFrontend {
    pub fn new(scale: u32) -> Result<Self> {
        let title = HudStatus::default().to_string();
        let window = Window::new(
            &title,
            WIDTH,
            HEIGHT,
            WindowOptions {
                resize: false,
                scale: window_scale(scale),
                ..WindowOptions::default()
            },
        )
        .context("failed to create window")?;
        Ok(Self { window, title })
    }
}

impl retroplay_core::Frontend for DesktopFrontend {
    fn poll(&mut self, keys: &mut KeyboardState) -> Vec<FrontendEvent> {
        if !self.window.is_open() {
            return vec![FrontendEvent::Quit];
        }
        keys.replace(self.window.get_keys().into_iter().filter_map(map_key));
        self.window
            .get_keys_pressed(KeyRepeat::No)
            .into_iter()
            .filter_map(map_key)
            .map(FrontendEvent::KeyPressed)
            .collect()
    }

    fn present(&mut self, frame: &Frame, hud: &HudStatus) -> Result<()> {
        let title = hud.to_string();
        if title != self.title {
            self.window.set_title(&title);
            self.title = title;
        }
        self.window
            .update_with_buffer(frame.pixels(), WIDTH, HEIGHT)
            .context("failed to update window")
    }
}

/// Nearest supported minifb scale at or below `scale`
fn window_scale(scale: u32) -> Scale {
    match scale {
        0 | 1 => Scale::X1,
        2 | 3 => Scale::X2,
        4..=7 => Scale::X4,
        _ => Scale::X8,
    }
}

/// minifb key to runtime key. Keys the runtime has no name for are dropped.
pub fn map_key(key: WinKey) -> Option<Key> {
    let key = match key {
        WinKey::A => Key::A,
        WinKey::B => Key::B,
        WinKey::C => Key::C,
        WinKey::D => Key::D,
        WinKey::E => Key::E,
        WinKey::F => Key::F,
        WinKey::G => Key::G,
        WinKey::H => Key::H,
        WinKey::I => Key::I,
        WinKey::J => Key::J,
        WinKey::K => Key::K,
        WinKey::L => Key::L,
        WinKey::M => Key::M,
        WinKey::N => Key::N,
        WinKey::O => Key::O,
        WinKey::P => Key::P,
        WinKey::Q => Key::Q,
        WinKey::R => Key::R,
        WinKey::S => Key::S,
        WinKey::T => Key::T,
        WinKey::U => Key::U,
        WinKey::V => Key::V,
        WinKey::W => Key::W,
        WinKey::X => Key::X,
        WinKey::Y => Key::Y,
        WinKey::Z => Key::Z,
        WinKey::Key0 => Key::Key0,
        WinKey::Key1 => Key::Key1,
        WinKey::Key2 => Key::Key2,
        WinKey::Key3 => Key::Key3,
        WinKey::Key4 => Key::Key4,
        WinKey::Key5 => Key::Key5,
        WinKey::Key6 => Key::Key6,
        WinKey::Key7 => Key::Key7,
        WinKey::Key8 => Key::Key8,
        WinKey::Key9 => Key::Key9,
        WinKey::F1 => Key::F1,
        WinKey::F2 => Key::F2,
        WinKey::F3 => Key::F3,
        WinKey::F4 => Key::F4,
        WinKey::F5 => Key::F5,
        WinKey::F6 => Key::F6,
        WinKey::F7 => Key::F7,
        WinKey::F8 => Key::F8,
        WinKey::F9 => Key::F9,
        WinKey::F10 => Key::F10,
        WinKey::F11 => Key::F11,
        WinKey::F12 => Key::F12,
        WinKey::Up => Key::Up,
        WinKey::Down => Key::Down,
        WinKey::Left => Key::Left,
        WinKey::Right => Key::Right,
        WinKey::Space => Key::Space,
        WinKey::Enter => Key::Enter,
        WinKey::Escape => Key::Escape,
        WinKey::Tab => Key::Tab,
        WinKey::Backspace => Key::Backspace,
        WinKey::LeftShift => Key::LeftShift,
        WinKey::RightShift => Key::RightShift,
        WinKey::LeftCtrl => Key::LeftCtrl,
        WinKey::RightCtrl => Key::RightCtrl,
        WinKey::LeftAlt => Key::LeftAlt,
        WinKey::RightAlt => Key::RightAlt,
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_key() {
        assert_eq!(map_key(WinKey::F5), Some(Key::F5));
        assert_eq!(map_key(WinKey::Key3), Some(Key::Key3));
        assert_eq!(map_key(WinKey::LeftCtrl), Some(Key::LeftCtrl));
        assert_eq!(map_key(WinKey::NumPad5), None);
    }

    #[test]
    fn test_window_scale_rounds_down() {
        assert!(matches!(window_scale(1), Scale::X1));
        assert!(matches!(window_scale(3), Scale::X2));
        assert!(matches!(window_scale(4), Scale::X4));
        assert!(matches!(window_scale(8), Scale::X8));
    }
}
