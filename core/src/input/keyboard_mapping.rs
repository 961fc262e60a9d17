//! Keyboard to logical button mapping

use serde::{Deserialize, Serialize};

use super::{ControlState, Key, KeyboardState};

/// Keys bound to each logical button. Any bound key being down presses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyboardMapping {
    #[serde(default = "default_up")]
    pub up: Vec<Key>,
    #[serde(default = "default_down")]
    pub down: Vec<Key>,
    #[serde(default = "default_left")]
    pub left: Vec<Key>,
    #[serde(default = "default_right")]
    pub right: Vec<Key>,
    #[serde(default = "default_a")]
    pub a: Vec<Key>,
    #[serde(default = "default_b")]
    pub b: Vec<Key>,
    #[serde(default = "default_start")]
    pub start: Vec<Key>,
    #[serde(default = "default_select")]
    pub select: Vec<Key>,
}

fn default_up() -> Vec<Key> {
    vec![Key::Up, Key::W]
}
fn default_down() -> Vec<Key> {
    vec![Key::Down, Key::S]
}
fn default_left() -> Vec<Key> {
    vec![Key::Left, Key::A]
}
fn default_right() -> Vec<Key> {
    vec![Key::Right, Key::D]
}
fn default_a() -> Vec<Key> {
    vec![Key::Space, Key::Z]
}
fn default_b() -> Vec<Key> {
    vec![Key::LeftShift, Key::X]
}
fn default_start() -> Vec<Key> {
    vec![Key::Enter]
}
fn default_select() -> Vec<Key> {
    vec![Key::Tab]
}

impl Default for KeyboardMapping {
    fn default() -> Self {
        Self {
            // Arrows plus WASD for direction
            up: default_up(),
            down: default_down(),
            left: default_left(),
            right: default_right(),

            // Space/Z fire, LShift/X secondary
            a: default_a(),
            b: default_b(),

            start: default_start(),
            select: default_select(),
        }
    }
}

impl KeyboardMapping {
    /// Logical buttons pressed by the currently held keys
    pub fn control_state(&self, keys: &KeyboardState) -> ControlState {
        let any = |bound: &[Key]| bound.iter().any(|&k| keys.is_down(k));
        ControlState {
            up: any(&self.up),
            down: any(&self.down),
            left: any(&self.left),
            right: any(&self.right),
            a: any(&self.a),
            b: any(&self.b),
            start: any(&self.start),
            select: any(&self.select),
        }
    }

    /// Returns all keys bound in this mapping (for conflict detection)
    pub fn all_keys(&self) -> Vec<Key> {
        [
            &self.up,
            &self.down,
            &self.left,
            &self.right,
            &self.a,
            &self.b,
            &self.start,
            &self.select,
        ]
        .into_iter()
        .flatten()
        .copied()
        .collect()
    }
}
