//! Input handling for keyboard and controllers
//!
//! Each frame the [`InputMultiplexer`] ORs the keyboard's logical buttons
//! with the active controller's into one [`ControlState`].

mod key;
mod keyboard_mapping;

pub use key::Key;
pub use keyboard_mapping::KeyboardMapping;

use hashbrown::HashSet;

/// The eight logical buttons for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub a: bool,
    pub b: bool,
    pub start: bool,
    pub select: bool,
}

impl ControlState {
    /// Logical OR of every button
    pub fn merge(self, other: ControlState) -> ControlState {
        ControlState {
            up: self.up || other.up,
            down: self.down || other.down,
            left: self.left || other.left,
            right: self.right || other.right,
            a: self.a || other.a,
            b: self.b || other.b,
            start: self.start || other.start,
            select: self.select || other.select,
        }
    }

    pub fn any(&self) -> bool {
        *self != ControlState::default()
    }
}

/// Keys currently held down
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    held: HashSet<Key>,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update keyboard state
    pub fn set(&mut self, key: Key, pressed: bool) {
        if pressed {
            self.held.insert(key);
        } else {
            self.held.remove(&key);
        }
    }

    /// Replace the held set wholesale (for front-ends that poll)
    pub fn replace(&mut self, keys: impl IntoIterator<Item = Key>) {
        self.held.clear();
        self.held.extend(keys);
    }

    pub fn is_down(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn ctrl(&self) -> bool {
        self.is_down(Key::LeftCtrl) || self.is_down(Key::RightCtrl)
    }

    pub fn alt(&self) -> bool {
        self.is_down(Key::LeftAlt) || self.is_down(Key::RightAlt)
    }
}

/// Merges keyboard and controller input into one control state per frame
#[derive(Debug, Clone, Default)]
pub struct InputMultiplexer {
    mapping: KeyboardMapping,
}

impl InputMultiplexer {
    pub fn new(mapping: KeyboardMapping) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &KeyboardMapping {
        &self.mapping
    }

    /// Keyboard state OR the controller's, if one is present
    pub fn merge(&self, keys: &KeyboardState, pad: Option<ControlState>) -> ControlState {
        let keyboard = self.mapping.control_state(keys);
        match pad {
            Some(pad) => keyboard.merge(pad),
            None => keyboard,
        }
    }
}
