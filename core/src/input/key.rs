//! Front-end independent key codes with string-based serialization

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! keys {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Physical keys the runtime understands.
        ///
        /// Front-ends translate their native key codes into this set.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Key {
            $($variant),*
        }

        impl Key {
            pub const ALL: &'static [Key] = &[$(Key::$variant),*];

            /// Human-readable name used in `config.toml`
            pub fn name(self) -> &'static str {
                match self {
                    $(Key::$variant => $name),*
                }
            }

            /// Parse a key name (case-insensitive)
            pub fn from_name(s: &str) -> Option<Key> {
                Key::ALL
                    .iter()
                    .copied()
                    .find(|key| key.name().eq_ignore_ascii_case(s))
            }
        }
    };
}

keys! {
    A => "A", B => "B", C => "C", D => "D", E => "E", F => "F", G => "G",
    H => "H", I => "I", J => "J", K => "K", L => "L", M => "M", N => "N",
    O => "O", P => "P", Q => "Q", R => "R", S => "S", T => "T", U => "U",
    V => "V", W => "W", X => "X", Y => "Y", Z => "Z",

    Key0 => "0", Key1 => "1", Key2 => "2", Key3 => "3", Key4 => "4",
    Key5 => "5", Key6 => "6", Key7 => "7", Key8 => "8", Key9 => "9",

    F1 => "F1", F2 => "F2", F3 => "F3", F4 => "F4", F5 => "F5", F6 => "F6",
    F7 => "F7", F8 => "F8", F9 => "F9", F10 => "F10", F11 => "F11", F12 => "F12",

    Up => "Up", Down => "Down", Left => "Left", Right => "Right",

    Space => "Space",
    Enter => "Enter",
    Escape => "Escape",
    Tab => "Tab",
    Backspace => "Backspace",
    LeftShift => "LShift",
    RightShift => "RShift",
    LeftCtrl => "LCtrl",
    RightCtrl => "RCtrl",
    LeftAlt => "LAlt",
    RightAlt => "RAlt",
}

impl Key {
    /// Slot number for the number-row keys `1`..`9`
    pub fn digit(self) -> Option<u32> {
        match self {
            Key::Key1 => Some(1),
            Key::Key2 => Some(2),
            Key::Key3 => Some(3),
            Key::Key4 => Some(4),
            Key::Key5 => Some(5),
            Key::Key6 => Some(6),
            Key::Key7 => Some(7),
            Key::Key8 => Some(8),
            Key::Key9 => Some(9),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Key {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Key::from_name(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("Unknown key name: '{}'", s)))
    }
}
