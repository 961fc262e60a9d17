//! Play-progress record shared by the loop, the savers and the cheat monitor.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Logical screen width in pixels
pub const SCREEN_WIDTH: i32 = 256;
/// Logical screen height in pixels
pub const SCREEN_HEIGHT: i32 = 240;

/// Player spawn position for a fresh game
pub const PLAYER_START: (i32, i32) = (50, 200);
/// Lives at the start of a fresh game
pub const STARTING_LIVES: u32 = 3;

/// A single enemy sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enemy {
    pub x: i32,
    pub y: i32,
    pub dx: i32,
    pub dy: i32,
    /// Palette selector (0..3)
    #[serde(rename = "type")]
    pub kind: u8,
}

/// A player bullet in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bullet {
    pub x: i32,
    pub y: i32,
    pub dx: i32,
    pub dy: i32,
}

/// The complete mutable record of play progress.
///
/// Field order is significant: the snapshot checksum is computed over the
/// serialized form, so reordering fields invalidates existing saves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub player_x: i32,
    pub player_y: i32,
    pub enemies: Vec<Enemy>,
    pub bullets: Vec<Bullet>,
    pub score: u32,
    pub lives: u32,
    pub level: u32,
    pub frame_count: u64,
    /// Unix seconds at the time the state was captured
    pub timestamp: f64,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new_game()
    }
}

impl GameState {
    /// A fresh game with the opening enemy wave.
    pub fn new_game() -> Self {
        let enemies = (0..5)
            .map(|i| Enemy {
                x: 200 + i * 60,
                y: 50 + (i % 3) * 50,
                dx: -1,
                dy: 0,
                kind: (i % 3) as u8,
            })
            .collect();

        Self {
            player_x: PLAYER_START.0,
            player_y: PLAYER_START.1,
            enemies,
            bullets: Vec::new(),
            score: 0,
            lives: STARTING_LIVES,
            level: 1,
            frame_count: 0,
            timestamp: 0.0,
        }
    }

    /// Reset in place to a fresh game.
    pub fn reset(&mut self) {
        *self = Self::new_game();
    }

    /// Read a patchable field as a signed integer.
    pub fn field(&self, field: PatchField) -> i64 {
        match field {
            PatchField::PlayerX => self.player_x as i64,
            PatchField::PlayerY => self.player_y as i64,
            PatchField::Score => self.score as i64,
            PatchField::Lives => self.lives as i64,
            PatchField::Level => self.level as i64,
            PatchField::FrameCount => self.frame_count as i64,
        }
    }

    /// Overwrite exactly one field. Nothing else in the state is touched.
    pub fn set_field(&mut self, field: PatchField, value: i64) -> Result<(), FieldError> {
        let out_of_range = || FieldError::OutOfRange { field, value };
        match field {
            PatchField::PlayerX => self.player_x = i32::try_from(value).map_err(|_| out_of_range())?,
            PatchField::PlayerY => self.player_y = i32::try_from(value).map_err(|_| out_of_range())?,
            PatchField::Score => self.score = u32::try_from(value).map_err(|_| out_of_range())?,
            PatchField::Lives => self.lives = u32::try_from(value).map_err(|_| out_of_range())?,
            PatchField::Level => self.level = u32::try_from(value).map_err(|_| out_of_range())?,
            PatchField::FrameCount => {
                self.frame_count = u64::try_from(value).map_err(|_| out_of_range())?
            }
        }
        Ok(())
    }
}

/// Scalar fields a cheat patch may pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchField {
    PlayerX,
    PlayerY,
    Score,
    Lives,
    Level,
    FrameCount,
}

impl PatchField {
    pub const ALL: [PatchField; 6] = [
        PatchField::PlayerX,
        PatchField::PlayerY,
        PatchField::Score,
        PatchField::Lives,
        PatchField::Level,
        PatchField::FrameCount,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PatchField::PlayerX => "player_x",
            PatchField::PlayerY => "player_y",
            PatchField::Score => "score",
            PatchField::Lives => "lives",
            PatchField::Level => "level",
            PatchField::FrameCount => "frame_count",
        }
    }
}

impl fmt::Display for PatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PatchField {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatchField::ALL
            .into_iter()
            .find(|field| field.key() == s)
            .ok_or_else(|| FieldError::UnknownField(s.to_string()))
    }
}

/// Why a field write was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("'{0}' is not a patchable game state field")]
    UnknownField(String),

    #[error("value {value} does not fit field '{field}'")]
    OutOfRange { field: PatchField, value: i64 },
}
