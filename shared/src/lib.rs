//! Shared types for the retroplay session runtime.
//!
//! Everything in this crate is pure data and pure functions: the game state
//! record, the checksummed snapshot codec and title identity. No I/O beyond
//! hashing a ROM file, no threads.

pub mod game_state;
pub mod snapshot;
pub mod title;

pub use game_state::{Bullet, Enemy, FieldError, GameState, PatchField};
pub use snapshot::{CodecError, FORMAT_VERSION, Snapshot};
pub use title::{TitleId, TitleInfo};
