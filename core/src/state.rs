//! The one `GameState` shared between the loop and the workers

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use retroplay_shared::game_state::{FieldError, GameState, PatchField};

use crate::worker::lock_recover;

/// Cloneable handle to the session's game state.
///
/// The loop mutates through [`SharedState::with`] once per tick. Workers
/// either copy the whole state out ([`SharedState::get`]) or write a single
/// field ([`SharedState::patch`]); every access holds the lock only for
/// the duration of that call.
#[derive(Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<GameState>>,
}

impl SharedState {
    pub fn new(state: GameState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GameState> {
        lock_recover(&self.inner, "game state")
    }

    /// Deep copy of the current state
    pub fn get(&self) -> GameState {
        self.lock().clone()
    }

    /// Replace the whole state
    pub fn set(&self, state: GameState) {
        *self.lock() = state;
    }

    /// Run `f` with exclusive access
    pub fn with<R>(&self, f: impl FnOnce(&mut GameState) -> R) -> R {
        f(&mut *self.lock())
    }

    /// Overwrite exactly one field
    pub fn patch(&self, field: PatchField, value: i64) -> Result<(), FieldError> {
        self.lock().set_field(field, value)
    }
}

/// Current wall-clock time as Unix seconds with millisecond precision
pub fn unix_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_leaves_other_fields() {
        let shared = SharedState::new(GameState::new_game());
        shared.with(|s| s.score = 30);
        shared.patch(PatchField::Lives, 9).unwrap();

        let state = shared.get();
        assert_eq!(state.lives, 9);
        assert_eq!(state.score, 30);
    }

    #[test]
    fn clones_share_state() {
        let a = SharedState::default();
        let b = a.clone();
        let mut fresh = GameState::new_game();
        fresh.level = 4;
        b.set(fresh);
        assert_eq!(a.get().level, 4);
    }
}
