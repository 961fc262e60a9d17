//! HUD read model

use std::fmt;
use std::time::{Duration, Instant};

/// How long "Auto Saved" and status messages stay up
pub const NOTICE_DURATION: Duration = Duration::from_secs(3);

/// Everything the HUD shows for one frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HudStatus {
    pub title: Option<String>,
    pub score: u32,
    pub lives: u32,
    pub level: u32,
    pub paused: bool,
    pub cheats_enabled: usize,
    pub controllers: usize,
    pub audio_sinks: usize,
    /// An autosave landed within the last [`NOTICE_DURATION`]
    pub autosaved: bool,
    pub message: Option<String>,
}

impl fmt::Display for HudStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.title {
            Some(title) => write!(f, "{}", title)?,
            None => return write!(f, "Retroplay - load a ROM to play"),
        }
        write!(
            f,
            " | SCORE {} LIVES {} LEVEL {}",
            self.score, self.lives, self.level
        )?;
        if self.paused {
            write!(f, " | PAUSED")?;
        }
        if self.cheats_enabled > 0 {
            write!(f, " | cheats: {}", self.cheats_enabled)?;
        }
        write!(f, " | pads: {} audio: {}", self.controllers, self.audio_sinks)?;
        if self.autosaved {
            write!(f, " | Auto Saved")?;
        }
        if let Some(message) = &self.message {
            write!(f, " | {}", message)?;
        }
        Ok(())
    }
}

/// One-line message that expires after [`NOTICE_DURATION`]
#[derive(Debug, Clone, Default)]
pub struct StatusLine {
    current: Option<(String, Instant)>,
}

impl StatusLine {
    pub fn set(&mut self, message: impl Into<String>) {
        self.set_at(message, Instant::now());
    }

    pub fn set_at(&mut self, message: impl Into<String>, now: Instant) {
        self.current = Some((message.into(), now));
    }

    pub fn current(&self) -> Option<&str> {
        self.current_at(Instant::now())
    }

    pub fn current_at(&self, now: Instant) -> Option<&str> {
        self.current
            .as_ref()
            .filter(|(_, since)| now.saturating_duration_since(*since) < NOTICE_DURATION)
            .map(|(message, _)| message.as_str())
    }
}
