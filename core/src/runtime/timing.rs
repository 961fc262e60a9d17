//! Fixed-step timing derived from the video settings

use std::time::Duration;

use crate::config::VideoConfig;

/// Longest stall, in ticks, that the loop will try to catch up on
const MAX_CATCH_UP_TICKS: u32 = 6;

/// Share of a tick the game rules may take before a warning is logged
const TICK_BUDGET_SHARE: f64 = 0.25;

/// Tick length and the limits the render loop paces itself against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickTiming {
    pub tick_rate: u32,
    pub tick: Duration,
    /// Elapsed time per frame is clamped to this
    pub max_delta: Duration,
    pub cpu_budget: Duration,
}

impl TickTiming {
    /// Timing for `tick_rate` Hz. Zero is treated as 1 Hz.
    pub fn at_rate(tick_rate: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        let rate = f64::from(tick_rate);
        Self {
            tick_rate,
            tick: Duration::from_secs_f64(1.0 / rate),
            max_delta: Duration::from_secs_f64(f64::from(MAX_CATCH_UP_TICKS) / rate),
            cpu_budget: Duration::from_secs_f64(TICK_BUDGET_SHARE / rate),
        }
    }
}

impl From<&VideoConfig> for TickTiming {
    fn from(video: &VideoConfig) -> Self {
        Self::at_rate(video.tick_rate)
    }
}
