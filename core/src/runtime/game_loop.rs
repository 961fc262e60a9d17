//! Fixed timestep pacing

use std::time::{Duration, Instant};

use super::TickTiming;

/// Run as many fixed ticks as the time since the last frame allows.
///
/// Elapsed time is clamped to `timing.max_delta` so a stall never turns
/// into a burst of catch-up ticks. The first frame runs exactly one tick.
/// Returns the number of ticks executed.
pub fn execute_frame(
    timing: &TickTiming,
    accumulator: &mut Duration,
    last_update: &mut Option<Instant>,
    now: Instant,
    mut tick: impl FnMut(),
) -> u32 {
    let delta = match *last_update {
        Some(last) => now.saturating_duration_since(last).min(timing.max_delta),
        None => timing.tick,
    };
    *last_update = Some(now);
    *accumulator += delta;

    let mut ticks = 0u32;
    while *accumulator >= timing.tick {
        let tick_start = Instant::now();

        tick();

        *accumulator -= timing.tick;
        ticks += 1;

        let tick_time = tick_start.elapsed();
        if tick_time > timing.cpu_budget {
            tracing::warn!("Tick took {:?}, budget is {:?}", tick_time, timing.cpu_budget);
        }
    }

    ticks
}

/// Time left before the next tick is due
pub fn time_to_next_tick(timing: &TickTiming, accumulator: Duration) -> Duration {
    timing.tick.saturating_sub(accumulator)
}
