use std::time::Duration;

/// How long to sleep after a dispatch that took `elapsed`, so dispatches are
/// spaced `period` apart. An overrun is not made up for: the result is never
/// negative, so the next action is never sent early.
pub fn pacing_delay(period: Duration, elapsed: Duration) -> Duration {
    period.saturating_sub(elapsed)
}
