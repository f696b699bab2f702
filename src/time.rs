use std::time::{Duration, Instant};

/// Longest wait any configured duration can ask for.
pub const LONGEST_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

/// Converts configured seconds to a `Duration`. Negative and NaN become zero, anything
/// past `LONGEST_WAIT` (infinity included) is clamped.
pub fn duration_from_secs(seconds: f32) -> Duration {
    Duration::try_from_secs_f32(seconds.max(0.0)).map_or(LONGEST_WAIT, |duration| duration.min(LONGEST_WAIT))
}

pub struct Time {
    start: Instant,
    last: Instant,
    max_delta: Duration,
    pub delta: Duration,
}

impl Time {
    pub fn new(max_delta_seconds: f32) -> Self {
        Self::starting_at(Instant::now(), max_delta_seconds)
    }

    pub fn starting_at(now: Instant, max_delta_seconds: f32) -> Self {
        let max_delta = duration_from_secs(max_delta_seconds);
        Self { start: now, last: now, max_delta, delta: Duration::ZERO }
    }

    /// Advances to `now`. A timestamp earlier than the previous tick yields a zero delta.
    pub fn tick_at(&mut self, now: Instant) {
        let raw = now.saturating_duration_since(self.last);
        self.delta = if self.max_delta.is_zero() { raw } else { raw.min(self.max_delta) };
        if now > self.last {
            self.last = now;
        }
    }

    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.last.duration_since(self.start).as_secs_f32()
    }
}
