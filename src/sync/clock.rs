use std::time::Instant;

use crate::analysis::Millis;

/// Source of monotonic time in milliseconds.
pub trait TimeSource: Send + Sync {
    fn now_ms(&self) -> Millis;
}

/// Wall-independent monotonic time, measured from construction.
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now_ms(&self) -> Millis {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Baseline captured from the last authoritative position sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClockState {
    pub last_known_progress_ms: Millis,
    pub captured_at_ms: Millis,
    pub loop_started_at_ms: Option<Millis>,
}

/// Extrapolates the playback position between server samples.
///
/// No clamping against track duration happens here; the next poll notices
/// when the track has ended.
#[derive(Clone, Debug, Default)]
pub struct PlaybackClock {
    state: ClockState,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&mut self, progress_ms: Millis, now_ms: Millis) {
        self.state.last_known_progress_ms = progress_ms;
        self.state.captured_at_ms = now_ms;
    }

    pub fn estimate(&self, now_ms: Millis) -> Millis {
        self.state.last_known_progress_ms + (now_ms - self.state.captured_at_ms)
    }

    /// Record when the frame loop first ran. Only the first call sticks.
    pub fn mark_loop_started(&mut self, now_ms: Millis) {
        self.state.loop_started_at_ms.get_or_insert(now_ms);
    }

    #[cfg(test)]
    pub fn state(&self) -> ClockState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extrapolates_from_baseline() {
        let mut clock = PlaybackClock::new();
        clock.seed(5000.0, 100.0);
        assert_eq!(clock.estimate(350.0), 5250.0);
    }

    #[test]
    fn reseed_replaces_previous_baseline() {
        let mut clock = PlaybackClock::new();
        clock.seed(5000.0, 100.0);
        clock.seed(8000.0, 900.0);
        assert_eq!(clock.estimate(900.0), 8000.0);
        assert_eq!(clock.estimate(1000.0), 8100.0);
    }

    #[test]
    fn loop_start_is_recorded_once() {
        let mut clock = PlaybackClock::new();
        clock.mark_loop_started(10.0);
        clock.mark_loop_started(20.0);
        assert_eq!(clock.state().loop_started_at_ms, Some(10.0));
    }

    #[test]
    fn monotonic_time_does_not_go_backwards() {
        let time = MonotonicTime::new();
        let a = time.now_ms();
        let b = time.now_ms();
        assert!(b >= a);
    }
}
