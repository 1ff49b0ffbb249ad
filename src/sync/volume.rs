use std::collections::VecDeque;

use crate::analysis::interval::SegmentLoudness;
use crate::analysis::Millis;

/// Capacity of the long queue the display baseline is computed from.
pub const BASELINE_WINDOW: usize = 400;

/// Instantaneous loudness (dB) at `elapsed_ms` into a segment.
///
/// Rises linearly from `loudness_start` to `loudness_max` until the peak
/// offset, then falls linearly towards the next segment's starting loudness.
/// Returns 0 for the final segment, which has no target to move towards.
pub fn instantaneous(
    segment: &SegmentLoudness,
    duration_ms: Millis,
    elapsed_ms: Millis,
    next_loudness_start: Option<f64>,
) -> f64 {
    let Some(next) = next_loudness_start else {
        return 0.0;
    };

    let peak_at = segment.loudness_max_time_ms;
    if elapsed_ms < peak_at {
        let progress = fraction(elapsed_ms, peak_at);
        lerp(segment.loudness_start, segment.loudness_max, progress)
    } else {
        let progress = fraction(elapsed_ms - peak_at, duration_ms - peak_at);
        lerp(segment.loudness_max, next, progress)
    }
}

fn fraction(elapsed: f64, span: f64) -> f64 {
    if span <= 0.0 {
        return 1.0;
    }
    (elapsed / span).clamp(0.0, 1.0)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Bounded most-recent-first sample queue.
#[derive(Clone, Debug)]
pub struct SmoothingQueue {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl SmoothingQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Push to the front, evicting from the back once over capacity.
    pub fn push(&mut self, sample: f64) {
        self.samples.push_front(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_back();
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.samples.iter()
    }

    pub fn min(&self) -> Option<f64> {
        self.samples.iter().copied().reduce(f64::min)
    }

    pub fn average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }
}

/// Map `x` from `[d0, d1]` onto `[0, 1]` on a logarithmic scale.
///
/// Like a log scale over a strictly negative domain, negative inputs are
/// reflected (`-ln(-x)`), which is what dB values need. A domain that touches
/// or straddles zero, or has no width, maps everything to 0. The result is
/// clamped to `[0, 1]`, so a 0 dB sample over a negative domain reads as 1.
pub fn log_scale(x: f64, d0: f64, d1: f64) -> f64 {
    let transform: fn(f64) -> f64 = if d0 > 0.0 && d1 > 0.0 {
        f64::ln
    } else if d0 < 0.0 && d1 < 0.0 {
        |v| -(-v).ln()
    } else {
        return 0.0;
    };

    let (t0, t1) = (transform(d0), transform(d1));
    if t1 == t0 {
        return 0.0;
    }
    let t = (transform(x) - t0) / (t1 - t0);
    if t.is_nan() {
        0.0
    } else {
        t.clamp(0.0, 1.0)
    }
}

/// Two-stage smoothing: a long window sets the baseline domain, a short one
/// is what gets displayed.
#[derive(Clone, Debug)]
pub struct VolumeSmoother {
    baseline: SmoothingQueue,
    display: SmoothingQueue,
}

impl VolumeSmoother {
    pub fn new(smoothing: usize) -> Self {
        Self {
            baseline: SmoothingQueue::new(BASELINE_WINDOW),
            display: SmoothingQueue::new(smoothing),
        }
    }

    /// Feed one instantaneous sample and return the displayed volume.
    pub fn push(&mut self, sample: f64) -> f64 {
        self.baseline.push(sample);
        self.display.push(sample);
        self.displayed()
    }

    pub fn displayed(&self) -> f64 {
        match (self.baseline.min(), self.baseline.average(), self.display.average()) {
            (Some(low), Some(mean), Some(current)) => log_scale(current, low, mean),
            _ => 0.0,
        }
    }

    #[cfg(test)]
    pub fn baseline(&self) -> &SmoothingQueue {
        &self.baseline
    }

    #[cfg(test)]
    pub fn display(&self) -> &SmoothingQueue {
        &self.display
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment() -> SegmentLoudness {
        SegmentLoudness {
            loudness_start: -20.0,
            loudness_max: -5.0,
            loudness_max_time_ms: 100.0,
            loudness_end: -30.0,
            ..Default::default()
        }
    }

    #[test]
    fn rising_phase_is_linear() {
        assert_eq!(instantaneous(&segment(), 400.0, 50.0, Some(-30.0)), -12.5);
        assert_eq!(instantaneous(&segment(), 400.0, 0.0, Some(-30.0)), -20.0);
    }

    #[test]
    fn falling_phase_heads_to_next_segment() {
        assert_eq!(instantaneous(&segment(), 400.0, 100.0, Some(-35.0)), -5.0);
        assert_eq!(instantaneous(&segment(), 400.0, 250.0, Some(-35.0)), -20.0);
        // Overrun clamps at the next segment's start loudness.
        assert_eq!(instantaneous(&segment(), 400.0, 900.0, Some(-35.0)), -35.0);
    }

    #[test]
    fn final_segment_is_silent() {
        assert_eq!(instantaneous(&segment(), 400.0, 50.0, None), 0.0);
    }

    #[test]
    fn queue_evicts_oldest() {
        let mut queue = SmoothingQueue::new(BASELINE_WINDOW);
        for i in 0..401 {
            queue.push(i as f64);
        }
        assert_eq!(queue.len(), 400);
        assert_eq!(queue.iter().next().copied(), Some(400.0));
        assert_eq!(queue.iter().last().copied(), Some(1.0));
    }

    #[test]
    fn queue_statistics() {
        let mut queue = SmoothingQueue::new(3);
        assert_eq!(queue.min(), None);
        assert_eq!(queue.average(), None);
        for v in [-10.0, -20.0, -30.0, -40.0] {
            queue.push(v);
        }
        assert_eq!(queue.min(), Some(-40.0));
        assert_eq!(queue.average(), Some(-30.0));
    }

    #[test]
    fn log_scale_negative_domain() {
        assert_eq!(log_scale(-30.0, -30.0, -10.0), 0.0);
        assert_eq!(log_scale(-10.0, -30.0, -10.0), 1.0);
        let mid = log_scale(-20.0, -30.0, -10.0);
        assert!((mid - (1.5f64.ln() / 3.0f64.ln())).abs() < 1e-12);
    }

    #[test]
    fn log_scale_degenerate_domains() {
        assert_eq!(log_scale(-5.0, -10.0, -10.0), 0.0);
        assert_eq!(log_scale(-5.0, -10.0, 0.0), 0.0);
        assert_eq!(log_scale(-5.0, -10.0, 4.0), 0.0);
        // Outside the domain clamps.
        assert_eq!(log_scale(-1.0, -30.0, -10.0), 1.0);
        assert_eq!(log_scale(0.0, -30.0, -10.0), 1.0);
    }

    #[test]
    fn smoother_stays_in_range() {
        let mut smoother = VolumeSmoother::new(10);
        for i in 0..1000 {
            let sample = -30.0 + 25.0 * ((i as f64) * 0.1).sin().abs();
            let v = smoother.push(sample);
            assert!((0.0..=1.0).contains(&v));
        }
        assert_eq!(smoother.baseline().len(), BASELINE_WINDOW);
        assert_eq!(smoother.display().len(), 10);
    }
}
