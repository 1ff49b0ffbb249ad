/// Milliseconds on the track timeline (or the monotonic clock).
pub type Millis = f64;

/// The five analysis granularities, finest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntervalKind {
    Tatum,
    Segment,
    Beat,
    Bar,
    Section,
}

impl IntervalKind {
    pub const ALL: [IntervalKind; 5] = [
        IntervalKind::Tatum,
        IntervalKind::Segment,
        IntervalKind::Beat,
        IntervalKind::Bar,
        IntervalKind::Section,
    ];

    /// Dense index, usable for per-kind arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            IntervalKind::Tatum => "tatum",
            IntervalKind::Segment => "segment",
            IntervalKind::Beat => "beat",
            IntervalKind::Bar => "bar",
            IntervalKind::Section => "section",
        }
    }
}

/// Loudness and timbre descriptors carried only by segments.
#[allow(dead_code)]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SegmentLoudness {
    /// dB at segment start
    pub loudness_start: f64,
    /// Peak dB within the segment
    pub loudness_max: f64,
    /// Offset of the peak from segment start, in ms
    pub loudness_max_time_ms: Millis,
    pub loudness_end: f64,
    pub pitches: Vec<f64>,
    pub timbre: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Interval {
    pub start_ms: Millis,
    pub duration_ms: Millis,
    pub confidence: f64,
    pub loudness: Option<SegmentLoudness>,
}

/// Index of the interval active at `position_ms`.
///
/// Returns the last `i` with `series[i].start_ms <= position_ms`. Positions past
/// the final start clamp to the last index and positions before the first start
/// clamp to 0. `series` must be non-empty and sorted by start.
pub fn resolve(series: &[Interval], position_ms: Millis) -> usize {
    series
        .partition_point(|interval| interval.start_ms <= position_ms)
        .saturating_sub(1)
}
