use thiserror::Error;

use super::interval::{Interval, IntervalKind, Millis, SegmentLoudness};
use crate::api::model::{RawAnalysis, RawInterval};

#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("malformed analysis: {0}")]
    MalformedAnalysis(String),
}

/// Per-track analysis on a single millisecond timeline.
///
/// Every series starts at 0, is contiguous, and its last interval ends at the
/// track duration. Built once by [`normalize`] and never adjusted afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackAnalysis {
    series: [Vec<Interval>; 5],
    duration_ms: Millis,
}

impl TrackAnalysis {
    pub fn series(&self, kind: IntervalKind) -> &[Interval] {
        &self.series[kind.index()]
    }

    pub fn duration_ms(&self) -> Millis {
        self.duration_ms
    }
}

/// Rewrite raw second-based analysis onto the track's millisecond timeline.
///
/// The first interval of each series absorbs any leading gap and is moved to
/// start at 0; the last is stretched (or cut) to end at `track_duration_ms`.
pub fn normalize(raw: &RawAnalysis, track_duration_ms: Millis) -> Result<TrackAnalysis, AnalysisError> {
    if !(track_duration_ms > 0.0) {
        return Err(AnalysisError::MalformedAnalysis(format!(
            "track duration must be positive, got {}",
            track_duration_ms
        )));
    }

    let mut series: [Vec<Interval>; 5] = Default::default();
    for kind in IntervalKind::ALL {
        series[kind.index()] = normalize_series(kind, raw_series(raw, kind), track_duration_ms)?;
    }

    Ok(TrackAnalysis {
        series,
        duration_ms: track_duration_ms,
    })
}

fn raw_series(raw: &RawAnalysis, kind: IntervalKind) -> &[RawInterval] {
    match kind {
        IntervalKind::Tatum => &raw.tatums,
        IntervalKind::Segment => &raw.segments,
        IntervalKind::Beat => &raw.beats,
        IntervalKind::Bar => &raw.bars,
        IntervalKind::Section => &raw.sections,
    }
}

fn normalize_series(
    kind: IntervalKind,
    raw: &[RawInterval],
    track_duration_ms: Millis,
) -> Result<Vec<Interval>, AnalysisError> {
    if raw.is_empty() {
        return Err(AnalysisError::MalformedAnalysis(format!(
            "{} series is empty",
            kind.name()
        )));
    }

    let mut intervals: Vec<Interval> = raw.iter().map(to_millis).collect();

    let first = &mut intervals[0];
    first.duration_ms += first.start_ms;
    first.start_ms = 0.0;

    if let Some(last) = intervals.last_mut() {
        last.duration_ms = track_duration_ms - last.start_ms;
    }

    Ok(intervals)
}

fn to_millis(raw: &RawInterval) -> Interval {
    let loudness = match (raw.loudness_start, raw.loudness_max) {
        (Some(loudness_start), Some(loudness_max)) => Some(SegmentLoudness {
            loudness_start,
            loudness_max,
            loudness_max_time_ms: raw.loudness_max_time.unwrap_or(0.0) * 1000.0,
            loudness_end: raw.loudness_end.unwrap_or(loudness_start),
            pitches: raw.pitches.clone().unwrap_or_default(),
            timbre: raw.timbre.clone().unwrap_or_default(),
        }),
        _ => None,
    };

    Interval {
        start_ms: raw.start * 1000.0,
        duration_ms: raw.duration * 1000.0,
        confidence: raw.confidence,
        loudness,
    }
}
