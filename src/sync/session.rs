use crate::analysis::interval::SegmentLoudness;
use crate::analysis::{resolve, IntervalKind, Millis, TrackAnalysis};
use crate::api::model::{PlayerState, RepeatMode, TrackFeatures, TrackInfo};

use super::clock::PlaybackClock;
use super::easing::ease;
use super::volume::{self, VolumeSmoother};

/// One authoritative position report from the player endpoint.
#[allow(dead_code)]
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackSample {
    pub track: TrackInfo,
    pub is_playing: bool,
    pub progress_ms: Millis,
    pub context_href: Option<String>,
    pub context_uri: Option<String>,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub sampled_at_ms: Millis,
}

impl PlaybackSample {
    /// `None` when the player has no track item (nothing loaded, or an ad).
    pub fn from_player_state(state: &PlayerState, sampled_at_ms: Millis) -> Option<Self> {
        let item = state.item.as_ref()?;
        let context = state.context.as_ref();
        Some(Self {
            track: TrackInfo::from(item),
            is_playing: state.is_playing,
            progress_ms: state.progress_ms.unwrap_or(0.0),
            context_href: context.and_then(|c| c.href.clone()),
            context_uri: context.and_then(|c| c.uri.clone()),
            shuffle: state.shuffle_state,
            repeat: state.repeat_state,
            sampled_at_ms,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncPhase {
    /// No poll has completed yet.
    Uninitialized,
    /// Polling, but no track has been synced.
    Polling,
    /// Analysis for a track is being fetched.
    Syncing,
    Active,
    /// Synced before, now paused or stopped.
    Idle,
}

/// The interval of one kind under the playhead.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveInterval {
    pub kind: IntervalKind,
    pub index: usize,
    pub start_ms: Millis,
    pub duration_ms: Millis,
    pub confidence: f64,
    pub elapsed_ms: Millis,
    /// Eased fraction of the interval that has elapsed, in `[0, 1]`.
    pub progress: f64,
    pub loudness: Option<SegmentLoudness>,
}

impl ActiveInterval {
    fn refresh(&mut self, position_ms: Millis) {
        self.elapsed_ms = position_ms - self.start_ms;
        self.progress = if self.duration_ms > 0.0 {
            ease(self.elapsed_ms / self.duration_ms)
        } else {
            1.0
        };
    }
}

/// Everything a successful sync attempt hands to the session.
#[derive(Clone, Debug)]
pub struct TrackSync {
    pub sample: PlaybackSample,
    pub analysis: TrackAnalysis,
    pub features: TrackFeatures,
    /// Reported progress plus the time the analysis fetch took.
    pub progress_ms: Millis,
    pub now_ms: Millis,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied { first: bool },
    /// A newer sync attempt started (or playback stopped) in the meantime.
    Stale,
}

/// Read-only view of the session handed to renderers.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub phase: SyncPhase,
    pub is_active: bool,
    pub current_track: Option<TrackInfo>,
    pub previous_track: Option<TrackInfo>,
    pub features: Option<TrackFeatures>,
    pub track_progress_ms: Millis,
    pub reported_progress_ms: Millis,
    pub track_duration_ms: Millis,
    pub volume: f64,
    pub intervals: [Option<ActiveInterval>; 5],
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub playlist_name: Option<String>,
}

impl Snapshot {
    pub fn interval(&self, kind: IntervalKind) -> Option<&ActiveInterval> {
        self.intervals[kind.index()].as_ref()
    }
}

/// Single owner of all synchronisation state.
///
/// Written by the poll cycle (`record_*`, `begin_sync`, `apply_sync`) and by
/// the frame loop (`tick`); callers serialise access.
#[derive(Debug)]
pub struct Session {
    phase: SyncPhase,
    phase_before_sync: SyncPhase,
    epoch: u64,
    initialized: bool,
    active: bool,
    analysis: Option<TrackAnalysis>,
    features: Option<TrackFeatures>,
    current_track: Option<TrackInfo>,
    previous_track: Option<TrackInfo>,
    context_href: Option<String>,
    playlist_name: Option<String>,
    shuffle: bool,
    repeat: RepeatMode,
    clock: PlaybackClock,
    track_progress_ms: Millis,
    reported_progress_ms: Millis,
    intervals: [Option<ActiveInterval>; 5],
    smoother: VolumeSmoother,
    volume: f64,
}

impl Session {
    pub fn new(volume_smoothing: usize) -> Self {
        Self {
            phase: SyncPhase::Uninitialized,
            phase_before_sync: SyncPhase::Uninitialized,
            epoch: 0,
            initialized: false,
            active: false,
            analysis: None,
            features: None,
            current_track: None,
            previous_track: None,
            context_href: None,
            playlist_name: None,
            shuffle: false,
            repeat: RepeatMode::Off,
            clock: PlaybackClock::new(),
            track_progress_ms: 0.0,
            reported_progress_ms: 0.0,
            intervals: Default::default(),
            smoother: VolumeSmoother::new(volume_smoothing),
            volume: 0.0,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[cfg(test)]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[cfg(test)]
    pub fn clock(&self) -> super::clock::ClockState {
        self.clock.state()
    }

    #[cfg(test)]
    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    pub fn set_repeat(&mut self, repeat: RepeatMode) {
        self.repeat = repeat;
    }

    pub fn set_shuffle(&mut self, shuffle: bool) {
        self.shuffle = shuffle;
    }

    #[cfg(test)]
    pub fn current_track(&self) -> Option<&TrackInfo> {
        self.current_track.as_ref()
    }

    #[cfg(test)]
    pub fn interval(&self, kind: IntervalKind) -> Option<&ActiveInterval> {
        self.intervals[kind.index()].as_ref()
    }

    /// A poll failed before producing a sample.
    pub fn record_poll_failure(&mut self) {
        if self.phase == SyncPhase::Uninitialized {
            self.phase = SyncPhase::Polling;
        }
    }

    /// The player reports nothing playing. Freezes the clock and invalidates
    /// any in-flight sync.
    pub fn record_not_playing(&mut self) {
        if self.active {
            log::info!("Playback stopped; session idle");
        }
        self.active = false;
        self.epoch += 1;
        self.phase = if self.initialized {
            SyncPhase::Idle
        } else {
            SyncPhase::Polling
        };
    }

    /// Record a playing sample. Returns whether the track must be (re)synced.
    pub fn record_sample(&mut self, sample: &PlaybackSample) -> bool {
        self.reported_progress_ms = sample.progress_ms;
        if self.phase == SyncPhase::Uninitialized {
            self.phase = SyncPhase::Polling;
        }
        let same_track = self
            .current_track
            .as_ref()
            .is_some_and(|track| track.id == sample.track.id);
        !self.initialized || !same_track || !self.active
    }

    /// Start a sync attempt and return its epoch.
    pub fn begin_sync(&mut self) -> u64 {
        self.epoch += 1;
        if self.phase != SyncPhase::Syncing {
            self.phase_before_sync = self.phase;
        }
        self.phase = SyncPhase::Syncing;
        self.epoch
    }

    /// Give up on a sync attempt, leaving the previous track's state in place.
    pub fn abort_sync(&mut self, epoch: u64) {
        if epoch == self.epoch && self.phase == SyncPhase::Syncing {
            self.phase = self.phase_before_sync;
        }
    }

    pub fn apply_sync(&mut self, epoch: u64, sync: TrackSync) -> ApplyOutcome {
        if epoch != self.epoch {
            log::debug!(
                "Discarding sync for '{}' (epoch {} superseded by {})",
                sync.sample.track.name,
                epoch,
                self.epoch
            );
            return ApplyOutcome::Stale;
        }

        let sample = sync.sample;
        let changed = self
            .current_track
            .as_ref()
            .map_or(true, |track| track.id != sample.track.id);
        if changed {
            if let Some(track) = &self.current_track {
                log::info!("Track changed from '{}' to '{}'", track.name, sample.track.name);
            }
            self.previous_track = self.current_track.take();
        }
        if self.context_href != sample.context_href {
            self.playlist_name = None;
        }

        self.current_track = Some(sample.track);
        self.context_href = sample.context_href;
        self.shuffle = sample.shuffle;
        self.repeat = sample.repeat;
        self.analysis = Some(sync.analysis);
        self.features = Some(sync.features);
        self.clock.seed(sync.progress_ms, sync.now_ms);
        self.track_progress_ms = sync.progress_ms;
        self.intervals = Default::default();

        let first = !self.initialized;
        self.initialized = true;
        self.active = true;
        self.phase = SyncPhase::Active;
        ApplyOutcome::Applied { first }
    }

    /// Best-effort context name for the current sync. Ignored when stale.
    pub fn set_playlist_name(&mut self, epoch: u64, name: String) {
        if epoch == self.epoch {
            self.playlist_name = Some(name);
        }
    }

    /// Advance one display frame. Returns the intervals that changed, in
    /// finest-to-coarsest order.
    pub fn tick(&mut self, now_ms: Millis) -> Vec<ActiveInterval> {
        if !self.active {
            return Vec::new();
        }
        let Some(analysis) = self.analysis.as_ref() else {
            return Vec::new();
        };

        self.clock.mark_loop_started(now_ms);
        let position = self.clock.estimate(now_ms);
        self.track_progress_ms = position;

        let mut changes = Vec::new();
        for kind in IntervalKind::ALL {
            let series = analysis.series(kind);
            let index = resolve(series, position);
            let slot = &mut self.intervals[kind.index()];

            let changed = slot.as_ref().map_or(true, |active| active.index != index);
            if changed {
                let interval = &series[index];
                *slot = Some(ActiveInterval {
                    kind,
                    index,
                    start_ms: interval.start_ms,
                    duration_ms: interval.duration_ms,
                    confidence: interval.confidence,
                    elapsed_ms: 0.0,
                    progress: 0.0,
                    loudness: interval.loudness.clone(),
                });
            }

            if let Some(active) = slot.as_mut() {
                active.refresh(position);
                if changed {
                    changes.push(active.clone());
                }
            }
        }

        let sample = segment_volume(analysis, self.intervals[IntervalKind::Segment.index()].as_ref());
        self.volume = self.smoother.push(sample);

        changes
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            is_active: self.active,
            current_track: self.current_track.clone(),
            previous_track: self.previous_track.clone(),
            features: self.features.clone(),
            track_progress_ms: self.track_progress_ms,
            reported_progress_ms: self.reported_progress_ms,
            track_duration_ms: self
                .features
                .as_ref()
                .map(|f| f.duration_ms)
                .or_else(|| self.analysis.as_ref().map(|a| a.duration_ms()))
                .unwrap_or(0.0),
            volume: self.volume,
            intervals: self.intervals.clone(),
            shuffle: self.shuffle,
            repeat: self.repeat,
            playlist_name: self.playlist_name.clone(),
        }
    }
}

fn segment_volume(analysis: &TrackAnalysis, segment: Option<&ActiveInterval>) -> f64 {
    let Some(segment) = segment else {
        return 0.0;
    };
    let Some(loudness) = segment.loudness.as_ref() else {
        return 0.0;
    };
    let next = analysis
        .series(IntervalKind::Segment)
        .get(segment.index + 1)
        .and_then(|next| next.loudness.as_ref())
        .map(|next| next.loudness_start);
    volume::instantaneous(loudness, segment.duration_ms, segment.elapsed_ms, next)
}
