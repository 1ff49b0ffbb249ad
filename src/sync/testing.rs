//! Scripted collaborators for driving the sync core in tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::analysis::Millis;
use crate::api::model::{
    AlbumRef, ArtistRef, Image, PlaybackContext, PlayerState, RawAnalysis, RawInterval,
    RepeatMode, SavedTrack, TrackFeatures, TrackItem,
};
use crate::api::{ApiError, PlaybackApi, PlayerCommand};

use super::clock::TimeSource;

#[derive(Default)]
pub struct ManualTime {
    now: Mutex<Millis>,
}

impl ManualTime {
    pub fn at(now: Millis) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    pub fn advance(&self, ms: Millis) {
        *self.now.lock().unwrap() += ms;
    }
}

impl TimeSource for ManualTime {
    fn now_ms(&self) -> Millis {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
pub struct Calls {
    pub player: AtomicUsize,
    pub analysis: AtomicUsize,
    pub features: AtomicUsize,
    pub context: AtomicUsize,
    pub saved: AtomicUsize,
    pub refresh: AtomicUsize,
    pub commands: Mutex<Vec<PlayerCommand>>,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// `PlaybackApi` double. Player responses are consumed in order; once the
/// script runs out the last response repeats.
pub struct ScriptedApi {
    pub player: Mutex<VecDeque<Result<Option<PlayerState>, ApiError>>>,
    last_player: Mutex<Option<Result<Option<PlayerState>, ApiError>>>,
    pub analysis: Mutex<Result<RawAnalysis, ApiError>>,
    pub features: Mutex<Result<TrackFeatures, ApiError>>,
    pub context: Mutex<Result<String, ApiError>>,
    pub command: Mutex<Result<(), ApiError>>,
    pub refresh: Mutex<Result<(), ApiError>>,
    pub calls: Calls,
    /// Advanced by `latency_ms` on every analysis fetch.
    pub time: Option<Arc<ManualTime>>,
    pub latency_ms: Millis,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self {
            player: Mutex::new(VecDeque::new()),
            last_player: Mutex::new(None),
            analysis: Mutex::new(Ok(analysis_fixture())),
            features: Mutex::new(Ok(features_fixture(4000.0))),
            context: Mutex::new(Ok("Road Trip".into())),
            command: Mutex::new(Ok(())),
            refresh: Mutex::new(Ok(())),
            calls: Calls::default(),
            time: None,
            latency_ms: 0.0,
        }
    }

    pub fn with_latency(mut self, time: Arc<ManualTime>, latency_ms: Millis) -> Self {
        self.time = Some(time);
        self.latency_ms = latency_ms;
        self
    }

    pub fn script(&self, response: Result<Option<PlayerState>, ApiError>) {
        self.player.lock().unwrap().push_back(response);
    }
}

impl PlaybackApi for ScriptedApi {
    fn playback_state(&self) -> Result<Option<PlayerState>, ApiError> {
        self.calls.player.fetch_add(1, Ordering::SeqCst);
        let next = self.player.lock().unwrap().pop_front();
        let mut last = self.last_player.lock().unwrap();
        if let Some(response) = next {
            *last = Some(response);
        }
        last.clone().unwrap_or(Ok(None))
    }

    fn track_analysis(&self, _track_id: &str) -> Result<RawAnalysis, ApiError> {
        self.calls.analysis.fetch_add(1, Ordering::SeqCst);
        if let Some(time) = &self.time {
            time.advance(self.latency_ms);
        }
        self.analysis.lock().unwrap().clone()
    }

    fn track_features(&self, _track_id: &str) -> Result<TrackFeatures, ApiError> {
        self.calls.features.fetch_add(1, Ordering::SeqCst);
        self.features.lock().unwrap().clone()
    }

    fn context_name(&self, _href: &str) -> Result<String, ApiError> {
        self.calls.context.fetch_add(1, Ordering::SeqCst);
        self.context.lock().unwrap().clone()
    }

    fn saved_tracks(&self) -> Result<Vec<SavedTrack>, ApiError> {
        self.calls.saved.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    fn send_command(&self, command: PlayerCommand) -> Result<(), ApiError> {
        self.calls.commands.lock().unwrap().push(command);
        self.command.lock().unwrap().clone()
    }

    fn refresh_credential(&self) -> Result<(), ApiError> {
        self.calls.refresh.fetch_add(1, Ordering::SeqCst);
        self.refresh.lock().unwrap().clone()
    }
}

pub fn track(id: &str) -> TrackItem {
    TrackItem {
        id: id.to_string(),
        name: format!("Track {}", id),
        duration_ms: 4000.0,
        artists: vec![ArtistRef {
            id: None,
            name: "Artist".into(),
        }],
        album: Some(AlbumRef {
            name: "Album".into(),
            images: vec![Image {
                url: format!("https://img/{}", id),
            }],
        }),
    }
}

pub fn playing(id: &str, progress_ms: Millis) -> PlayerState {
    PlayerState {
        is_playing: true,
        progress_ms: Some(progress_ms),
        shuffle_state: false,
        repeat_state: RepeatMode::Off,
        context: None,
        item: Some(track(id)),
    }
}

pub fn paused(id: &str, progress_ms: Millis) -> PlayerState {
    PlayerState {
        is_playing: false,
        ..playing(id, progress_ms)
    }
}

pub fn with_context(mut state: PlayerState, href: &str) -> PlayerState {
    state.context = Some(PlaybackContext {
        href: Some(href.to_string()),
        uri: None,
    });
    state
}

fn evenly(count: usize, length_s: f64) -> Vec<RawInterval> {
    (0..count)
        .map(|i| RawInterval {
            start: i as f64 * length_s,
            duration: length_s,
            confidence: 0.5,
            ..Default::default()
        })
        .collect()
}

/// Four seconds of analysis: 16 tatums, 4 segments, 8 beats, 2 bars and a
/// single section, all evenly spaced.
pub fn analysis_fixture() -> RawAnalysis {
    let segments = evenly(4, 1.0)
        .into_iter()
        .map(|segment| RawInterval {
            loudness_start: Some(-20.0),
            loudness_max: Some(-5.0),
            loudness_max_time: Some(0.1),
            loudness_end: Some(-20.0),
            pitches: Some(vec![0.0; 12]),
            timbre: Some(vec![0.0; 12]),
            ..segment
        })
        .collect();
    RawAnalysis {
        tatums: evenly(16, 0.25),
        segments,
        beats: evenly(8, 0.5),
        bars: evenly(2, 2.0),
        sections: evenly(1, 4.0),
    }
}

pub fn features_fixture(duration_ms: Millis) -> TrackFeatures {
    TrackFeatures {
        duration_ms,
        tempo: 120.0,
        ..Default::default()
    }
}
