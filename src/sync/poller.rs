use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;

use crate::analysis::{normalize, AnalysisError};
use crate::api::{ApiError, PlaybackApi};

use super::clock::TimeSource;
use super::session::{ApplyOutcome, PlaybackSample, Session, TrackSync};

pub type SharedSession = Arc<Mutex<Session>>;

pub(crate) fn lock(session: &SharedSession) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Error, PartialEq)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// What one poll cycle did.
#[derive(Clone, Debug, PartialEq)]
pub enum PollOutcome {
    /// Nothing is playing; the session is idle.
    NotPlaying,
    /// Still playing the synced track; nothing fetched.
    InSync,
    /// Analysis fetched and applied. `first` marks the cold-start sync.
    Synced { track_id: String, first: bool },
    /// Analysis fetched, but a newer attempt took over before it was applied.
    Superseded,
    /// A call was rejected as unauthorized and the credential was refreshed.
    /// The rejected call is not retried; the next poll uses the new token.
    CredentialsRefreshed,
}

/// Poll delay with exponential backoff on consecutive transient failures.
/// Any other outcome, including a non-transient error, restores the base delay.
#[derive(Clone, Debug)]
pub struct PollSchedule {
    base: Duration,
    max: Duration,
    failures: u32,
}

impl PollSchedule {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            failures: 0,
        }
    }

    pub fn next_delay(&mut self, result: &Result<PollOutcome, SyncError>) -> Duration {
        match result {
            Err(SyncError::Api(err)) if err.is_transient() => {
                self.failures = self.failures.saturating_add(1);
                let factor = 2u32.saturating_pow(self.failures.min(16));
                self.base.saturating_mul(factor).min(self.max)
            }
            _ => {
                if self.failures > 0 {
                    log::info!("Polling recovered after {} failure(s)", self.failures);
                }
                self.failures = 0;
                self.base
            }
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}

/// The network-facing half of the sync state machine.
///
/// Each [`poll_once`](Syncer::poll_once) asks the player for its state and,
/// when the track changed or playback resumed, fetches and applies the
/// track's analysis. The session lock is never held across a request.
pub struct Syncer<A, T> {
    api: Arc<A>,
    time: Arc<T>,
    session: SharedSession,
}

impl<A: PlaybackApi, T: TimeSource> Syncer<A, T> {
    pub fn new(api: Arc<A>, time: Arc<T>, session: SharedSession) -> Self {
        Self { api, time, session }
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn poll_once(&self) -> Result<PollOutcome, SyncError> {
        let result = self.poll();
        match result {
            Err(SyncError::Api(ApiError::Unauthorized)) => {
                log::warn!("Request unauthorized; refreshing access token");
                self.api.refresh_credential()?;
                Ok(PollOutcome::CredentialsRefreshed)
            }
            Err(err) => {
                lock(&self.session).record_poll_failure();
                Err(err)
            }
            ok => ok,
        }
    }

    fn poll(&self) -> Result<PollOutcome, SyncError> {
        let state = self.api.playback_state()?;
        let now = self.time.now_ms();
        let sample = state
            .as_ref()
            .and_then(|state| PlaybackSample::from_player_state(state, now))
            .filter(|sample| sample.is_playing);

        let Some(sample) = sample else {
            lock(&self.session).record_not_playing();
            return Ok(PollOutcome::NotPlaying);
        };

        let epoch = {
            let mut session = lock(&self.session);
            if !session.record_sample(&sample) {
                return Ok(PollOutcome::InSync);
            }
            session.begin_sync()
        };

        self.sync_track(sample, epoch).map_err(|err| {
            lock(&self.session).abort_sync(epoch);
            err
        })
    }

    fn sync_track(&self, sample: PlaybackSample, epoch: u64) -> Result<PollOutcome, SyncError> {
        log::info!(
            "Syncing '{}' by {} at {:.0}ms",
            sample.track.name,
            sample.track.artist,
            sample.progress_ms
        );

        let started = self.time.now_ms();
        let track_id = sample.track.id.as_str();
        let (analysis, features) = rayon::join(
            || self.api.track_analysis(track_id),
            || self.api.track_features(track_id),
        );
        let (analysis, features) = (analysis?, features?);
        let analysis = normalize(&analysis, sample.track.duration_ms)?;
        let now = self.time.now_ms();

        let track_id = sample.track.id.clone();
        let context_href = sample.context_href.clone();
        let sync = TrackSync {
            progress_ms: sample.progress_ms + (now - started),
            sample,
            analysis,
            features,
            now_ms: now,
        };

        let first = match lock(&self.session).apply_sync(epoch, sync) {
            ApplyOutcome::Stale => return Ok(PollOutcome::Superseded),
            ApplyOutcome::Applied { first } => first,
        };

        if let Some(href) = context_href {
            self.lookup_context_name(epoch, &href);
        }

        Ok(PollOutcome::Synced { track_id, first })
    }

    /// Best-effort; only an unauthorized response has any effect.
    fn lookup_context_name(&self, epoch: u64, href: &str) {
        match self.api.context_name(href) {
            Ok(name) => lock(&self.session).set_playlist_name(epoch, name),
            Err(ApiError::Unauthorized) => {
                if let Err(err) = self.api.refresh_credential() {
                    log::warn!("Token refresh failed: {}", err);
                }
            }
            Err(err) => log::debug!("Playlist name lookup failed: {}", err),
        }
    }
}
