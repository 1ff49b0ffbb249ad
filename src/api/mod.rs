pub mod model;
pub mod spotify;

use thiserror::Error;

use model::{PlayerState, RawAnalysis, RepeatMode, SavedTrack, TrackFeatures};

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ApiError {
    #[error("unauthorized (access token expired or revoked)")]
    Unauthorized,
    #[error("service unavailable (HTTP {0})")]
    TransientService(u16),
    #[error("network failure: {0}")]
    Network(String),
    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ApiError::Unauthorized,
            429 | 500..=599 => ApiError::TransientService(status),
            other => ApiError::UnexpectedStatus(other),
        }
    }

    /// Errors that the next poll is expected to clear on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::TransientService(_) | ApiError::Network(_))
    }
}

/// A fire-and-forget request against the player control endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerCommand {
    Skip,
    Previous,
    Pause,
    Resume,
    Shuffle(bool),
    Repeat(RepeatMode),
}

/// The streaming service as seen by the sync core.
///
/// Every call carries the current bearer credential. `refresh_credential`
/// swaps that credential in place, so implementations use interior mutability.
pub trait PlaybackApi: Send + Sync {
    /// `Ok(None)` when nothing is playing (no active device / 204).
    fn playback_state(&self) -> Result<Option<PlayerState>, ApiError>;
    fn track_analysis(&self, track_id: &str) -> Result<RawAnalysis, ApiError>;
    fn track_features(&self, track_id: &str) -> Result<TrackFeatures, ApiError>;
    /// Display name of a playback context (playlist, album) given its href.
    fn context_name(&self, href: &str) -> Result<String, ApiError>;
    fn saved_tracks(&self) -> Result<Vec<SavedTrack>, ApiError>;
    fn send_command(&self, command: PlayerCommand) -> Result<(), ApiError>;
    fn refresh_credential(&self) -> Result<(), ApiError>;
}
