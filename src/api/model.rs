use serde::Deserialize;

/// Response body of `GET /me/player`.
#[derive(Clone, Debug, Deserialize)]
pub struct PlayerState {
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<f64>,
    #[serde(default)]
    pub shuffle_state: bool,
    #[serde(default)]
    pub repeat_state: RepeatMode,
    #[serde(default)]
    pub context: Option<PlaybackContext>,
    #[serde(default)]
    pub item: Option<TrackItem>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PlaybackContext {
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    Context,
    Track,
}

impl RepeatMode {
    /// Next mode in the player's repeat button cycle.
    pub fn cycled(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::Context,
            RepeatMode::Context => RepeatMode::Track,
            RepeatMode::Track => RepeatMode::Off,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RepeatMode::Off => "off",
            RepeatMode::Context => "context",
            RepeatMode::Track => "track",
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TrackItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub duration_ms: f64,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub album: Option<AlbumRef>,
}

#[allow(dead_code)]
#[derive(Clone, Debug, Deserialize)]
pub struct ArtistRef {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AlbumRef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Image {
    pub url: String,
}

/// Track metadata published to renderers.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackInfo {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album_art_url: Option<String>,
    pub duration_ms: f64,
}

impl From<&TrackItem> for TrackInfo {
    fn from(item: &TrackItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            artist: item
                .artists
                .first()
                .map(|a| a.name.clone())
                .unwrap_or_default(),
            album_art_url: item
                .album
                .as_ref()
                .and_then(|album| album.images.first())
                .map(|image| image.url.clone()),
            duration_ms: item.duration_ms,
        }
    }
}

/// Raw `GET /audio-analysis/{id}` body. Times are in seconds.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawAnalysis {
    #[serde(default)]
    pub tatums: Vec<RawInterval>,
    #[serde(default)]
    pub segments: Vec<RawInterval>,
    #[serde(default)]
    pub beats: Vec<RawInterval>,
    #[serde(default)]
    pub bars: Vec<RawInterval>,
    #[serde(default)]
    pub sections: Vec<RawInterval>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawInterval {
    pub start: f64,
    pub duration: f64,
    #[serde(default)]
    pub confidence: f64,
    // Segment-only fields.
    #[serde(default)]
    pub loudness_start: Option<f64>,
    #[serde(default)]
    pub loudness_max: Option<f64>,
    #[serde(default)]
    pub loudness_max_time: Option<f64>,
    #[serde(default)]
    pub loudness_end: Option<f64>,
    #[serde(default)]
    pub pitches: Option<Vec<f64>>,
    #[serde(default)]
    pub timbre: Option<Vec<f64>>,
}

/// `GET /audio-features/{id}`.
#[allow(dead_code)]
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct TrackFeatures {
    pub duration_ms: f64,
    #[serde(default)]
    pub tempo: f64,
    #[serde(default)]
    pub energy: f64,
    #[serde(default)]
    pub danceability: f64,
    #[serde(default)]
    pub valence: f64,
    #[serde(default)]
    pub loudness: f64,
    #[serde(default)]
    pub key: i32,
    #[serde(default)]
    pub mode: i32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SavedTrack {
    pub added_at: String,
    pub track: TrackItem,
}

/// One page of `GET /me/tracks`.
#[derive(Clone, Debug, Deserialize)]
pub struct SavedTracksPage {
    #[serde(default)]
    pub items: Vec<SavedTrack>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PlaylistRef {
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}
