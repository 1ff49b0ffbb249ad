use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, CONTENT_LENGTH};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::model::{
    PlayerState, PlaylistRef, RawAnalysis, SavedTrack, SavedTracksPage, TokenResponse,
    TrackFeatures,
};
use super::{ApiError, PlaybackApi, PlayerCommand};

/// Bearer credential pair. The access token is replaced on refresh.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
}

/// Blocking Web API client for the Spotify player, analysis and library
/// endpoints.
pub struct SpotifyClient {
    http: Client,
    base_url: String,
    refresh_url: String,
    credentials: RwLock<Credentials>,
}

impl SpotifyClient {
    pub fn new(
        base_url: &str,
        refresh_url: &str,
        timeout: Duration,
        credentials: Credentials,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            refresh_url: refresh_url.to_string(),
            credentials: RwLock::new(credentials),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn access_token(&self) -> String {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access_token
            .clone()
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(self.access_token())
            .header(ACCEPT, "application/json")
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .send()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_status(status.as_u16()))
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self.send(self.authorized(self.http.get(url)))?;
        decode(response)
    }
}

fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = response
        .bytes()
        .map_err(|e| ApiError::Network(e.to_string()))?;
    serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

impl PlaybackApi for SpotifyClient {
    fn playback_state(&self) -> Result<Option<PlayerState>, ApiError> {
        let response = self.send(self.authorized(self.http.get(self.url("me/player"))))?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body = response
            .bytes()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        if body.is_empty() {
            return Ok(None);
        }
        let state: PlayerState =
            serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(Some(state))
    }

    fn track_analysis(&self, track_id: &str) -> Result<RawAnalysis, ApiError> {
        self.get_json(&self.url(&format!("audio-analysis/{}", track_id)))
    }

    fn track_features(&self, track_id: &str) -> Result<TrackFeatures, ApiError> {
        self.get_json(&self.url(&format!("audio-features/{}", track_id)))
    }

    fn context_name(&self, href: &str) -> Result<String, ApiError> {
        let playlist: PlaylistRef = self.get_json(href)?;
        Ok(playlist.name)
    }

    fn saved_tracks(&self) -> Result<Vec<SavedTrack>, ApiError> {
        let mut tracks = Vec::new();
        let mut next = Some(self.url("me/tracks"));
        while let Some(url) = next {
            let page: SavedTracksPage = self.get_json(&url)?;
            log::debug!("Fetched {} saved tracks from {}", page.items.len(), url);
            tracks.extend(page.items);
            next = page.next;
        }
        Ok(tracks)
    }

    fn send_command(&self, command: PlayerCommand) -> Result<(), ApiError> {
        let request = match command {
            PlayerCommand::Skip => self.http.post(self.url("me/player/next")),
            PlayerCommand::Previous => self.http.post(self.url("me/player/previous")),
            PlayerCommand::Pause => self.http.put(self.url("me/player/pause")),
            PlayerCommand::Resume => self.http.put(self.url("me/player/play")),
            PlayerCommand::Shuffle(on) => self
                .http
                .put(self.url("me/player/shuffle"))
                .query(&[("state", if on { "true" } else { "false" })]),
            PlayerCommand::Repeat(mode) => self
                .http
                .put(self.url("me/player/repeat"))
                .query(&[("state", mode.as_str())]),
        };
        self.send(self.authorized(request).header(CONTENT_LENGTH, "0"))?;
        Ok(())
    }

    fn refresh_credential(&self) -> Result<(), ApiError> {
        let refresh_token = self
            .credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh_token
            .clone();
        let response = self.send(
            self.http
                .get(&self.refresh_url)
                .query(&[("token", refresh_token.as_str())]),
        )?;
        let token: TokenResponse = decode(response)?;
        self.credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .access_token = token.access_token;
        log::info!("Access token refreshed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SpotifyClient {
        SpotifyClient::new(
            "https://api.example/v1/",
            "http://localhost:8001/refresh",
            Duration::from_secs(1),
            Credentials {
                access_token: "a".into(),
                refresh_token: "r".into(),
            },
        )
        .unwrap()
    }

    #[test]
    fn joins_urls_without_double_slashes() {
        let c = client();
        assert_eq!(c.url("me/player"), "https://api.example/v1/me/player");
        assert_eq!(c.url("/audio-analysis/x"), "https://api.example/v1/audio-analysis/x");
    }

    #[test]
    fn exposes_current_access_token() {
        assert_eq!(client().access_token(), "a");
    }
}
