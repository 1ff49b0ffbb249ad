use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Token refresh route of the auth server, called as `?token=<refresh>`.
    #[serde(default = "default_refresh_url")]
    pub refresh_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_ping_delay_ms")]
    pub ping_delay_ms: u64,
    #[serde(default = "default_volume_smoothing")]
    pub volume_smoothing: usize,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            refresh_url: default_refresh_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ping_delay_ms: default_ping_delay_ms(),
            volume_smoothing: default_volume_smoothing(),
            frame_rate: default_frame_rate(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_base_url() -> String { "https://api.spotify.com/v1".into() }
fn default_refresh_url() -> String { "http://localhost:8001/refresh".into() }
fn default_timeout_ms() -> u64 { 5000 }
pub fn default_ping_delay_ms() -> u64 { 500 }
pub fn default_volume_smoothing() -> usize { 100 }
pub fn default_frame_rate() -> f64 { 60.0 }
fn default_max_backoff_ms() -> u64 { 8000 }

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config {}", path.display()))
}

/// `pulsesync.toml` in the working directory, then the per-user config dirs.
pub fn find_config() -> Option<PathBuf> {
    let local = PathBuf::from("pulsesync.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("pulsesync").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("pulsesync").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.sync.ping_delay_ms, 500);
        assert_eq!(config.sync.volume_smoothing, 100);
        assert_eq!(config.api.base_url, "https://api.spotify.com/v1");
        assert!(config.credentials.access_token.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [sync]
            volume_smoothing = 10

            [credentials]
            refresh_token = "r"
            "#,
        )
        .unwrap();
        assert_eq!(config.sync.volume_smoothing, 10);
        assert_eq!(config.sync.frame_rate, 60.0);
        assert_eq!(config.credentials.refresh_token.as_deref(), Some("r"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_config(Path::new("/nonexistent/pulsesync.toml")).is_err());
    }
}
