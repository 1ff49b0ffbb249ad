mod analysis;
mod api;
mod cli;
mod config;
mod library;
mod sync;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use analysis::IntervalKind;
use api::spotify::{Credentials, SpotifyClient};
use api::{ApiError, PlaybackApi};
use cli::{Cli, Command, ControlAction};
use config::Config;
use sync::{Controller, Hooks, MonotonicTime, PollSchedule, Runner, Session, Syncer};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect pulsesync.toml / user config
    let config = match cli.config.clone().or_else(config::find_config) {
        Some(path) => match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(err) => {
                log::warn!("{:#}", err);
                Config::default()
            }
        },
        None => Config::default(),
    };

    let credentials = resolve_credentials(&cli, &config)?;
    let has_access_token = !credentials.access_token.is_empty();
    let api = Arc::new(SpotifyClient::new(
        &config.api.base_url,
        &config.api.refresh_url,
        Duration::from_millis(config.api.timeout_ms),
        credentials,
    )?);
    if !has_access_token {
        log::info!("No access token given; requesting one with the refresh token");
        api.refresh_credential().context("Initial token refresh failed")?;
    }

    match cli.command {
        Command::Run { ping_delay, smoothing, fps } => {
            // Config values apply only when the CLI is at its default
            let ping_delay = if ping_delay == config::default_ping_delay_ms() {
                config.sync.ping_delay_ms
            } else {
                ping_delay
            };
            let smoothing = if smoothing == config::default_volume_smoothing() {
                config.sync.volume_smoothing
            } else {
                smoothing
            };
            let fps = if fps == config::default_frame_rate() {
                config.sync.frame_rate
            } else {
                fps
            };
            run(api, &config, ping_delay, smoothing, fps)
        }
        Command::Control { action } => control(api, action),
        Command::Saved => saved(api.as_ref()),
    }
}

/// CLI flag, then environment, then config file.
fn resolve_credentials(cli: &Cli, config: &Config) -> Result<Credentials> {
    let pick = |flag: &Option<String>, env: &str, file: &Option<String>| {
        flag.clone()
            .or_else(|| std::env::var(env).ok())
            .or_else(|| file.clone())
            .unwrap_or_default()
    };
    let credentials = Credentials {
        access_token: pick(&cli.access_token, "PULSESYNC_ACCESS_TOKEN", &config.credentials.access_token),
        refresh_token: pick(&cli.refresh_token, "PULSESYNC_REFRESH_TOKEN", &config.credentials.refresh_token),
    };
    if credentials.access_token.is_empty() && credentials.refresh_token.is_empty() {
        anyhow::bail!(
            "No credentials: pass --access-token/--refresh-token, set PULSESYNC_ACCESS_TOKEN, \
             or add a [credentials] section to the config"
        );
    }
    Ok(credentials)
}

fn run(api: Arc<SpotifyClient>, config: &Config, ping_delay: u64, smoothing: usize, fps: f64) -> Result<()> {
    log::info!("pulsesync - playback-synchronised visuals");
    log::info!("Poll every {}ms, volume smoothing {}, {} fps", ping_delay, smoothing, fps);

    let time = Arc::new(MonotonicTime::new());
    let session = Arc::new(Mutex::new(Session::new(smoothing)));
    let syncer = Syncer::new(api, Arc::clone(&time), session);
    let schedule = PollSchedule::new(
        Duration::from_millis(ping_delay),
        Duration::from_millis(config.sync.max_backoff_ms),
    );

    Runner::new(syncer, time, schedule, log_renderer(), fps).run()
}

/// Stand-in renderer that reports what a visualizer would react to.
fn log_renderer() -> Hooks {
    let mut hooks = Hooks::new();
    hooks.on(IntervalKind::Section, |section| {
        log::info!("Section {} ({:.1}s)", section.index, section.duration_ms / 1000.0);
    });
    hooks.on(IntervalKind::Bar, |bar| {
        log::info!("Bar {} ({:.0}ms)", bar.index, bar.duration_ms);
    });
    hooks.on(IntervalKind::Beat, |beat| {
        log::debug!("Beat {} (confidence {:.2})", beat.index, beat.confidence);
    });
    hooks.on(IntervalKind::Segment, |segment| log::trace!("Segment {}", segment.index));
    hooks.on(IntervalKind::Tatum, |tatum| log::trace!("Tatum {}", tatum.index));
    hooks.on_frame(|snapshot| {
        let beat = snapshot
            .interval(IntervalKind::Beat)
            .map_or(0.0, |beat| beat.progress);
        log::trace!(
            "{:>6.0}/{:.0}ms volume {:.2} beat {:.2}",
            snapshot.track_progress_ms,
            snapshot.track_duration_ms,
            snapshot.volume,
            beat
        );
    });
    hooks
}

fn control(api: Arc<SpotifyClient>, action: ControlAction) -> Result<()> {
    let session = Arc::new(Mutex::new(Session::new(config::default_volume_smoothing())));
    let controller = Controller::new(api, session);
    if action == ControlAction::Repeat {
        // Repeat cycles from the player's current mode
        match controller.load_repeat().context("Failed to read repeat mode")? {
            Some(mode) => log::debug!("Player repeat: {}", mode.as_str()),
            None => log::warn!("Nothing playing; cycling repeat from off"),
        }
    }

    match action {
        ControlAction::Skip => controller.skip(),
        ControlAction::Previous => controller.previous(),
        ControlAction::Pause => controller.pause(),
        ControlAction::Resume => controller.resume(),
        ControlAction::ShuffleOn => controller.set_shuffle(true),
        ControlAction::ShuffleOff => controller.set_shuffle(false),
        ControlAction::Repeat => {
            let mode = controller.toggle_repeat();
            log::info!("Repeat: {}", mode.as_str());
        }
    }
    Ok(())
}

fn saved(api: &SpotifyClient) -> Result<()> {
    // Unlike the poll loop, which refreshes and waits for the next cycle, a
    // one-shot command has no next cycle: refresh and ask again once
    let tracks = match api.saved_tracks() {
        Err(ApiError::Unauthorized) => {
            api.refresh_credential().context("Token refresh failed")?;
            api.saved_tracks()
        }
        other => other,
    }
    .context("Failed to fetch saved tracks")?;

    log::info!("{} saved tracks", tracks.len());
    for row in library::format_saved(&tracks) {
        println!("{}", row);
    }
    Ok(())
}
