use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::{default_frame_rate, default_ping_delay_ms, default_volume_smoothing};

#[derive(Parser, Debug)]
#[command(name = "pulsesync", about = "Sync visuals to the music playing on Spotify")]
pub struct Cli {
    /// Config file (defaults to pulsesync.toml or the user config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Bearer access token (overrides config and PULSESYNC_ACCESS_TOKEN)
    #[arg(long, global = true)]
    pub access_token: Option<String>,

    /// Refresh token (overrides config and PULSESYNC_REFRESH_TOKEN)
    #[arg(long, global = true)]
    pub refresh_token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Follow playback and report interval changes and volume
    Run {
        /// Delay between playback polls in milliseconds
        #[arg(long, default_value_t = default_ping_delay_ms())]
        ping_delay: u64,

        /// Number of frames the displayed volume is averaged over
        #[arg(long, default_value_t = default_volume_smoothing())]
        smoothing: usize,

        /// Frame loop rate
        #[arg(long, default_value_t = default_frame_rate())]
        fps: f64,
    },
    /// Send one playback command
    Control {
        #[arg(value_enum)]
        action: ControlAction,
    },
    /// List saved tracks
    Saved,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlAction {
    Skip,
    Previous,
    Pause,
    Resume,
    ShuffleOn,
    ShuffleOff,
    Repeat,
}
