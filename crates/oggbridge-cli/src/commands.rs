//! Main commands enum and encoder options.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use oggbridge_core::{EncodeMode, Settings};

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Print the sample rate, channels, vendor and duration of an Ogg Vorbis file
    Info {
        /// Path to the .ogg file
        file: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Play a file on the default output device
    ///
    /// While playing, type `p` to pause, `r` to resume, `s <seconds>` to seek
    /// and `q` to stop, each followed by Enter.
    Play {
        /// Path to the .ogg file
        file: PathBuf,
        /// Start position in seconds
        #[arg(long)]
        seek: Option<i64>,
    },

    /// Play an unseekable stream with pre-roll buffering
    Stream {
        /// Path to read from, or `-` for stdin
        input: String,
        /// Samples to buffer before output starts (overrides settings)
        #[arg(long)]
        threshold: Option<u64>,
    },

    /// Record from the default input device until Enter is pressed
    Record {
        /// Output .ogg path
        output: PathBuf,
        #[command(flatten)]
        encode: EncodeArgs,
        /// Stop automatically after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
    },

    /// Decode an Ogg Vorbis file to raw interleaved s16le PCM
    Decode {
        /// Input .ogg path
        input: PathBuf,
        /// Output raw PCM path
        output: PathBuf,
    },

    /// Encode raw interleaved s16le PCM to Ogg Vorbis
    Encode {
        /// Input raw PCM path
        input: PathBuf,
        /// Output .ogg path
        output: PathBuf,
        #[command(flatten)]
        encode: EncodeArgs,
    },
}

/// Encoder parameters shared by `record` and `encode`.
///
/// Anything left unset falls back to the settings file, then to built-in
/// defaults.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct EncodeArgs {
    /// Sample rate in Hz
    #[arg(long, env = "OGGBRIDGE_SAMPLE_RATE")]
    pub rate: Option<u32>,
    /// Channel count (1 or 2)
    #[arg(long, env = "OGGBRIDGE_CHANNELS")]
    pub channels: Option<u16>,
    /// VBR quality from -0.1 to 1.0
    #[arg(long, conflicts_with = "bitrate", allow_negative_numbers = true)]
    pub quality: Option<f32>,
    /// Average bitrate in bits per second
    #[arg(long)]
    pub bitrate: Option<u32>,
}

impl EncodeArgs {
    pub fn sample_rate(&self, settings: &Settings) -> u32 {
        self.rate.unwrap_or_else(|| settings.effective_sample_rate())
    }

    pub fn channels(&self, settings: &Settings) -> u16 {
        self.channels.unwrap_or_else(|| settings.effective_channels())
    }

    /// Bitrate wins when given; otherwise VBR at the requested or default quality.
    pub fn mode(&self, settings: &Settings) -> EncodeMode {
        match (self.bitrate, self.quality) {
            (Some(bitrate), _) => EncodeMode::Bitrate(bitrate),
            (None, Some(quality)) => EncodeMode::Quality(quality),
            (None, None) => EncodeMode::Quality(settings.effective_quality()),
        }
    }
}
