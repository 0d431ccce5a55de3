//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Play, record and transcode Ogg Vorbis audio.
#[derive(Parser)]
#[command(name = "oggbridge")]
#[command(about = "Play, record and transcode Ogg Vorbis audio")]
#[command(version)]
pub struct Cli {
    /// JSON settings file (buffer threshold, pause poll interval, recording defaults)
    #[arg(long, env = "OGGBRIDGE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
