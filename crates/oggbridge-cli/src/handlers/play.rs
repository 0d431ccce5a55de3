//! Play and stream command handlers.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use oggbridge_audio::{AudioThreadHandle, DeviceSink};
use oggbridge_core::{Player, PlayerConfig, PlayerEvent, validate_settings};
use tokio::sync::mpsc;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::handlers::session::{WatchOptions, watch_player};

/// Play a seekable file on the default output device.
///
/// `seek` requests a start position before the session begins; the engine
/// honours it on its first seek poll.
pub async fn execute(ctx: &CliContext, file: &Path, seek: Option<i64>) -> Result<(), CliError> {
    let audio = AudioThreadHandle::shared()?;
    let (tx, rx) = mpsc::unbounded_channel::<PlayerEvent>();
    let player = Player::from_file(
        ctx.engine(),
        file,
        DeviceSink::new(audio),
        Arc::new(tx),
        PlayerConfig::from_settings(ctx.settings(), false),
    );
    if let Some(seconds) = seek {
        player.seek_to_seconds(seconds);
    }

    println!("Playing {} (p pause, r resume, s <seconds> seek, q stop)", file.display());
    player.start()?;
    watch_player(&player, rx, WatchOptions::interactive()).await
}

/// Play a byte stream with pre-roll buffering. `-` reads stdin, which also
/// turns off interactive control.
pub async fn stream(ctx: &CliContext, input: &str, threshold: Option<u64>) -> Result<(), CliError> {
    let mut settings = ctx.settings().clone();
    if threshold.is_some() {
        settings.buffer_threshold_samples = threshold;
    }
    validate_settings(&settings)?;

    let from_stdin = input == "-";
    let reader: Box<dyn Read + Send> = if from_stdin {
        Box::new(io::stdin())
    } else {
        Box::new(BufReader::new(File::open(input)?))
    };

    let audio = AudioThreadHandle::shared()?;
    let (tx, rx) = mpsc::unbounded_channel::<PlayerEvent>();
    let player = Player::buffered(ctx.engine(), reader, DeviceSink::new(audio), Arc::new(tx), &settings);

    tracing::info!(
        input,
        threshold = settings.effective_buffer_threshold_samples(),
        "Streaming"
    );
    player.start()?;

    let options = WatchOptions {
        interactive: !from_stdin,
        show_progress: true,
    };
    watch_player(&player, rx, options).await
}
