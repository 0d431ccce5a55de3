//! Offline decode and encode handlers.
//!
//! Both run the same controllers as live playback and recording, with a
//! file-backed sink or source in place of the audio device.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use oggbridge_core::{
    Player, PlayerConfig, PlayerEvent, ReaderSource, Recorder, RecorderEvent, WriterSink,
};
use tokio::sync::mpsc;

use crate::bootstrap::CliContext;
use crate::commands::EncodeArgs;
use crate::error::CliError;
use crate::handlers::session::{WatchOptions, recorder_outcome, watch_player};

/// Decode `input` to raw interleaved s16le PCM in `output`.
pub async fn decode(ctx: &CliContext, input: &Path, output: &Path) -> Result<(), CliError> {
    let sink = WriterSink::new(BufWriter::new(File::create(output)?));
    let (tx, rx) = mpsc::unbounded_channel::<PlayerEvent>();
    let player = Player::from_file(
        ctx.engine(),
        input,
        sink,
        Arc::new(tx),
        PlayerConfig::from_settings(ctx.settings(), false),
    );

    player.start()?;
    watch_player(&player, rx, WatchOptions::quiet()).await?;
    tracing::info!(input = %input.display(), output = %output.display(), "Decoded");
    Ok(())
}

/// Encode raw interleaved s16le PCM from `input` into `output`.
pub async fn encode(
    ctx: &CliContext,
    input: &Path,
    output: &Path,
    args: &EncodeArgs,
) -> Result<(), CliError> {
    let settings = ctx.settings();
    let source = ReaderSource::new(BufReader::new(File::open(input)?));
    let (tx, mut rx) = mpsc::unbounded_channel::<RecorderEvent>();
    let recorder = Recorder::to_file(ctx.engine(), source, output, Arc::new(tx));

    recorder.start(args.sample_rate(settings), args.channels(settings), args.mode(settings))?;

    while let Some(RecorderEvent::Status(status)) = rx.recv().await {
        if let Some(outcome) = recorder_outcome(status) {
            outcome?;
            tracing::info!(input = %input.display(), output = %output.display(), "Encoded");
            return Ok(());
        }
    }
    Ok(())
}
