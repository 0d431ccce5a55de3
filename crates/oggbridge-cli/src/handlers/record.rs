//! Record command handler.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use oggbridge_audio::{AudioThreadHandle, DeviceSource};
use oggbridge_core::{Recorder, RecorderEvent};
use tokio::sync::mpsc;

use crate::bootstrap::CliContext;
use crate::commands::EncodeArgs;
use crate::error::CliError;
use crate::handlers::session::{recorder_outcome, spawn_stdin_lines};
use crate::presentation::describe_recorder_status;

/// Record from the default input device into `output`.
///
/// Enter, Ctrl+C or the optional `seconds` limit request a graceful stop,
/// which lets the encoder flush its last frame and the end-of-stream page.
pub async fn execute(
    ctx: &CliContext,
    output: &Path,
    encode: &EncodeArgs,
    seconds: Option<u64>,
) -> Result<(), CliError> {
    let settings = ctx.settings();
    let (rate, channels, mode) = (
        encode.sample_rate(settings),
        encode.channels(settings),
        encode.mode(settings),
    );

    let audio = AudioThreadHandle::shared()?;
    let (tx, mut rx) = mpsc::unbounded_channel::<RecorderEvent>();
    let recorder = Recorder::to_file(ctx.engine(), DeviceSource::new(audio), output, Arc::new(tx));
    recorder.start(rate, channels, mode)?;
    println!(
        "Recording to {} at {rate} Hz, {channels} channel(s). Press Enter to stop.",
        output.display()
    );

    let mut lines = Some(spawn_stdin_lines());
    let limit = tokio::time::sleep(Duration::from_secs(seconds.unwrap_or_default()));
    tokio::pin!(limit);
    let mut stopping = false;

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(RecorderEvent::Status(status)) = event else {
                    return Ok(());
                };
                tracing::debug!(status = %describe_recorder_status(status), "Recorder status");
                if let Some(outcome) = recorder_outcome(status) {
                    if outcome.is_ok() {
                        println!("Saved {}", output.display());
                    }
                    return outcome;
                }
            }
            line = next_line(&mut lines), if lines.is_some() && !stopping => {
                if line.is_some() {
                    stopping = true;
                    recorder.stop();
                } else {
                    lines = None;
                }
            }
            () = &mut limit, if seconds.is_some() && !stopping => {
                tracing::info!("Time limit reached");
                stopping = true;
                recorder.stop();
            }
            _ = tokio::signal::ctrl_c(), if !stopping => {
                tracing::info!("Interrupted, finishing recording");
                stopping = true;
                recorder.stop();
            }
        }
    }
}

async fn next_line(lines: &mut Option<mpsc::UnboundedReceiver<String>>) -> Option<String> {
    match lines {
        Some(rx) => rx.recv().await,
        None => None,
    }
}
