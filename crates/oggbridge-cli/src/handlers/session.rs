//! Session watching shared by the playback and recording handlers.
//!
//! Controllers report through tokio channels; these helpers turn the event
//! stream into a `Result` and apply interactive commands typed on stdin.

use std::io::{self, BufRead, Write};
use std::thread;

use oggbridge_core::{Player, PlayerEvent, PlayerStatus, RecorderStatus};
use tokio::sync::mpsc;

use crate::error::CliError;
use crate::presentation::{describe_player_status, format_clock, print_stream_info};

/// A command typed while a player is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Pause,
    Resume,
    /// Seek target in seconds; `-1` clears a pending seek.
    Seek(i64),
    Quit,
}

/// Parse `p`, `r`, `s <seconds>` or `q`. Full words are accepted too.
pub fn parse_control(line: &str) -> Option<ControlCommand> {
    let mut parts = line.split_whitespace();
    let command = parts.next()?.to_ascii_lowercase();
    let argument = parts.next();
    if parts.next().is_some() {
        return None;
    }

    match (command.as_str(), argument) {
        ("p" | "pause", None) => Some(ControlCommand::Pause),
        ("r" | "resume", None) => Some(ControlCommand::Resume),
        ("q" | "quit" | "stop", None) => Some(ControlCommand::Quit),
        ("s" | "seek", Some(seconds)) => seconds
            .parse::<i64>()
            .ok()
            .filter(|s| *s >= -1)
            .map(ControlCommand::Seek),
        _ => None,
    }
}

pub fn apply(player: &Player, command: ControlCommand) {
    match command {
        ControlCommand::Pause => player.pause(),
        ControlCommand::Resume => player.resume(),
        ControlCommand::Seek(seconds) => player.seek_to_seconds(seconds),
        ControlCommand::Quit => player.stop(),
    }
}

/// Forward stdin lines from a detached thread. The channel closes at EOF.
pub fn spawn_stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = thread::Builder::new()
        .name("oggbridge-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(%e, "Failed to spawn stdin reader, interactive control disabled");
    }
    rx
}

/// What to surface while watching a player.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
    /// Read control commands from stdin.
    pub interactive: bool,
    /// Print stream info and a running clock.
    pub show_progress: bool,
}

impl WatchOptions {
    pub const fn interactive() -> Self {
        Self {
            interactive: true,
            show_progress: true,
        }
    }

    pub const fn quiet() -> Self {
        Self {
            interactive: false,
            show_progress: false,
        }
    }
}

/// Turn a terminal player status into the handler result.
pub fn player_outcome(status: PlayerStatus) -> Option<Result<(), CliError>> {
    match status {
        PlayerStatus::Finished => Some(Ok(())),
        PlayerStatus::Failed(code) => Some(Err(CliError::Decode(code))),
        PlayerStatus::Started | PlayerStatus::Stopped => None,
    }
}

pub fn recorder_outcome(status: RecorderStatus) -> Option<Result<(), CliError>> {
    match status {
        RecorderStatus::Finished => Some(Ok(())),
        RecorderStatus::Failed(code) => Some(Err(CliError::Encode(code))),
        RecorderStatus::Started | RecorderStatus::Stopped => None,
    }
}

/// Watch a started player until it finishes or fails.
///
/// Ctrl+C and `q` both stop the player; the session still reports its
/// outcome, so the loop keeps draining events until it does.
pub async fn watch_player(
    player: &Player,
    mut events: mpsc::UnboundedReceiver<PlayerEvent>,
    options: WatchOptions,
) -> Result<(), CliError> {
    let mut commands = if options.interactive {
        Some(spawn_stdin_lines())
    } else {
        None
    };

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    return Ok(());
                };
                match event {
                    PlayerEvent::StreamInfo(info) => {
                        if options.show_progress {
                            print_stream_info(&info);
                        }
                    }
                    PlayerEvent::Progress(seconds) => {
                        if options.show_progress {
                            print!("\r{}  ", format_clock(seconds));
                            let _ = io::stdout().flush();
                        }
                    }
                    PlayerEvent::Status(status) => {
                        tracing::debug!(status = %describe_player_status(status), "Player status");
                        if let Some(outcome) = player_outcome(status) {
                            if options.show_progress {
                                println!();
                            }
                            return outcome;
                        }
                    }
                }
            }
            line = recv_line(&mut commands), if commands.is_some() => {
                match line {
                    Some(line) => match parse_control(&line) {
                        Some(command) => {
                            tracing::debug!(?command, "Control command");
                            apply(player, command);
                        }
                        None if line.trim().is_empty() => {}
                        None => eprintln!("Unknown command {line:?}: use p, r, s <seconds> or q"),
                    },
                    None => commands = None,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping playback");
                player.stop();
            }
        }
    }
}

async fn recv_line(lines: &mut Option<mpsc::UnboundedReceiver<String>>) -> Option<String> {
    match lines {
        Some(rx) => rx.recv().await,
        None => None,
    }
}
