//! Dedicated audio I/O thread that owns the `!Send` device handles.
//!
//! `cpal::Stream` (capture) and `rodio::OutputStream` (playback) are `!Send`
//! on some platforms. Both live on one OS thread for their whole lifetime;
//! [`AudioThreadHandle`] is the `Send + Sync` proxy the sinks and sources
//! hold, and every device operation is an [`AudioCommand`] sent to that
//! thread.
//!
//! Devices are opened lazily, so spawning the thread never touches hardware.

use std::sync::{Arc, mpsc};
use std::thread;

use cpal::Stream;
use cpal::traits::StreamTrait;
use oggbridge_core::PcmFormat;
use rodio::{OutputStream, OutputStreamHandle, Sink};

use crate::capture::{self, CaptureBuffer};
use crate::error::AudioDeviceError;

// ── Commands ───────────────────────────────────────────────────────

enum AudioCommand {
    /// Create a paused playback sink on the default output device.
    OpenOutput {
        reply: mpsc::Sender<Result<Arc<Sink>, AudioDeviceError>>,
    },

    /// Release the output device once no sink needs it.
    ReleaseOutput,

    /// Build the input stream for `format`, feeding `buffer`.
    OpenInput {
        format: PcmFormat,
        buffer: CaptureBuffer,
        reply: mpsc::Sender<Result<(), AudioDeviceError>>,
    },

    StartInput {
        reply: mpsc::Sender<Result<(), AudioDeviceError>>,
    },

    StopInput {
        reply: mpsc::Sender<Result<(), AudioDeviceError>>,
    },

    /// Drop the input stream (fire-and-forget).
    CloseInput,

    Shutdown,
}

// ── Handle (Send + Sync proxy) ─────────────────────────────────────

/// `Send + Sync` handle to the audio thread.
///
/// Request/reply methods block the caller until the audio thread answers.
pub struct AudioThreadHandle {
    cmd_tx: mpsc::Sender<AudioCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl AudioThreadHandle {
    pub fn spawn() -> Result<Self, AudioDeviceError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<AudioCommand>();

        let thread = thread::Builder::new()
            .name("oggbridge-audio".into())
            .spawn(move || AudioThread::default().run(&cmd_rx))
            .map_err(|e| {
                AudioDeviceError::OutputStreamError(format!("failed to spawn audio thread: {e}"))
            })?;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }

    /// Convenience for sharing one thread between a sink and a source.
    pub fn shared() -> Result<Arc<Self>, AudioDeviceError> {
        Self::spawn().map(Arc::new)
    }

    // ── Playback ───────────────────────────────────────────────────

    pub fn open_output(&self) -> Result<Arc<Sink>, AudioDeviceError> {
        self.send_and_recv(|reply| AudioCommand::OpenOutput { reply })
    }

    pub fn release_output(&self) {
        let _ = self.cmd_tx.send(AudioCommand::ReleaseOutput);
    }

    // ── Capture ────────────────────────────────────────────────────

    pub fn open_input(&self, format: PcmFormat, buffer: CaptureBuffer) -> Result<(), AudioDeviceError> {
        self.send_and_recv(|reply| AudioCommand::OpenInput {
            format,
            buffer,
            reply,
        })
    }

    pub fn start_input(&self) -> Result<(), AudioDeviceError> {
        self.send_and_recv(|reply| AudioCommand::StartInput { reply })
    }

    pub fn stop_input(&self) -> Result<(), AudioDeviceError> {
        self.send_and_recv(|reply| AudioCommand::StopInput { reply })
    }

    pub fn close_input(&self) {
        let _ = self.cmd_tx.send(AudioCommand::CloseInput);
    }

    // ── Internal helpers ───────────────────────────────────────────

    fn send_and_recv<T>(
        &self,
        build: impl FnOnce(mpsc::Sender<Result<T, AudioDeviceError>>) -> AudioCommand,
    ) -> Result<T, AudioDeviceError> {
        let (tx, rx) = mpsc::channel();
        self.cmd_tx
            .send(build(tx))
            .map_err(|_| AudioDeviceError::AudioThreadDied)?;
        rx.recv().map_err(|_| AudioDeviceError::AudioThreadDied)?
    }
}

impl Drop for AudioThreadHandle {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

// ── Audio thread event loop ────────────────────────────────────────

/// State owned by the audio thread. Never crosses a thread boundary.
#[derive(Default)]
struct AudioThread {
    output: Option<(OutputStream, OutputStreamHandle)>,
    input: Option<(Stream, CaptureBuffer)>,
}

impl AudioThread {
    fn run(mut self, cmd_rx: &mpsc::Receiver<AudioCommand>) {
        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                AudioCommand::OpenOutput { reply } => {
                    let _ = reply.send(self.open_output());
                }
                AudioCommand::ReleaseOutput => {
                    if self.output.take().is_some() {
                        tracing::debug!("Audio output released");
                    }
                }
                AudioCommand::OpenInput {
                    format,
                    buffer,
                    reply,
                } => {
                    let _ = reply.send(self.open_input(format, buffer));
                }
                AudioCommand::StartInput { reply } => {
                    let _ = reply.send(self.start_input());
                }
                AudioCommand::StopInput { reply } => {
                    let _ = reply.send(self.stop_input());
                }
                AudioCommand::CloseInput => {
                    if let Some((_, buffer)) = self.input.take() {
                        buffer.set_capturing(false);
                        tracing::debug!("Audio capture closed");
                    }
                }
                AudioCommand::Shutdown => break,
            }
        }

        // Streams are dropped here, on the audio thread.
        tracing::debug!("Audio thread shutting down");
    }

    fn open_output(&mut self) -> Result<Arc<Sink>, AudioDeviceError> {
        if self.output.is_none() {
            let opened = OutputStream::try_default()
                .map_err(|e| AudioDeviceError::OutputStreamError(e.to_string()))?;
            tracing::info!("Audio playback initialized on default output device");
            self.output = Some(opened);
        }
        let Some((_, handle)) = &self.output else {
            return Err(AudioDeviceError::NotOpen);
        };

        let sink =
            Sink::try_new(handle).map_err(|e| AudioDeviceError::OutputStreamError(e.to_string()))?;
        sink.pause();
        Ok(Arc::new(sink))
    }

    fn open_input(&mut self, format: PcmFormat, buffer: CaptureBuffer) -> Result<(), AudioDeviceError> {
        if let Some((_, previous)) = self.input.take() {
            previous.set_capturing(false);
        }
        buffer.set_capturing(false);
        buffer.clear();
        let stream = capture::open_input_stream(format, buffer.clone())?;
        self.input = Some((stream, buffer));
        Ok(())
    }

    fn start_input(&self) -> Result<(), AudioDeviceError> {
        let (stream, buffer) = self.input.as_ref().ok_or(AudioDeviceError::NotOpen)?;
        buffer.set_capturing(true);
        stream
            .play()
            .map_err(|e| AudioDeviceError::InputStreamError(e.to_string()))?;
        tracing::debug!("Audio capture started");
        Ok(())
    }

    fn stop_input(&self) -> Result<(), AudioDeviceError> {
        let Some((stream, buffer)) = self.input.as_ref() else {
            return Ok(());
        };
        buffer.set_capturing(false);
        stream
            .pause()
            .map_err(|e| AudioDeviceError::InputStreamError(e.to_string()))?;
        tracing::debug!("Audio capture stopped");
        Ok(())
    }
}
