//! Encode feed backing a [`Recorder`](super::Recorder).

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::audio::AudioSource;
use crate::control::RecordingControl;
use crate::error::BridgeError;
use crate::feed::EncodeFeed;
use crate::listener::{RecorderListener, RecorderStatus};
use crate::state::{RecordingState, SessionState};

/// Where encoded bytes go.
pub enum RecordTarget {
    /// Created (truncated) when a session starts, closed when it stops.
    File(PathBuf),
    /// Kept for the recorder's lifetime and flushed at the end of each session.
    Writer(Box<dyn Write + Send>),
}

struct SourceSlot {
    source: Box<dyn AudioSource>,
    open: bool,
}

struct OutputSlot {
    target: RecordTarget,
    file: Option<BufWriter<File>>,
    open: bool,
}

impl OutputSlot {
    fn open(&mut self) -> Result<(), BridgeError> {
        if let RecordTarget::File(path) = &self.target {
            self.file = Some(BufWriter::new(File::create(path)?));
        }
        self.open = true;
        Ok(())
    }

    fn writer(&mut self) -> Option<&mut dyn Write> {
        if !self.open {
            return None;
        }
        match &mut self.target {
            RecordTarget::File(_) => self.file.as_mut().map(|f| f as &mut dyn Write),
            RecordTarget::Writer(writer) => Some(writer.as_mut()),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        match &mut self.target {
            RecordTarget::File(_) => self.file.take().map_or(Ok(()), |mut file| file.flush()),
            RecordTarget::Writer(writer) => writer.flush(),
        }
    }
}

pub struct RecorderFeed {
    control: Arc<RecordingControl>,
    listener: Arc<dyn RecorderListener>,
    source: Mutex<SourceSlot>,
    output: Mutex<OutputSlot>,
}

impl RecorderFeed {
    pub fn new(
        control: Arc<RecordingControl>,
        listener: Arc<dyn RecorderListener>,
        source: Box<dyn AudioSource>,
        target: RecordTarget,
    ) -> Self {
        Self {
            control,
            listener,
            source: Mutex::new(SourceSlot {
                source,
                open: false,
            }),
            output: Mutex::new(OutputSlot {
                target,
                file: None,
                open: false,
            }),
        }
    }

    /// Recording → Stopping. Returns `false` if the session was not recording.
    pub fn request_graceful_stop(&self) -> bool {
        self.control
            .state_cell()
            .transition(RecordingState::Recording, RecordingState::Stopping)
    }

    fn lock_source(&self) -> MutexGuard<'_, SourceSlot> {
        self.source.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_output(&self) -> MutexGuard<'_, OutputSlot> {
        self.output.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close_source(slot: &mut SourceSlot) {
        if !slot.open {
            return;
        }
        if let Err(e) = slot.source.stop() {
            tracing::warn!(%e, "Failed to stop audio source");
        }
        if let Err(e) = slot.source.close() {
            tracing::warn!(%e, "Failed to close audio source");
        }
        slot.open = false;
    }
}

impl EncodeFeed for RecorderFeed {
    fn start(&self) -> Result<(), BridgeError> {
        let state = self.control.state();
        if state != RecordingState::Stopped {
            tracing::debug!(state = state.name(), "Recorder already started");
            return Ok(());
        }
        if self.control.state_cell().is_latched() {
            return Err(BridgeError::SessionStopped);
        }
        let format = self
            .control
            .format()
            .ok_or_else(|| BridgeError::UnsupportedParameters("no recording format set".into()))?;

        let mut source = self.lock_source();
        let mut output = self.lock_output();

        source.source.open(format)?;
        source.open = true;

        if let Err(e) = output.open() {
            Self::close_source(&mut source);
            return Err(e);
        }

        if !self
            .control
            .state_cell()
            .transition(RecordingState::Stopped, RecordingState::Recording)
        {
            Self::close_source(&mut source);
            let _ = output.close();
            return Err(BridgeError::SessionStopped);
        }

        source.source.start()?;
        drop(output);
        drop(source);

        tracing::info!(
            sample_rate = format.sample_rate,
            channels = format.channels,
            "Recording started"
        );
        self.listener.on_status(RecorderStatus::Started);
        Ok(())
    }

    fn read_input(&self, buf: &mut [u8]) -> usize {
        if self.control.state() != RecordingState::Recording {
            return 0;
        }

        let read = {
            let mut slot = self.lock_source();
            if !slot.open {
                return 0;
            }
            slot.source.read(buf)
        };

        match read {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(%e, "Capture read failed, finishing recording");
                self.request_graceful_stop();
                0
            }
        }
    }

    fn write_output(&self, data: &[u8]) -> usize {
        if data.is_empty() {
            return 0;
        }

        let written = {
            let mut slot = self.lock_output();
            let Some(writer) = slot.writer() else {
                return 0;
            };
            writer.write_all(data)
        };

        match written {
            Ok(()) => data.len(),
            Err(e) => {
                tracing::warn!(%e, "Output write failed, stopping recording");
                self.stop();
                0
            }
        }
    }

    fn stop_encoding(&self) {
        if !self.request_graceful_stop() {
            tracing::debug!(state = ?self.control.state(), "Graceful stop ignored");
        }
    }

    fn stop(&self) {
        let (previous, latched) = self.control.state_cell().stop();

        Self::close_source(&mut self.lock_source());
        if let Err(e) = self.lock_output().close() {
            tracing::warn!(%e, "Failed to close recording output");
        }

        if latched {
            tracing::debug!(from = previous.name(), "Recording stopped");
            self.listener.on_status(RecorderStatus::Stopped);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::audio::{ReaderSource, SharedBuffer};
    use crate::listener::MockRecorderListener;
    use crate::stream_info::PcmFormat;

    fn recording_feed(
        listener: MockRecorderListener,
        target: RecordTarget,
    ) -> (RecorderFeed, Arc<RecordingControl>) {
        let control = Arc::new(RecordingControl::new());
        control.set_format(PcmFormat::new(8_000, 1).unwrap());
        let feed = RecorderFeed::new(
            Arc::clone(&control),
            Arc::new(listener),
            Box::new(ReaderSource::new(Cursor::new(vec![1_u8; 8]))),
            target,
        );
        (feed, control)
    }

    fn quiet_listener() -> MockRecorderListener {
        let mut listener = MockRecorderListener::new();
        listener.expect_on_status().return_const(());
        listener
    }

    #[test]
    fn start_is_idempotent() {
        let mut listener = MockRecorderListener::new();
        listener
            .expect_on_status()
            .withf(|s| *s == RecorderStatus::Started)
            .times(1)
            .return_const(());
        let (feed, control) = recording_feed(listener, RecordTarget::Writer(Box::new(SharedBuffer::new())));

        feed.start().unwrap();
        feed.start().unwrap();
        assert_eq!(control.state(), RecordingState::Recording);
    }

    #[test]
    fn graceful_stop_ends_input_but_keeps_output() {
        let buffer = SharedBuffer::new();
        let (feed, control) = recording_feed(quiet_listener(), RecordTarget::Writer(Box::new(buffer.clone())));
        feed.start().unwrap();

        let mut buf = [0_u8; 4];
        assert_eq!(feed.read_input(&mut buf), 4);

        feed.stop_encoding();
        assert_eq!(control.state(), RecordingState::Stopping);
        assert_eq!(feed.read_input(&mut buf), 0);

        assert_eq!(feed.write_output(b"tail"), 4);
        assert_eq!(buffer.contents(), b"tail");
    }

    #[test]
    fn stop_closes_output_and_notifies_once() {
        let mut listener = MockRecorderListener::new();
        listener
            .expect_on_status()
            .withf(|s| *s == RecorderStatus::Started)
            .times(1)
            .return_const(());
        listener
            .expect_on_status()
            .withf(|s| *s == RecorderStatus::Stopped)
            .times(1)
            .return_const(());
        let (feed, control) = recording_feed(listener, RecordTarget::Writer(Box::new(SharedBuffer::new())));
        feed.start().unwrap();

        feed.stop();
        feed.stop();
        assert_eq!(control.state(), RecordingState::Stopped);
        assert_eq!(feed.write_output(b"late"), 0);
    }

    #[test]
    fn stop_encoding_outside_recording_is_ignored() {
        let (feed, control) = recording_feed(quiet_listener(), RecordTarget::Writer(Box::new(SharedBuffer::new())));
        feed.stop_encoding();
        assert_eq!(control.state(), RecordingState::Stopped);
    }

    #[test]
    fn file_target_is_created_on_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.ogg");
        let (feed, _control) = recording_feed(quiet_listener(), RecordTarget::File(path.clone()));
        assert!(!path.exists());

        feed.start().unwrap();
        assert_eq!(feed.write_output(b"OggS"), 4);
        feed.stop();

        assert_eq!(std::fs::read(&path).unwrap(), b"OggS");
    }

    #[test]
    fn start_after_latched_stop_reports_session_stopped() {
        let (feed, _control) = recording_feed(quiet_listener(), RecordTarget::Writer(Box::new(SharedBuffer::new())));
        feed.stop();
        assert!(matches!(feed.start(), Err(BridgeError::SessionStopped)));
    }
}
