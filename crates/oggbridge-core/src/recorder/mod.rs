//! Recording controller.
//!
//! ```text
//!   Stopped → Recording → Stopping → Stopped
//! ```
//!
//! Arguments are validated on the calling thread before anything is spawned.
//! `stop()` is cooperative: the engine sees `read_input` return 0, flushes
//! its final pages, and the feed closes the output when the drive call ends.

mod feed;

pub use feed::{RecordTarget, RecorderFeed};

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::audio::AudioSource;
use crate::control::RecordingControl;
use crate::engine::{CodecEngine, EncodeMode};
use crate::error::BridgeError;
use crate::feed::EncodeFeed;
use crate::listener::{RecorderListener, RecorderStatus};
use crate::state::RecordingState;
use crate::stream_info::PcmFormat;

pub struct Recorder {
    engine: Arc<dyn CodecEngine>,
    feed: Arc<RecorderFeed>,
    control: Arc<RecordingControl>,
    listener: Arc<dyn RecorderListener>,
    busy: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Recorder {
    pub fn new(
        engine: Arc<dyn CodecEngine>,
        source: impl AudioSource + 'static,
        target: RecordTarget,
        listener: Arc<dyn RecorderListener>,
    ) -> Self {
        let control = Arc::new(RecordingControl::new());
        let feed = Arc::new(RecorderFeed::new(
            Arc::clone(&control),
            Arc::clone(&listener),
            Box::new(source),
            target,
        ));
        Self {
            engine,
            feed,
            control,
            listener,
            busy: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// Recorder writing to `path`, which is created when recording starts.
    pub fn to_file(
        engine: Arc<dyn CodecEngine>,
        source: impl AudioSource + 'static,
        path: impl Into<PathBuf>,
        listener: Arc<dyn RecorderListener>,
    ) -> Self {
        Self::new(engine, source, RecordTarget::File(path.into()), listener)
    }

    /// Validate the parameters and begin a session. A no-op unless stopped.
    pub fn start(&self, sample_rate: u32, channels: u16, mode: EncodeMode) -> Result<(), BridgeError> {
        let format = PcmFormat::new(sample_rate, channels)?;
        mode.validate()?;

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Recorder already running, start ignored");
            return Ok(());
        }
        if !self.control.state_cell().rearm() {
            self.busy.store(false, Ordering::Release);
            tracing::debug!(state = ?self.state(), "Recorder not stopped, start ignored");
            return Ok(());
        }
        self.control.set_format(format);

        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = worker.take() {
            let _ = previous.join();
        }

        let engine = Arc::clone(&self.engine);
        let feed = Arc::clone(&self.feed);
        let listener = Arc::clone(&self.listener);
        let busy = Arc::clone(&self.busy);

        let handle = thread::Builder::new()
            .name("oggbridge-encode".into())
            .spawn(move || drive(engine.as_ref(), format, mode, &feed, listener.as_ref(), &busy))
            .map_err(|e| {
                self.busy.store(false, Ordering::Release);
                BridgeError::Spawn(e.to_string())
            })?;
        *worker = Some(handle);
        Ok(())
    }

    /// Graceful stop: let the engine flush and finalise the stream.
    ///
    /// Before the session has opened its source there is nothing to flush,
    /// so the feed is stopped outright.
    pub fn stop(&self) {
        loop {
            match self.control.state() {
                RecordingState::Recording => {
                    if self.feed.request_graceful_stop() {
                        return;
                    }
                }
                RecordingState::Stopping => return,
                RecordingState::Stopped => {
                    self.feed.stop();
                    return;
                }
            }
        }
    }

    /// Hard stop: close the source and output immediately.
    pub fn abort(&self) {
        self.feed.stop();
    }

    pub fn state(&self) -> RecordingState {
        self.control.state()
    }

    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Block until the current drive thread has exited.
    pub fn wait(&self) {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop();
        }
        self.wait();
    }
}

fn drive(
    engine: &dyn CodecEngine,
    format: PcmFormat,
    mode: EncodeMode,
    feed: &RecorderFeed,
    listener: &dyn RecorderListener,
    busy: &AtomicBool,
) {
    let code = mode.run(engine, format, feed);
    feed.stop();
    busy.store(false, Ordering::Release);

    if code.is_success() {
        tracing::info!("Recording finished");
        listener.on_status(RecorderStatus::Finished);
    } else {
        tracing::warn!(%code, "Recording failed");
        listener.on_status(RecorderStatus::Failed(code));
    }
}
