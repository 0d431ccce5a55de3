//! Playback controller.
//!
//! ```text
//!   Stopped → ReadingHeader → Playing ─────────────→ Stopped
//!                        └──→ Buffering → Playing ─→ Stopped
//! ```
//!
//! `start()` spawns one drive thread per session. The thread blocks inside
//! the engine's decode call while the engine pulls input and pushes PCM
//! through a [`PlayerFeed`]. Commands (pause, resume, seek, stop) only touch
//! the shared [`PlaybackControl`]; the engine observes them on its next
//! callback.

mod feed;

pub use feed::{BufferingPolicy, InputStream, PlayerFeed};

use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::AudioSink;
use crate::control::PlaybackControl;
use crate::engine::CodecEngine;
use crate::error::BridgeError;
use crate::feed::DecodeFeed;
use crate::listener::{PlayerListener, PlayerStatus};
use crate::settings::Settings;
use crate::state::PlaybackState;

/// Player construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerConfig {
    /// `Some` enables the Buffering state.
    pub buffering: Option<BufferingPolicy>,
    pub pause_poll_interval: Duration,
}

impl PlayerConfig {
    pub fn from_settings(settings: &Settings, buffered: bool) -> Self {
        Self {
            buffering: buffered.then(|| BufferingPolicy {
                threshold_samples: settings.effective_buffer_threshold_samples(),
                silence_flush_bytes: settings.effective_silence_flush_bytes(),
            }),
            pause_poll_interval: Duration::from_millis(settings.effective_pause_poll_interval_ms()),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::with_defaults(), false)
    }
}

/// What the drive thread decodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSource {
    /// Bytes pulled through the feed's input.
    Stream,
    /// A seekable file opened by the engine.
    File(PathBuf),
}

pub struct Player {
    engine: Arc<dyn CodecEngine>,
    feed: Arc<PlayerFeed>,
    control: Arc<PlaybackControl>,
    listener: Arc<dyn PlayerListener>,
    source: PlaybackSource,
    busy: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Player {
    /// Player that decodes bytes read from `input`.
    pub fn from_stream(
        engine: Arc<dyn CodecEngine>,
        input: impl Read + Send + 'static,
        sink: impl AudioSink + 'static,
        listener: Arc<dyn PlayerListener>,
        config: PlayerConfig,
    ) -> Self {
        Self::with_parts(
            engine,
            PlaybackSource::Stream,
            Some(Box::new(input)),
            Box::new(sink),
            listener,
            config,
        )
    }

    /// Stream player that pre-rolls `settings`' threshold before starting the sink.
    pub fn buffered(
        engine: Arc<dyn CodecEngine>,
        input: impl Read + Send + 'static,
        sink: impl AudioSink + 'static,
        listener: Arc<dyn PlayerListener>,
        settings: &Settings,
    ) -> Self {
        Self::from_stream(engine, input, sink, listener, PlayerConfig::from_settings(settings, true))
    }

    /// Player that decodes a file, with seek support and a known duration.
    pub fn from_file(
        engine: Arc<dyn CodecEngine>,
        path: impl Into<PathBuf>,
        sink: impl AudioSink + 'static,
        listener: Arc<dyn PlayerListener>,
        config: PlayerConfig,
    ) -> Self {
        Self::with_parts(
            engine,
            PlaybackSource::File(path.into()),
            None,
            Box::new(sink),
            listener,
            config,
        )
    }

    fn with_parts(
        engine: Arc<dyn CodecEngine>,
        source: PlaybackSource,
        input: Option<InputStream>,
        sink: Box<dyn AudioSink>,
        listener: Arc<dyn PlayerListener>,
        config: PlayerConfig,
    ) -> Self {
        let control = Arc::new(PlaybackControl::new(config.pause_poll_interval));
        let feed = Arc::new(PlayerFeed::new(
            Arc::clone(&control),
            Arc::clone(&listener),
            sink,
            input,
            config.buffering,
        ));
        Self {
            engine,
            feed,
            control,
            listener,
            source,
            busy: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// Begin a session on a background thread. A no-op unless stopped.
    pub fn start(&self) -> Result<(), BridgeError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Player already running, start ignored");
            return Ok(());
        }
        if !self.control.begin_session() {
            self.busy.store(false, Ordering::Release);
            tracing::debug!(state = ?self.state(), "Player not stopped, start ignored");
            return Ok(());
        }

        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = worker.take() {
            let _ = previous.join();
        }

        let engine = Arc::clone(&self.engine);
        let feed = Arc::clone(&self.feed);
        let listener = Arc::clone(&self.listener);
        let busy = Arc::clone(&self.busy);
        let source = self.source.clone();

        let handle = thread::Builder::new()
            .name("oggbridge-decode".into())
            .spawn(move || drive(engine.as_ref(), &source, &feed, listener.as_ref(), &busy))
            .map_err(|e| {
                self.busy.store(false, Ordering::Release);
                BridgeError::Spawn(e.to_string())
            })?;
        *worker = Some(handle);
        Ok(())
    }

    pub fn pause(&self) {
        self.control.pause();
    }

    pub fn resume(&self) {
        self.control.resume();
    }

    /// Request a seek; `-1` clears the request. Seeking to the value already
    /// requested has no effect until it is cleared.
    pub fn seek_to_seconds(&self, seconds: i64) {
        self.control.request_seek(seconds);
    }

    /// Stop the session. Safe to call at any time, from any thread, repeatedly.
    pub fn stop(&self) {
        self.control.resume();
        self.control.mark_stop_requested();
        self.feed.stop();
    }

    pub fn state(&self) -> PlaybackState {
        self.control.state()
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    /// Whether a drive thread is active.
    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub const fn source(&self) -> &PlaybackSource {
        &self.source
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

impl Drop for Player {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop();
        }
        self.wait();
    }
}

fn drive(
    engine: &dyn CodecEngine,
    source: &PlaybackSource,
    feed: &PlayerFeed,
    listener: &dyn PlayerListener,
    busy: &AtomicBool,
) {
    let code = match source {
        PlaybackSource::Stream => engine.decode_stream(feed),
        PlaybackSource::File(path) => engine.decode_file(path, feed),
    };
    feed.stop();
    busy.store(false, Ordering::Release);

    if code.is_success() {
        tracing::info!("Playback finished");
        listener.on_status(PlayerStatus::Finished);
    } else {
        tracing::warn!(%code, "Playback failed");
        listener.on_status(PlayerStatus::Failed(code));
    }
}
