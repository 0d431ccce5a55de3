//! Decode feed backing a [`Player`](super::Player).
//!
//! Holds the sink and optional byte input, and translates engine callbacks
//! into state transitions on the shared [`PlaybackControl`].

use std::io::{self, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::audio::AudioSink;
use crate::control::PlaybackControl;
use crate::error::BridgeError;
use crate::feed::DecodeFeed;
use crate::listener::{PlayerListener, PlayerStatus};
use crate::pcm;
use crate::state::{PlaybackState, SessionState};
use crate::stream_info::StreamInfo;

/// Encoded input for stream playback.
pub type InputStream = Box<dyn Read + Send>;

/// Pre-roll behaviour of a buffered player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferingPolicy {
    /// Cumulative decoded samples (all channels) before the sink is started.
    pub threshold_samples: u64,
    /// Zero bytes written when the session stops while still buffering.
    pub silence_flush_bytes: usize,
}

struct SinkSlot {
    /// Taken out while the session's sink is being released.
    sink: Option<Box<dyn AudioSink>>,
    open: bool,
    started: bool,
    scratch: Vec<u8>,
}

impl SinkSlot {
    fn active(&mut self) -> Option<&mut (dyn AudioSink + 'static)> {
        if self.open { self.sink.as_deref_mut() } else { None }
    }
}

pub struct PlayerFeed {
    control: Arc<PlaybackControl>,
    listener: Arc<dyn PlayerListener>,
    input: Mutex<Option<InputStream>>,
    sink: Mutex<SinkSlot>,
    buffering: Option<BufferingPolicy>,
    buffered_samples: AtomicU64,
}

impl PlayerFeed {
    pub fn new(
        control: Arc<PlaybackControl>,
        listener: Arc<dyn PlayerListener>,
        sink: Box<dyn AudioSink>,
        input: Option<InputStream>,
        buffering: Option<BufferingPolicy>,
    ) -> Self {
        Self {
            control,
            listener,
            input: Mutex::new(input),
            sink: Mutex::new(SinkSlot {
                sink: Some(sink),
                open: false,
                started: false,
                scratch: Vec::new(),
            }),
            buffering,
            buffered_samples: AtomicU64::new(0),
        }
    }

    pub const fn is_buffered(&self) -> bool {
        self.buffering.is_some()
    }

    fn lock_sink(&self) -> MutexGuard<'_, SinkSlot> {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_from_input(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut input = self.input.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(reader) = input.as_mut() else {
            return Ok(0);
        };
        loop {
            match reader.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                other => return other,
            }
        }
    }

    /// Count buffered output and start the sink the first time the threshold is reached.
    fn track_buffering(&self, samples: usize, policy: BufferingPolicy) {
        let samples = samples as u64;
        let total = self.buffered_samples.fetch_add(samples, Ordering::AcqRel) + samples;
        if total < policy.threshold_samples {
            return;
        }
        if !self
            .control
            .state_cell()
            .transition(PlaybackState::Buffering, PlaybackState::Playing)
        {
            return;
        }

        let mut slot = self.lock_sink();
        if !slot.started {
            if let Some(sink) = slot.active() {
                match sink.start() {
                    Ok(()) => slot.started = true,
                    Err(e) => tracing::warn!(%e, "Failed to start sink after buffering"),
                }
            }
        }
        tracing::debug!(total, "Buffer threshold reached, playback started");
    }

    /// Flush, stop and close the sink according to the state the session ended in.
    ///
    /// The sink is taken out of its slot first, so a concurrent `stop` finds
    /// nothing to release and returns while a natural end is still draining.
    fn release_sink(&self, previous: PlaybackState) {
        let (mut sink, started) = {
            let mut slot = self.lock_sink();
            if !slot.open {
                return;
            }
            let Some(sink) = slot.sink.take() else {
                return;
            };
            slot.open = false;
            (sink, std::mem::take(&mut slot.started))
        };

        let requested = self.control.stop_requested();
        match (previous, self.buffering) {
            (PlaybackState::Buffering, Some(policy)) => {
                if !started {
                    if let Err(e) = sink.start() {
                        tracing::warn!(%e, "Failed to start sink while releasing");
                    }
                }
                if requested {
                    let silence = vec![0_u8; policy.silence_flush_bytes];
                    if let Err(e) = sink.write(&silence) {
                        tracing::warn!(%e, "Failed to flush silence");
                    }
                } else if let Err(e) = sink.drain() {
                    tracing::warn!(%e, "Failed to drain sink");
                }
            }
            (PlaybackState::Playing, _) if !requested => {
                if let Err(e) = sink.drain() {
                    tracing::warn!(%e, "Failed to drain sink");
                }
            }
            _ => {}
        }

        if let Err(e) = sink.stop() {
            tracing::warn!(%e, "Failed to stop sink");
        }
        if let Err(e) = sink.close() {
            tracing::warn!(%e, "Failed to close sink");
        }
        self.lock_sink().sink = Some(sink);
    }
}

impl DecodeFeed for PlayerFeed {
    fn start_reading_header(&self) {
        if self
            .control
            .state_cell()
            .transition(PlaybackState::Stopped, PlaybackState::ReadingHeader)
        {
            self.listener.on_status(PlayerStatus::Started);
        } else {
            tracing::debug!(state = ?self.control.state(), "Header read ignored");
        }
    }

    fn start(&self, info: &StreamInfo) -> Result<(), BridgeError> {
        let mut slot = self.lock_sink();

        let state = self.control.state();
        if state != PlaybackState::ReadingHeader {
            if self.control.state_cell().is_latched() {
                return Err(BridgeError::SessionStopped);
            }
            return Err(BridgeError::InvalidState {
                expected: PlaybackState::ReadingHeader.name(),
                actual: state.name(),
            });
        }

        let format = info.pcm_format();
        format.validate()?;

        let next = if self.buffering.is_some() {
            PlaybackState::Buffering
        } else {
            PlaybackState::Playing
        };
        if !self
            .control
            .state_cell()
            .transition(PlaybackState::ReadingHeader, next)
        {
            return Err(BridgeError::SessionStopped);
        }

        self.buffered_samples.store(0, Ordering::Release);
        slot.sink
            .as_deref_mut()
            .ok_or_else(|| BridgeError::Sink("sink is still being released".into()))?
            .open(format)?;
        slot.open = true;
        slot.started = false;
        if next == PlaybackState::Playing {
            if let Some(sink) = slot.active() {
                sink.start()?;
            }
            slot.started = true;
        }
        drop(slot);

        tracing::info!(
            sample_rate = info.sample_rate,
            channels = info.channels,
            duration = info.duration_seconds,
            vendor = %info.vendor,
            "Stream started"
        );
        self.listener.on_stream_info(info);
        Ok(())
    }

    fn read_input(&self, buf: &mut [u8]) -> usize {
        self.control.wait_for_resume();
        if self.control.state() == PlaybackState::Stopped {
            return 0;
        }

        match self.read_from_input(buf) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(%e, "Input read failed, stopping playback");
                self.stop();
                0
            }
        }
    }

    fn write_output(&self, pcm: &[i16]) -> bool {
        self.control.wait_for_resume();
        if self.control.state() == PlaybackState::Stopped {
            return false;
        }
        if pcm.is_empty() {
            return true;
        }

        let written = {
            let mut slot = self.lock_sink();
            let mut bytes = std::mem::take(&mut slot.scratch);
            let Some(sink) = slot.active() else {
                return false;
            };
            pcm::samples_to_le_bytes(pcm, &mut bytes);
            let written = sink.write(&bytes);
            slot.scratch = bytes;
            written
        };

        if let Err(e) = written {
            tracing::warn!(%e, "Sink write failed, stopping playback");
            self.stop();
            return false;
        }

        if let Some(policy) = self.buffering {
            self.track_buffering(pcm.len(), policy);
        }
        true
    }

    fn report_elapsed_seconds(&self, seconds: u64) {
        self.listener.on_progress(seconds);
    }

    fn query_seek_target(&self) -> i64 {
        self.control.seek_target()
    }

    fn stop(&self) {
        let (previous, latched) = self.control.state_cell().stop();
        self.control.wake();
        self.release_sink(previous);
        if latched {
            self.listener.on_status(PlayerStatus::Stopped);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::thread;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::listener::MockPlayerListener;
    use crate::stream_info::PcmFormat;

    #[derive(Default)]
    struct Journal {
        calls: Vec<String>,
        bytes: usize,
    }

    struct JournalSink(Arc<Mutex<Journal>>);

    impl AudioSink for JournalSink {
        fn open(&mut self, format: PcmFormat) -> Result<(), BridgeError> {
            self.0
                .lock()
                .unwrap()
                .calls
                .push(format!("open:{}:{}", format.sample_rate, format.channels));
            Ok(())
        }
        fn start(&mut self) -> Result<(), BridgeError> {
            self.0.lock().unwrap().calls.push("start".into());
            Ok(())
        }
        fn write(&mut self, data: &[u8]) -> Result<usize, BridgeError> {
            self.0.lock().unwrap().bytes += data.len();
            Ok(data.len())
        }
        fn drain(&mut self) -> Result<(), BridgeError> {
            self.0.lock().unwrap().calls.push("drain".into());
            Ok(())
        }
        fn stop(&mut self) -> Result<(), BridgeError> {
            self.0.lock().unwrap().calls.push("stop".into());
            Ok(())
        }
        fn close(&mut self) -> Result<(), BridgeError> {
            self.0.lock().unwrap().calls.push("close".into());
            Ok(())
        }
    }

    /// Sink whose drain blocks until the test lets it go.
    struct GatedDrainSink {
        entered: mpsc::Sender<()>,
        release: mpsc::Receiver<()>,
    }

    impl AudioSink for GatedDrainSink {
        fn open(&mut self, _format: PcmFormat) -> Result<(), BridgeError> {
            Ok(())
        }
        fn start(&mut self) -> Result<(), BridgeError> {
            Ok(())
        }
        fn write(&mut self, data: &[u8]) -> Result<usize, BridgeError> {
            Ok(data.len())
        }
        fn drain(&mut self) -> Result<(), BridgeError> {
            let _ = self.entered.send(());
            let _ = self.release.recv_timeout(Duration::from_secs(5));
            Ok(())
        }
        fn stop(&mut self) -> Result<(), BridgeError> {
            Ok(())
        }
        fn close(&mut self) -> Result<(), BridgeError> {
            Ok(())
        }
    }

    fn feed_with(
        listener: MockPlayerListener,
        buffering: Option<BufferingPolicy>,
    ) -> (PlayerFeed, Arc<PlaybackControl>, Arc<Mutex<Journal>>) {
        let control = Arc::new(PlaybackControl::new(Duration::from_millis(5)));
        let journal = Arc::new(Mutex::new(Journal::default()));
        let feed = PlayerFeed::new(
            Arc::clone(&control),
            Arc::new(listener),
            Box::new(JournalSink(Arc::clone(&journal))),
            None,
            buffering,
        );
        (feed, control, journal)
    }

    fn quiet_listener() -> MockPlayerListener {
        let mut listener = MockPlayerListener::new();
        listener.expect_on_status().return_const(());
        listener.expect_on_stream_info().return_const(());
        listener.expect_on_progress().return_const(());
        listener
    }

    #[test]
    fn start_requires_reading_header() {
        let (feed, _control, journal) = feed_with(quiet_listener(), None);
        let info = StreamInfo::new(44_100, 2, "v", -1);
        let err = feed.start(&info).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidState { .. }), "got {err:?}");
        assert!(journal.lock().unwrap().calls.is_empty());
    }

    #[test]
    fn start_rejects_unsupported_channels() {
        let (feed, control, _journal) = feed_with(quiet_listener(), None);
        feed.start_reading_header();
        let info = StreamInfo::new(44_100, 6, "v", -1);
        assert!(matches!(
            feed.start(&info),
            Err(BridgeError::InvalidChannels(6))
        ));
        assert_eq!(control.state(), PlaybackState::ReadingHeader);
    }

    #[test]
    fn unbuffered_start_opens_and_starts_sink() {
        let mut listener = MockPlayerListener::new();
        listener
            .expect_on_status()
            .withf(|s| *s == PlayerStatus::Started)
            .times(1)
            .return_const(());
        listener
            .expect_on_stream_info()
            .withf(|info| info.sample_rate == 8_000)
            .times(1)
            .return_const(());
        let (feed, control, journal) = feed_with(listener, None);

        feed.start_reading_header();
        feed.start(&StreamInfo::new(8_000, 1, "v", 3)).unwrap();

        assert_eq!(control.state(), PlaybackState::Playing);
        assert_eq!(journal.lock().unwrap().calls, vec!["open:8000:1", "start"]);
    }

    #[test]
    fn stop_emits_exactly_one_terminal_notification() {
        let mut listener = MockPlayerListener::new();
        listener
            .expect_on_status()
            .withf(|s| *s == PlayerStatus::Stopped)
            .times(1)
            .return_const(());
        let (feed, control, _journal) = feed_with(listener, None);

        feed.stop();
        feed.stop();
        assert_eq!(control.state(), PlaybackState::Stopped);
    }

    #[test]
    fn write_after_stop_ends_the_drive_loop() {
        let (feed, _control, journal) = feed_with(quiet_listener(), None);
        feed.start_reading_header();
        feed.start(&StreamInfo::new(8_000, 1, "v", -1)).unwrap();
        assert!(feed.write_output(&[1, 2, 3]));
        assert!(feed.write_output(&[]));

        feed.stop();
        assert!(!feed.write_output(&[1, 2, 3]));
        assert_eq!(journal.lock().unwrap().bytes, 6);
    }

    #[test]
    fn natural_end_drains_before_closing() {
        let (feed, _control, journal) = feed_with(quiet_listener(), None);
        feed.start_reading_header();
        feed.start(&StreamInfo::new(8_000, 1, "v", -1)).unwrap();
        feed.stop();
        assert_eq!(
            journal.lock().unwrap().calls,
            vec!["open:8000:1", "start", "drain", "stop", "close"]
        );
    }

    #[test]
    fn requested_stop_skips_drain() {
        let (feed, control, journal) = feed_with(quiet_listener(), None);
        feed.start_reading_header();
        feed.start(&StreamInfo::new(8_000, 1, "v", -1)).unwrap();
        control.mark_stop_requested();
        feed.stop();
        assert_eq!(
            journal.lock().unwrap().calls,
            vec!["open:8000:1", "start", "stop", "close"]
        );
    }

    #[test]
    fn stop_while_draining_returns_without_waiting_for_the_sink() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let control = Arc::new(PlaybackControl::new(Duration::from_millis(5)));
        let feed = Arc::new(PlayerFeed::new(
            Arc::clone(&control),
            Arc::new(quiet_listener()),
            Box::new(GatedDrainSink {
                entered: entered_tx,
                release: release_rx,
            }),
            None,
            None,
        ));
        feed.start_reading_header();
        feed.start(&StreamInfo::new(8_000, 1, "v", -1)).unwrap();

        // Natural end on the engine side: the sink drains.
        let engine_side = {
            let feed = Arc::clone(&feed);
            thread::spawn(move || feed.stop())
        };
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let started = Instant::now();
        control.mark_stop_requested();
        feed.stop();
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(control.state(), PlaybackState::Stopped);

        release_tx.send(()).unwrap();
        engine_side.join().unwrap();

        // The sink is back in its slot for the next session.
        assert!(control.begin_session());
        feed.start_reading_header();
        assert!(feed.start(&StreamInfo::new(8_000, 1, "v", -1)).is_ok());
    }

    #[test]
    fn stop_during_buffering_flushes_silence() {
        let policy = BufferingPolicy {
            threshold_samples: 100,
            silence_flush_bytes: 64,
        };
        let (feed, control, journal) = feed_with(quiet_listener(), Some(policy));
        feed.start_reading_header();
        feed.start(&StreamInfo::new(8_000, 1, "v", -1)).unwrap();
        assert_eq!(control.state(), PlaybackState::Buffering);

        assert!(feed.write_output(&[0; 10]));
        control.mark_stop_requested();
        feed.stop();

        let journal = journal.lock().unwrap();
        assert_eq!(journal.calls, vec!["open:8000:1", "start", "stop", "close"]);
        assert_eq!(journal.bytes, 20 + 64);
    }

    #[test]
    fn seek_query_reflects_control() {
        let (feed, control, _journal) = feed_with(quiet_listener(), None);
        assert_eq!(feed.query_seek_target(), -1);
        control.request_seek(12);
        assert_eq!(feed.query_seek_target(), 12);
    }
}
