//! Integration tests for the `Recorder` state machine.
//!
//! A loopback engine copies captured bytes straight to the output, framed by
//! a fake header and trailer, so the tests can see exactly which bytes made
//! it through and whether the stream was finalised.

use std::io::{self, Cursor, Read};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use oggbridge_core::{
    AudioSource, BridgeError, CodecEngine, DecodeFeed, DecodeResultCode, EncodeFeed, EncodeMode,
    EncodeResultCode, PcmFormat, RecordTarget, Recorder, RecorderEvent, RecorderStatus,
    RecordingState, ReaderSource, SharedBuffer, StreamInfo,
};
use tokio::sync::mpsc;

const HEADER: &[u8] = b"OggS-head|";
const TRAILER: &[u8] = b"|eos";

// ── Loopback engine ────────────────────────────────────────────────

#[derive(Default)]
struct LoopbackEngine {
    drives: AtomicUsize,
    modes: Mutex<Vec<EncodeMode>>,
}

impl LoopbackEngine {
    fn encode(&self, mode: EncodeMode, feed: &dyn EncodeFeed) -> EncodeResultCode {
        self.drives.fetch_add(1, Ordering::SeqCst);
        self.modes.lock().unwrap().push(mode);

        match feed.start() {
            Ok(()) => {}
            Err(BridgeError::SessionStopped) => {
                feed.stop();
                return EncodeResultCode::Success;
            }
            Err(_) => {
                feed.stop();
                return EncodeResultCode::UnsupportedDeviceParameters;
            }
        }

        let code = Self::pump(feed);
        feed.stop();
        code
    }

    fn pump(feed: &dyn EncodeFeed) -> EncodeResultCode {
        if feed.write_output(HEADER) == 0 {
            return EncodeResultCode::UnknownFailure;
        }
        let mut buf = [0_u8; 256];
        loop {
            let n = feed.read_input(&mut buf);
            if n == 0 {
                break;
            }
            if feed.write_output(&buf[..n]) == 0 {
                return EncodeResultCode::UnknownFailure;
            }
        }
        if feed.write_output(TRAILER) == 0 {
            return EncodeResultCode::UnknownFailure;
        }
        EncodeResultCode::Success
    }
}

impl CodecEngine for LoopbackEngine {
    fn decode_stream(&self, feed: &dyn DecodeFeed) -> DecodeResultCode {
        feed.stop();
        DecodeResultCode::InvalidBitstream
    }

    fn decode_file(&self, _path: &Path, feed: &dyn DecodeFeed) -> DecodeResultCode {
        feed.stop();
        DecodeResultCode::NotVorbisHeader
    }

    fn read_file_metadata(&self, _path: &Path) -> Result<StreamInfo, BridgeError> {
        Err(BridgeError::Unreadable(DecodeResultCode::NotVorbisHeader))
    }

    fn encode_with_quality(&self, _format: PcmFormat, quality: f32, feed: &dyn EncodeFeed) -> EncodeResultCode {
        self.encode(EncodeMode::Quality(quality), feed)
    }

    fn encode_with_bitrate(&self, _format: PcmFormat, bitrate: u32, feed: &dyn EncodeFeed) -> EncodeResultCode {
        self.encode(EncodeMode::Bitrate(bitrate), feed)
    }
}

// ── Sources ────────────────────────────────────────────────────────

/// Endless capture: a fixed byte every few milliseconds.
struct Microphone;

impl Read for Microphone {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        thread::sleep(Duration::from_millis(2));
        let n = buf.len().min(64);
        buf[..n].fill(0x55);
        Ok(n)
    }
}

/// A device that refuses every format.
struct UnpluggedSource;

impl AudioSource for UnpluggedSource {
    fn open(&mut self, format: PcmFormat) -> Result<(), BridgeError> {
        Err(BridgeError::UnsupportedParameters(format!(
            "{} Hz x {}",
            format.sample_rate, format.channels
        )))
    }
    fn start(&mut self) -> Result<(), BridgeError> {
        Ok(())
    }
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, BridgeError> {
        Ok(0)
    }
    fn stop(&mut self) -> Result<(), BridgeError> {
        Ok(())
    }
    fn close(&mut self) -> Result<(), BridgeError> {
        Ok(())
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn drain_events(rx: &mut mpsc::UnboundedReceiver<RecorderEvent>) -> Vec<RecorderStatus> {
    let mut events = Vec::new();
    while let Ok(RecorderEvent::Status(s)) = rx.try_recv() {
        events.push(s);
    }
    events
}

fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(2));
    }
}

fn recorder_with(
    engine: &Arc<LoopbackEngine>,
    source: impl AudioSource + 'static,
    output: &SharedBuffer,
) -> (Recorder, mpsc::UnboundedReceiver<RecorderEvent>) {
    let (tx, rx) = mpsc::unbounded_channel::<RecorderEvent>();
    let recorder = Recorder::new(
        Arc::clone(engine) as Arc<dyn CodecEngine>,
        source,
        RecordTarget::Writer(Box::new(output.clone())),
        Arc::new(tx),
    );
    (recorder, rx)
}

// ── Tests ──────────────────────────────────────────────────────────

#[test]
fn invalid_arguments_are_rejected_before_spawning() {
    let engine = Arc::new(LoopbackEngine::default());
    let output = SharedBuffer::new();
    let (recorder, mut rx) = recorder_with(&engine, ReaderSource::new(Cursor::new(vec![0_u8; 4])), &output);

    assert!(matches!(
        recorder.start(44_100, 3, EncodeMode::Quality(0.4)),
        Err(BridgeError::InvalidChannels(3))
    ));
    assert!(matches!(
        recorder.start(0, 2, EncodeMode::Quality(0.4)),
        Err(BridgeError::InvalidSampleRate(0))
    ));
    assert!(matches!(
        recorder.start(44_100, 2, EncodeMode::Quality(1.5)),
        Err(BridgeError::InvalidQuality(_))
    ));
    assert!(matches!(
        recorder.start(44_100, 2, EncodeMode::Bitrate(0)),
        Err(BridgeError::InvalidBitrate)
    ));

    assert!(!recorder.is_running());
    assert_eq!(engine.drives.load(Ordering::SeqCst), 0);
    assert!(drain_events(&mut rx).is_empty());
    assert!(output.is_empty());
}

#[test]
fn finite_source_records_to_completion() {
    let engine = Arc::new(LoopbackEngine::default());
    let output = SharedBuffer::new();
    let pcm: Vec<u8> = (0..=255).collect();
    let (recorder, mut rx) = recorder_with(&engine, ReaderSource::new(Cursor::new(pcm.clone())), &output);

    recorder.start(44_100, 2, EncodeMode::Quality(0.4)).unwrap();
    recorder.wait();

    let mut expected = HEADER.to_vec();
    expected.extend_from_slice(&pcm);
    expected.extend_from_slice(TRAILER);
    assert_eq!(output.contents(), expected);

    assert_eq!(
        drain_events(&mut rx),
        vec![RecorderStatus::Started, RecorderStatus::Stopped, RecorderStatus::Finished]
    );
    assert_eq!(recorder.state(), RecordingState::Stopped);
    assert!(!recorder.is_running());
}

#[test]
fn bitrate_mode_reaches_the_bitrate_entry_point() {
    let engine = Arc::new(LoopbackEngine::default());
    let output = SharedBuffer::new();
    let (recorder, _rx) = recorder_with(&engine, ReaderSource::new(Cursor::new(Vec::new())), &output);

    recorder.start(22_050, 1, EncodeMode::Bitrate(96_000)).unwrap();
    recorder.wait();

    assert_eq!(*engine.modes.lock().unwrap(), vec![EncodeMode::Bitrate(96_000)]);
}

#[test]
fn graceful_stop_finalises_the_stream() {
    let engine = Arc::new(LoopbackEngine::default());
    let output = SharedBuffer::new();
    let (recorder, mut rx) = recorder_with(&engine, ReaderSource::new(Microphone), &output);

    recorder.start(44_100, 2, EncodeMode::Quality(0.4)).unwrap();
    wait_until("recording", || recorder.state() == RecordingState::Recording);
    wait_until("captured audio", || output.len() > HEADER.len());

    recorder.stop();
    recorder.wait();

    let bytes = output.contents();
    assert!(bytes.starts_with(HEADER));
    assert!(bytes.ends_with(TRAILER), "trailer missing after graceful stop");
    assert_eq!(
        drain_events(&mut rx),
        vec![RecorderStatus::Started, RecorderStatus::Stopped, RecorderStatus::Finished]
    );
}

#[test]
fn abort_truncates_the_stream() {
    let engine = Arc::new(LoopbackEngine::default());
    let output = SharedBuffer::new();
    let (recorder, mut rx) = recorder_with(&engine, ReaderSource::new(Microphone), &output);

    recorder.start(44_100, 2, EncodeMode::Quality(0.4)).unwrap();
    wait_until("captured audio", || output.len() > HEADER.len());

    recorder.abort();
    recorder.wait();

    assert!(!output.contents().ends_with(TRAILER));
    assert_eq!(
        drain_events(&mut rx),
        vec![
            RecorderStatus::Started,
            RecorderStatus::Stopped,
            RecorderStatus::Failed(EncodeResultCode::UnknownFailure)
        ]
    );
}

#[test]
fn stop_is_idempotent() {
    let engine = Arc::new(LoopbackEngine::default());
    let output = SharedBuffer::new();
    let (recorder, mut rx) = recorder_with(&engine, ReaderSource::new(Microphone), &output);

    recorder.start(44_100, 2, EncodeMode::Quality(0.4)).unwrap();
    wait_until("recording", || recorder.state() == RecordingState::Recording);

    recorder.stop();
    recorder.stop();
    recorder.wait();
    recorder.stop();

    let stopped = drain_events(&mut rx)
        .into_iter()
        .filter(|s| *s == RecorderStatus::Stopped)
        .count();
    assert_eq!(stopped, 1);
}

#[test]
fn start_while_recording_is_a_noop() {
    let engine = Arc::new(LoopbackEngine::default());
    let output = SharedBuffer::new();
    let (recorder, mut rx) = recorder_with(&engine, ReaderSource::new(Microphone), &output);

    recorder.start(44_100, 2, EncodeMode::Quality(0.4)).unwrap();
    wait_until("recording", || recorder.state() == RecordingState::Recording);
    recorder.start(8_000, 1, EncodeMode::Bitrate(64_000)).unwrap();

    recorder.stop();
    recorder.wait();

    assert_eq!(engine.drives.load(Ordering::SeqCst), 1);
    let started = drain_events(&mut rx)
        .into_iter()
        .filter(|s| *s == RecorderStatus::Started)
        .count();
    assert_eq!(started, 1);
}

#[test]
fn unsupported_device_parameters_fail_the_session() {
    let engine = Arc::new(LoopbackEngine::default());
    let output = SharedBuffer::new();
    let (recorder, mut rx) = recorder_with(&engine, UnpluggedSource, &output);

    recorder.start(44_100, 2, EncodeMode::Quality(0.4)).unwrap();
    recorder.wait();

    assert!(output.is_empty());
    assert_eq!(
        drain_events(&mut rx),
        vec![
            RecorderStatus::Stopped,
            RecorderStatus::Failed(EncodeResultCode::UnsupportedDeviceParameters)
        ]
    );
}

#[test]
fn file_target_holds_a_complete_recording() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("take.ogg");
    let engine = Arc::new(LoopbackEngine::default());
    let (tx, _rx) = mpsc::unbounded_channel::<RecorderEvent>();
    let recorder = Recorder::to_file(
        Arc::clone(&engine) as Arc<dyn CodecEngine>,
        ReaderSource::new(Cursor::new(b"pcm".to_vec())),
        &path,
        Arc::new(tx),
    );

    recorder.start(16_000, 1, EncodeMode::Quality(0.0)).unwrap();
    recorder.wait();

    assert_eq!(std::fs::read(&path).unwrap(), b"OggS-head|pcm|eos");
}

#[test]
fn recorder_can_record_twice() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("take.ogg");
    let engine = Arc::new(LoopbackEngine::default());
    let (tx, mut rx) = mpsc::unbounded_channel::<RecorderEvent>();
    let recorder = Recorder::to_file(
        Arc::clone(&engine) as Arc<dyn CodecEngine>,
        ReaderSource::new(Microphone),
        &path,
        Arc::new(tx),
    );

    for _ in 0..2 {
        recorder.start(16_000, 1, EncodeMode::Quality(0.0)).unwrap();
        wait_until("recording", || recorder.state() == RecordingState::Recording);
        recorder.stop();
        recorder.wait();
    }

    assert_eq!(engine.drives.load(Ordering::SeqCst), 2);
    let finished = drain_events(&mut rx)
        .into_iter()
        .filter(|s| *s == RecorderStatus::Finished)
        .count();
    assert_eq!(finished, 2);
}
