//! Codec integration tests: record a generated tone through the real
//! recorder into a temporary file, then play it back through the real
//! player feeds and the libvorbis engine.

use std::f32::consts::TAU;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use oggbridge_core::{
    CodecEngine, DecodeResultCode, EncodeMode, Player, PlayerConfig, PlayerEvent, PlayerStatus, ReaderSource,
    Recorder, RecorderEvent, RecorderStatus, SharedBuffer, StreamInfo, WriterSink, pcm,
};
use oggbridge_vorbis::VorbisEngine;
use tokio::sync::mpsc;

const RATE: u32 = 44_100;
const CHANNELS: u16 = 2;
const SECONDS: u32 = 10;
const LONG_SECONDS: u32 = 120;

// ── Fixtures ───────────────────────────────────────────────────────

/// Interleaved s16le stereo sine tone.
fn sine_pcm(seconds: u32) -> Vec<u8> {
    let frames = RATE * seconds;
    let mut samples = Vec::with_capacity(frames as usize * usize::from(CHANNELS));
    for i in 0..frames {
        let t = i as f32 / RATE as f32;
        let sample = pcm::float_to_i16(0.5 * (TAU * 440.0 * t).sin());
        samples.push(sample);
        samples.push(sample);
    }
    let mut bytes = Vec::new();
    pcm::samples_to_le_bytes(&samples, &mut bytes);
    bytes
}

fn engine() -> Arc<dyn CodecEngine> {
    VorbisEngine::shared()
}

fn record(path: &Path, seconds: u32, mode: EncodeMode) -> Vec<RecorderStatus> {
    let (tx, mut rx) = mpsc::unbounded_channel::<RecorderEvent>();
    let recorder = Recorder::to_file(
        engine(),
        ReaderSource::new(Cursor::new(sine_pcm(seconds))),
        path,
        Arc::new(tx),
    );
    recorder.start(RATE, CHANNELS, mode).unwrap();
    recorder.wait();

    let mut statuses = Vec::new();
    while let Ok(RecorderEvent::Status(status)) = rx.try_recv() {
        statuses.push(status);
    }
    statuses
}

fn recorded_tone() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.ogg");
    let statuses = record(&path, SECONDS, EncodeMode::Quality(0.4));
    assert_eq!(
        statuses,
        vec![RecorderStatus::Started, RecorderStatus::Stopped, RecorderStatus::Finished]
    );
    (dir, path)
}

struct Playback {
    events: Vec<PlayerEvent>,
    pcm_bytes: usize,
}

impl Playback {
    fn stream_infos(&self) -> Vec<StreamInfo> {
        self.events
            .iter()
            .filter_map(|e| match e {
                PlayerEvent::StreamInfo(info) => Some(info.clone()),
                _ => None,
            })
            .collect()
    }

    fn outcome(&self) -> Option<PlayerStatus> {
        self.events.iter().rev().find_map(|e| match e {
            PlayerEvent::Status(status) if status.is_outcome() => Some(*status),
            _ => None,
        })
    }

    fn last_progress(&self) -> Option<u64> {
        self.events.iter().rev().find_map(|e| match e {
            PlayerEvent::Progress(seconds) => Some(*seconds),
            _ => None,
        })
    }
}

fn run_player(build: impl FnOnce(WriterSink<SharedBuffer>, Arc<mpsc::UnboundedSender<PlayerEvent>>) -> Player, seek: Option<i64>) -> Playback {
    let output = SharedBuffer::new();
    let (tx, mut rx) = mpsc::unbounded_channel::<PlayerEvent>();
    let player = build(WriterSink::new(output.clone()), Arc::new(tx));
    if let Some(seconds) = seek {
        player.seek_to_seconds(seconds);
    }
    player.start().unwrap();
    player.wait();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    Playback {
        events,
        pcm_bytes: output.len(),
    }
}

fn play_file(path: &Path, seek: Option<i64>) -> Playback {
    let path = path.to_path_buf();
    run_player(
        |sink, listener| Player::from_file(engine(), path, sink, listener, PlayerConfig::default()),
        seek,
    )
}

fn play_bytes(bytes: Vec<u8>, seek: Option<i64>) -> Playback {
    run_player(
        |sink, listener| Player::from_stream(engine(), Cursor::new(bytes), sink, listener, PlayerConfig::default()),
        seek,
    )
}

fn seconds_of_pcm(bytes: usize) -> f64 {
    bytes as f64 / f64::from(RATE * u32::from(CHANNELS) * 2)
}

fn second_page_offset(bytes: &[u8]) -> usize {
    bytes
        .windows(4)
        .enumerate()
        .skip(1)
        .find(|(_, w)| *w == b"OggS")
        .map(|(i, _)| i)
        .unwrap()
}

// ── Tests ──────────────────────────────────────────────────────────

#[test]
fn recorded_file_plays_back_with_duration() {
    let (_dir, path) = recorded_tone();

    let playback = play_file(&path, None);

    let infos = playback.stream_infos();
    assert_eq!(infos.len(), 1, "start must be called exactly once");
    assert_eq!(infos[0].sample_rate, RATE);
    assert_eq!(infos[0].channels, CHANNELS);
    assert_eq!(infos[0].duration_seconds, i64::from(SECONDS));
    assert!(!infos[0].vendor.is_empty());

    assert!(playback.pcm_bytes > 0);
    assert!((seconds_of_pcm(playback.pcm_bytes) - f64::from(SECONDS)).abs() < 0.2);
    assert!(matches!(playback.last_progress(), Some(9 | 10)), "progress {:?}", playback.last_progress());
    assert_eq!(playback.outcome(), Some(PlayerStatus::Finished));
}

#[test]
fn metadata_lookup_reports_duration() {
    let (_dir, path) = recorded_tone();
    let info = engine().read_file_metadata(&path).unwrap();
    assert_eq!(info.sample_rate, RATE);
    assert_eq!(info.channels, CHANNELS);
    assert_eq!(info.duration_seconds, i64::from(SECONDS));
    assert_eq!(info.duration(), Some(u64::from(SECONDS)));
}

#[test]
fn stream_playback_has_unknown_duration() {
    let (_dir, path) = recorded_tone();
    let playback = play_bytes(std::fs::read(&path).unwrap(), None);

    let infos = playback.stream_infos();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].duration_seconds, -1);
    assert!((seconds_of_pcm(playback.pcm_bytes) - f64::from(SECONDS)).abs() < 0.2);
    assert_eq!(playback.outcome(), Some(PlayerStatus::Finished));
}

#[test]
fn file_seek_skips_to_target() {
    let (_dir, path) = recorded_tone();
    let playback = play_file(&path, Some(8));

    let played = seconds_of_pcm(playback.pcm_bytes);
    assert!((played - 2.0).abs() < 0.2, "played {played:.2}s after seeking to 8s");
    assert_eq!(playback.outcome(), Some(PlayerStatus::Finished));
}

#[test]
fn stop_during_a_long_file_seek_returns_promptly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("long.ogg");
    record(&path, LONG_SECONDS, EncodeMode::Quality(0.0));

    let output = SharedBuffer::new();
    let (tx, mut rx) = mpsc::unbounded_channel::<PlayerEvent>();
    let player = Player::from_file(
        engine(),
        path,
        WriterSink::new(output.clone()),
        Arc::new(tx),
        PlayerConfig::default(),
    );
    player.seek_to_seconds(i64::from(LONG_SECONDS) - 10);
    player.start().unwrap();

    let mut events = Vec::new();
    while let Some(event) = rx.blocking_recv() {
        let announced = matches!(event, PlayerEvent::StreamInfo(_));
        events.push(event);
        if announced {
            break;
        }
    }

    let stopping = Instant::now();
    player.stop();
    player.wait();
    let latency = stopping.elapsed();

    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    let playback = Playback {
        events,
        pcm_bytes: output.len(),
    };

    assert!(latency < Duration::from_millis(300), "stop took {latency:?} while skipping ahead");
    assert!(playback.events.contains(&PlayerEvent::Status(PlayerStatus::Stopped)));
    assert_eq!(playback.outcome(), Some(PlayerStatus::Finished));
    assert!(seconds_of_pcm(playback.pcm_bytes) < 1.0);
}

#[test]
fn stream_forward_seek_discards_audio() {
    let (_dir, path) = recorded_tone();
    let playback = play_bytes(std::fs::read(&path).unwrap(), Some(6));

    let played = seconds_of_pcm(playback.pcm_bytes);
    assert!((played - 4.0).abs() < 0.2, "played {played:.2}s after seeking to 6s");
}

#[test]
fn non_ogg_input_is_an_invalid_bitstream() {
    let playback = play_bytes(b"RIFF\x24\0\0\0WAVEfmt \x10\0\0\0".to_vec(), None);

    assert!(playback.stream_infos().is_empty(), "start must not be called");
    assert_eq!(playback.pcm_bytes, 0);
    assert_eq!(
        playback.outcome(),
        Some(PlayerStatus::Failed(DecodeResultCode::InvalidBitstream))
    );
}

#[test]
fn truncated_headers_are_a_premature_eof() {
    let (_dir, path) = recorded_tone();
    let bytes = std::fs::read(&path).unwrap();
    let cut = second_page_offset(&bytes) + 40;

    let playback = play_bytes(bytes[..cut].to_vec(), None);

    assert!(playback.stream_infos().is_empty());
    assert_eq!(
        playback.outcome(),
        Some(PlayerStatus::Failed(DecodeResultCode::PrematureEof))
    );
}

#[test]
fn empty_input_finishes_quietly() {
    let playback = play_bytes(Vec::new(), None);
    assert!(playback.stream_infos().is_empty());
    assert_eq!(playback.outcome(), Some(PlayerStatus::Finished));
}

#[test]
fn missing_file_is_not_a_vorbis_header() {
    let playback = play_file(Path::new("/no/such/tone.ogg"), None);
    assert_eq!(
        playback.outcome(),
        Some(PlayerStatus::Failed(DecodeResultCode::NotVorbisHeader))
    );
}

#[test]
fn bitrate_mode_produces_a_playable_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("abr.ogg");
    let statuses = record(&path, 2, EncodeMode::Bitrate(96_000));
    assert_eq!(statuses.last(), Some(&RecorderStatus::Finished));

    let info = engine().read_file_metadata(&path).unwrap();
    assert_eq!(info.duration_seconds, 2);
}
