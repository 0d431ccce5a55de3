//! Codec engine port.
//!
//! An engine runs one blocking drive call per session and talks to the
//! application only through the feed it is given. Implementations must call
//! the feed's `stop()` on every exit path.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::feed::{DecodeFeed, EncodeFeed};
use crate::result::{DecodeResultCode, EncodeResultCode};
use crate::stream_info::{PcmFormat, StreamInfo};

/// Blocking Vorbis codec entry points.
pub trait CodecEngine: Send + Sync {
    /// Decode whatever the feed's `read_input` yields.
    fn decode_stream(&self, feed: &dyn DecodeFeed) -> DecodeResultCode;

    /// Decode a seekable file. The feed's input side is not used.
    fn decode_file(&self, path: &Path, feed: &dyn DecodeFeed) -> DecodeResultCode;

    /// Read stream metadata (including duration) without decoding audio.
    fn read_file_metadata(&self, path: &Path) -> Result<StreamInfo, BridgeError>;

    fn encode_with_quality(&self, format: PcmFormat, quality: f32, feed: &dyn EncodeFeed) -> EncodeResultCode;

    fn encode_with_bitrate(&self, format: PcmFormat, bitrate: u32, feed: &dyn EncodeFeed) -> EncodeResultCode;
}

/// How the encoder manages bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "value")]
pub enum EncodeMode {
    /// Variable bitrate at a target quality in `[-0.1, 1.0]`.
    Quality(f32),
    /// Average bitrate in bits per second.
    Bitrate(u32),
}

impl EncodeMode {
    pub const MIN_QUALITY: f32 = -0.1;
    pub const MAX_QUALITY: f32 = 1.0;

    pub fn validate(self) -> Result<(), BridgeError> {
        match self {
            Self::Quality(q) if !(Self::MIN_QUALITY..=Self::MAX_QUALITY).contains(&q) => {
                Err(BridgeError::InvalidQuality(q))
            }
            Self::Bitrate(0) => Err(BridgeError::InvalidBitrate),
            _ => Ok(()),
        }
    }

    /// Dispatch to the matching engine entry point.
    pub fn run(self, engine: &dyn CodecEngine, format: PcmFormat, feed: &dyn EncodeFeed) -> EncodeResultCode {
        match self {
            Self::Quality(q) => engine.encode_with_quality(format, q, feed),
            Self::Bitrate(b) => engine.encode_with_bitrate(format, b, feed),
        }
    }
}

/// Edge detector over [`DecodeFeed::query_seek_target`].
///
/// Yields a target only when the polled value changes and is non-negative.
/// Polling the same value twice yields it once; to seek to the same second
/// again the caller must pass through `-1` first.
#[derive(Debug, Clone)]
pub struct SeekTracker {
    last: i64,
}

impl SeekTracker {
    pub const fn new() -> Self {
        Self { last: -1 }
    }

    pub fn poll(&mut self, feed: &dyn DecodeFeed) -> Option<u64> {
        self.observe(feed.query_seek_target())
    }

    pub fn observe(&mut self, current: i64) -> Option<u64> {
        if current == self.last {
            return None;
        }
        self.last = current;
        u64::try_from(current).ok()
    }
}

impl Default for SeekTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a running frame position into whole elapsed seconds.
#[derive(Debug, Clone)]
pub struct ElapsedClock {
    sample_rate: u64,
    frames: u64,
    reported: u64,
}

impl ElapsedClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: u64::from(sample_rate.max(1)),
            frames: 0,
            reported: 0,
        }
    }

    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Jump to an absolute frame position (after a seek).
    pub const fn set_frames(&mut self, frames: u64) {
        self.frames = frames;
    }

    pub fn advance(&mut self, frames: u64) {
        self.frames += frames;
    }

    /// The current whole second, if it differs from the last one reported.
    pub const fn take_change(&mut self) -> Option<u64> {
        let seconds = self.frames / self.sample_rate;
        if seconds == self.reported {
            return None;
        }
        self.reported = seconds;
        Some(seconds)
    }

    pub const fn frames_for_seconds(&self, seconds: u64) -> u64 {
        seconds.saturating_mul(self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_mode_validation() {
        assert!(EncodeMode::Quality(-0.1).validate().is_ok());
        assert!(EncodeMode::Quality(1.0).validate().is_ok());
        assert!(matches!(
            EncodeMode::Quality(1.01).validate(),
            Err(BridgeError::InvalidQuality(_))
        ));
        assert!(matches!(
            EncodeMode::Quality(-0.2).validate(),
            Err(BridgeError::InvalidQuality(_))
        ));
        assert!(matches!(
            EncodeMode::Bitrate(0).validate(),
            Err(BridgeError::InvalidBitrate)
        ));
        assert!(EncodeMode::Bitrate(128_000).validate().is_ok());
    }

    #[test]
    fn seek_is_edge_triggered() {
        let mut tracker = SeekTracker::new();
        assert_eq!(tracker.observe(-1), None);
        assert_eq!(tracker.observe(5), Some(5));
        assert_eq!(tracker.observe(5), None);
        assert_eq!(tracker.observe(5), None);
        assert_eq!(tracker.observe(-1), None);
        assert_eq!(tracker.observe(5), Some(5));
        assert_eq!(tracker.observe(7), Some(7));
    }

    #[test]
    fn clock_reports_each_second_once() {
        let mut clock = ElapsedClock::new(10);
        clock.advance(9);
        assert_eq!(clock.take_change(), None);
        clock.advance(1);
        assert_eq!(clock.take_change(), Some(1));
        assert_eq!(clock.take_change(), None);
        clock.advance(25);
        assert_eq!(clock.take_change(), Some(3));
    }

    #[test]
    fn clock_follows_seeks() {
        let mut clock = ElapsedClock::new(8_000);
        clock.set_frames(clock.frames_for_seconds(4));
        assert_eq!(clock.take_change(), Some(4));
        clock.set_frames(0);
        assert_eq!(clock.take_change(), Some(0));
    }

    #[test]
    fn encode_mode_serializes_tagged() {
        let json = serde_json::to_string(&EncodeMode::Bitrate(96_000)).unwrap();
        assert_eq!(json, r#"{"mode":"bitrate","value":96000}"#);
    }
}
