//! Stream metadata and PCM format descriptors.

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Metadata produced by the engine once the stream headers are parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub vendor: String,
    /// Whole seconds, `-1` when unknown (unseekable streams).
    pub duration_seconds: i64,
}

impl StreamInfo {
    pub fn new(sample_rate: u32, channels: u16, vendor: impl Into<String>, duration_seconds: i64) -> Self {
        Self {
            sample_rate,
            channels,
            vendor: vendor.into(),
            duration_seconds,
        }
    }

    /// Duration in seconds, `None` when the stream length is unknown.
    pub fn duration(&self) -> Option<u64> {
        u64::try_from(self.duration_seconds).ok()
    }

    /// Interleaved signed 16-bit format matching this stream.
    pub const fn pcm_format(&self) -> PcmFormat {
        PcmFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

/// Interleaved signed 16-bit little-endian PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmFormat {
    pub const BYTES_PER_SAMPLE: usize = 2;

    /// Build a format, rejecting channel counts other than 1 or 2 and a zero rate.
    pub fn new(sample_rate: u32, channels: u16) -> Result<Self, BridgeError> {
        let format = Self {
            sample_rate,
            channels,
        };
        format.validate()?;
        Ok(format)
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.channels != 1 && self.channels != 2 {
            return Err(BridgeError::InvalidChannels(self.channels));
        }
        if self.sample_rate == 0 {
            return Err(BridgeError::InvalidSampleRate(self.sample_rate));
        }
        Ok(())
    }

    /// Bytes in one interleaved frame.
    pub const fn frame_bytes(&self) -> usize {
        self.channels as usize * Self::BYTES_PER_SAMPLE
    }

    /// Bytes for one second of audio.
    pub const fn bytes_per_second(&self) -> usize {
        self.sample_rate as usize * self.frame_bytes()
    }
}
