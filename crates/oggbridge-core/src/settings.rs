//! Settings domain types and validation.
//!
//! All fields are optional so a partial JSON file only overrides what it names.

use serde::{Deserialize, Serialize};

/// Samples accumulated before a buffered player starts its sink.
pub const DEFAULT_BUFFER_THRESHOLD_SAMPLES: u64 = 24_000;

/// Bytes of silence written when a buffered player is stopped mid-buffer.
pub const DEFAULT_SILENCE_FLUSH_BYTES: usize = 20_000;

/// Upper bound on how long a paused callback sleeps before re-checking state.
pub const DEFAULT_PAUSE_POLL_INTERVAL_MS: u64 = 100;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_CHANNELS: u16 = 2;
pub const DEFAULT_QUALITY: f32 = 0.4;

/// Bridge settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Samples (not frames) buffered before playback starts.
    pub buffer_threshold_samples: Option<u64>,

    /// Silence written to the sink when stopping during buffering.
    pub silence_flush_bytes: Option<usize>,

    /// Pause wait re-check interval in milliseconds (1-1000).
    pub pause_poll_interval_ms: Option<u64>,

    /// Default recording sample rate.
    pub default_sample_rate: Option<u32>,

    /// Default recording channel count (1 or 2).
    pub default_channels: Option<u16>,

    /// Default VBR quality (-0.1 to 1.0).
    pub default_quality: Option<f32>,
}

impl Settings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub const fn with_defaults() -> Self {
        Self {
            buffer_threshold_samples: Some(DEFAULT_BUFFER_THRESHOLD_SAMPLES),
            silence_flush_bytes: Some(DEFAULT_SILENCE_FLUSH_BYTES),
            pause_poll_interval_ms: Some(DEFAULT_PAUSE_POLL_INTERVAL_MS),
            default_sample_rate: Some(DEFAULT_SAMPLE_RATE),
            default_channels: Some(DEFAULT_CHANNELS),
            default_quality: Some(DEFAULT_QUALITY),
        }
    }

    #[must_use]
    pub const fn effective_buffer_threshold_samples(&self) -> u64 {
        match self.buffer_threshold_samples {
            Some(samples) => samples,
            None => DEFAULT_BUFFER_THRESHOLD_SAMPLES,
        }
    }

    #[must_use]
    pub const fn effective_silence_flush_bytes(&self) -> usize {
        match self.silence_flush_bytes {
            Some(bytes) => bytes,
            None => DEFAULT_SILENCE_FLUSH_BYTES,
        }
    }

    #[must_use]
    pub const fn effective_pause_poll_interval_ms(&self) -> u64 {
        match self.pause_poll_interval_ms {
            Some(ms) => ms,
            None => DEFAULT_PAUSE_POLL_INTERVAL_MS,
        }
    }

    #[must_use]
    pub const fn effective_sample_rate(&self) -> u32 {
        match self.default_sample_rate {
            Some(rate) => rate,
            None => DEFAULT_SAMPLE_RATE,
        }
    }

    #[must_use]
    pub const fn effective_channels(&self) -> u16 {
        match self.default_channels {
            Some(channels) => channels,
            None => DEFAULT_CHANNELS,
        }
    }

    #[must_use]
    pub const fn effective_quality(&self) -> f32 {
        match self.default_quality {
            Some(quality) => quality,
            None => DEFAULT_QUALITY,
        }
    }
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Buffer threshold must be greater than zero")]
    ZeroBufferThreshold,

    #[error("Pause poll interval must be between 1 and 1000 ms, got {0}")]
    InvalidPollInterval(u64),

    #[error("Default channel count must be 1 or 2, got {0}")]
    InvalidChannels(u16),

    #[error("Default sample rate must be greater than zero")]
    ZeroSampleRate,

    #[error("Default quality must be between -0.1 and 1.0, got {0}")]
    InvalidQuality(f32),
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if settings.buffer_threshold_samples == Some(0) {
        return Err(SettingsError::ZeroBufferThreshold);
    }

    if let Some(ms) = settings.pause_poll_interval_ms {
        if !(1..=1000).contains(&ms) {
            return Err(SettingsError::InvalidPollInterval(ms));
        }
    }

    if let Some(channels) = settings.default_channels {
        if channels != 1 && channels != 2 {
            return Err(SettingsError::InvalidChannels(channels));
        }
    }

    if settings.default_sample_rate == Some(0) {
        return Err(SettingsError::ZeroSampleRate);
    }

    if let Some(quality) = settings.default_quality {
        if !(-0.1..=1.0).contains(&quality) {
            return Err(SettingsError::InvalidQuality(quality));
        }
    }

    Ok(())
}
