//! Bridge error types.

use crate::result::DecodeResultCode;
use crate::settings::SettingsError;

/// Errors surfaced by feeds, adapters and controllers.
///
/// Engine outcomes are not errors: they travel as [`DecodeResultCode`] /
/// [`EncodeResultCode`](crate::result::EncodeResultCode) values and end up in
/// a terminal status notification.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Channel count outside the supported range.
    #[error("Unsupported channel count {0}, expected 1 or 2")]
    InvalidChannels(u16),

    /// Sample rate of zero.
    #[error("Sample rate must be greater than zero, got {0}")]
    InvalidSampleRate(u32),

    /// VBR quality outside `[-0.1, 1.0]`.
    #[error("Quality must be between -0.1 and 1.0, got {0}")]
    InvalidQuality(f32),

    /// Average bitrate of zero.
    #[error("Bitrate must be greater than zero")]
    InvalidBitrate,

    /// A feed hook was called in a state that does not allow it.
    #[error("Invalid session state: expected {expected}, found {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// The session was stopped before the hook could take effect.
    #[error("Session was stopped")]
    SessionStopped,

    /// Audio sink failure (device or writer).
    #[error("Audio sink error: {0}")]
    Sink(String),

    /// Audio source failure (device or reader).
    #[error("Audio source error: {0}")]
    Source(String),

    /// The device cannot be opened with the requested format.
    #[error("Unsupported audio parameters: {0}")]
    UnsupportedParameters(String),

    /// The stream metadata could not be read.
    #[error("Unreadable stream: {0}")]
    Unreadable(DecodeResultCode),

    /// Failed to spawn the drive thread.
    #[error("Failed to spawn drive thread: {0}")]
    Spawn(String),

    /// Invalid settings.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// IO error (files, pipes).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
