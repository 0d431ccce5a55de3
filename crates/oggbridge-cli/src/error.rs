//! CLI-specific error types and exit code mappings.

use oggbridge_core::{BridgeError, DecodeResultCode, EncodeResultCode, SettingsError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument or parameter validation error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audio device could not be opened or driven.
    #[error("Audio device error: {0}")]
    Device(String),

    /// Playback or decode ended with an engine error.
    #[error("Decoding failed: {0}")]
    Decode(DecodeResultCode),

    /// Recording or encode ended with an engine error.
    #[error("Encoding failed: {0}")]
    Encode(EncodeResultCode),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow sysexits.h where one fits.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Decode(_) => 65,   // EX_DATAERR
            Self::Device(_) => 69,   // EX_UNAVAILABLE
            Self::Encode(_) => 70,   // EX_SOFTWARE
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
        }
    }
}

impl From<BridgeError> for CliError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::InvalidChannels(_)
            | BridgeError::InvalidSampleRate(_)
            | BridgeError::InvalidQuality(_)
            | BridgeError::InvalidBitrate => Self::Arguments(err.to_string()),
            BridgeError::Sink(_) | BridgeError::Source(_) | BridgeError::UnsupportedParameters(_) => {
                Self::Device(err.to_string())
            }
            BridgeError::Unreadable(code) => Self::Decode(code),
            BridgeError::Settings(e) => Self::Config(e.to_string()),
            BridgeError::Io(e) => Self::Io(e.to_string()),
            BridgeError::InvalidState { .. } | BridgeError::SessionStopped | BridgeError::Spawn(_) => {
                Self::Io(err.to_string())
            }
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<oggbridge_audio::AudioDeviceError> for CliError {
    fn from(err: oggbridge_audio::AudioDeviceError) -> Self {
        Self::Device(err.to_string())
    }
}
