//! Device adapter error types.

use std::io;

use oggbridge_core::BridgeError;

/// Errors raised while opening or driving an audio device.
#[derive(Debug, thiserror::Error)]
pub enum AudioDeviceError {
    /// No audio input device found.
    #[error("No audio input device found")]
    NoInputDevice,

    /// Failed to open or run the audio input stream.
    #[error("Failed to open audio input stream: {0}")]
    InputStreamError(String),

    /// Failed to open the audio output stream.
    #[error("Failed to open audio output stream: {0}")]
    OutputStreamError(String),

    /// The device cannot run with the requested rate/channels.
    #[error("Device does not support {channels} channel(s) at {sample_rate} Hz")]
    UnsupportedParameters { sample_rate: u32, channels: u16 },

    /// No audio was captured for longer than the stall timeout.
    #[error("Capture stalled: no audio for {0} ms")]
    CaptureStalled(u128),

    /// Operation needs an open device.
    #[error("Audio device is not open")]
    NotOpen,

    /// The audio thread exited or panicked.
    #[error("Audio thread died unexpectedly")]
    AudioThreadDied,
}

impl From<AudioDeviceError> for BridgeError {
    fn from(err: AudioDeviceError) -> Self {
        match err {
            AudioDeviceError::UnsupportedParameters { .. } => {
                Self::UnsupportedParameters(err.to_string())
            }
            AudioDeviceError::NoInputDevice
            | AudioDeviceError::InputStreamError(_)
            | AudioDeviceError::CaptureStalled(_) => Self::Source(err.to_string()),
            AudioDeviceError::OutputStreamError(_) | AudioDeviceError::NotOpen => {
                Self::Sink(err.to_string())
            }
            AudioDeviceError::AudioThreadDied => {
                Self::Io(io::Error::new(io::ErrorKind::BrokenPipe, err.to_string()))
            }
        }
    }
}
