//! Engine-side error type.

use std::io;

use oggbridge_core::{BridgeError, DecodeResultCode};

use crate::header::HeaderError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error("libvorbis error: {0}")]
    Vorbis(#[from] vorbis_rs::VorbisError),

    #[error("unsupported encoder format: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<EngineError> for BridgeError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Io(e) | EngineError::Header(HeaderError::Io(e)) => Self::Io(e),
            EngineError::Header(header) => Self::Unreadable(header.code()),
            EngineError::Vorbis(_) => Self::Unreadable(DecodeResultCode::CorruptSecondaryHeader),
            EngineError::Format(message) => Self::UnsupportedParameters(message),
        }
    }
}
