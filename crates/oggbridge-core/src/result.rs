//! Terminal outcomes of a drive call.
//!
//! Each drive call returns exactly one code. The numeric values match the
//! native engine's wire values so they can be logged or exported unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of a decode drive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecodeResultCode {
    Success,
    /// Input does not start with an Ogg capture pattern.
    InvalidBitstream,
    /// The first Ogg page is truncated or fails its checksum.
    FirstPageReadError,
    /// The first page carries no complete packet.
    HeaderPacketReadError,
    /// The first packet is not a Vorbis identification header.
    NotVorbisHeader,
    /// Comment or setup header is malformed.
    CorruptSecondaryHeader,
    /// Input ended before all three headers were read.
    PrematureEof,
    /// The feed refused `start(stream_info)`.
    StartRejected,
}

impl DecodeResultCode {
    /// Numeric wire value.
    pub const fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::InvalidBitstream => -21,
            Self::FirstPageReadError => -22,
            Self::HeaderPacketReadError => -23,
            Self::NotVorbisHeader => -24,
            Self::CorruptSecondaryHeader => -25,
            Self::PrematureEof => -26,
            Self::StartRejected => -27,
        }
    }

    pub const fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => Self::Success,
            -21 => Self::InvalidBitstream,
            -22 => Self::FirstPageReadError,
            -23 => Self::HeaderPacketReadError,
            -24 => Self::NotVorbisHeader,
            -25 => Self::CorruptSecondaryHeader,
            -26 => Self::PrematureEof,
            -27 => Self::StartRejected,
            _ => return None,
        })
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for DecodeResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Success => "success",
            Self::InvalidBitstream => "invalid Ogg bitstream",
            Self::FirstPageReadError => "error reading first page",
            Self::HeaderPacketReadError => "error reading initial header packet",
            Self::NotVorbisHeader => "not a Vorbis header",
            Self::CorruptSecondaryHeader => "corrupt secondary header",
            Self::PrematureEof => "premature end of file",
            Self::StartRejected => "stream start rejected",
        };
        write!(f, "{text} ({})", self.code())
    }
}

/// Outcome of an encode drive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncodeResultCode {
    Success,
    /// The encoder could not be initialised with the requested parameters.
    InitializationError,
    /// Encoding aborted part way, usually because the output refused bytes.
    UnknownFailure,
    /// The capture source or output could not be opened.
    UnsupportedDeviceParameters,
}

impl EncodeResultCode {
    /// Numeric wire value.
    pub const fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::InitializationError => -1,
            Self::UnknownFailure => -2,
            Self::UnsupportedDeviceParameters => -3,
        }
    }

    pub const fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => Self::Success,
            -1 => Self::InitializationError,
            -2 => Self::UnknownFailure,
            -3 => Self::UnsupportedDeviceParameters,
            _ => return None,
        })
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for EncodeResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Success => "finished successfully",
            Self::InitializationError => "error initializing encoder",
            Self::UnknownFailure => "failed for unknown reason",
            Self::UnsupportedDeviceParameters => "unsupported audio parameters",
        };
        write!(f, "{text} ({})", self.code())
    }
}
