//! [`CodecEngine`] implementation backed by libvorbis.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use oggbridge_core::{
    BridgeError, CodecEngine, DecodeFeed, DecodeResultCode, EncodeFeed, EncodeMode, EncodeResultCode, PcmFormat,
    StreamInfo,
};

use crate::{decode, encode};

static ENGINE: OnceLock<Arc<VorbisEngine>> = OnceLock::new();

/// The libvorbis codec engine.
///
/// Stateless apart from one-time process initialisation; every drive call
/// owns its decoder or encoder for the duration of the call.
#[derive(Debug)]
pub struct VorbisEngine {
    _private: (),
}

impl VorbisEngine {
    /// The process-wide engine, initialised on first use.
    pub fn shared() -> Arc<Self> {
        Arc::clone(ENGINE.get_or_init(|| {
            tracing::info!(
                backend = "libvorbis",
                version = env!("CARGO_PKG_VERSION"),
                "Vorbis engine initialised"
            );
            Arc::new(Self { _private: () })
        }))
    }
}

impl CodecEngine for VorbisEngine {
    fn decode_stream(&self, feed: &dyn DecodeFeed) -> DecodeResultCode {
        decode::decode_stream(feed)
    }

    fn decode_file(&self, path: &Path, feed: &dyn DecodeFeed) -> DecodeResultCode {
        decode::decode_file(path, feed)
    }

    fn read_file_metadata(&self, path: &Path) -> Result<StreamInfo, BridgeError> {
        decode::read_metadata(path)
            .map(|(_, info)| info)
            .map_err(BridgeError::from)
    }

    fn encode_with_quality(&self, format: PcmFormat, quality: f32, feed: &dyn EncodeFeed) -> EncodeResultCode {
        encode::encode(format, EncodeMode::Quality(quality), feed)
    }

    fn encode_with_bitrate(&self, format: PcmFormat, bitrate: u32, feed: &dyn EncodeFeed) -> EncodeResultCode {
        encode::encode(format, EncodeMode::Bitrate(bitrate), feed)
    }
}
