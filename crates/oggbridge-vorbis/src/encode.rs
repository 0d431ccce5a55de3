//! Encode drive call.
//!
//! Pulls interleaved little-endian PCM from the feed, hands whole frames to
//! libvorbis as float planes and streams the Ogg pages back out through the
//! feed's output side.

use std::io::Write;
use std::num::{NonZeroU8, NonZeroU32};

use oggbridge_core::{BridgeError, EncodeFeed, EncodeMode, EncodeResultCode, FeedWriter, PcmFormat, pcm};
use vorbis_rs::{VorbisBitrateManagementStrategy, VorbisEncoder, VorbisEncoderBuilder};

use crate::error::EngineError;

/// Bytes requested from the feed per read.
pub const READ_BUFFER_BYTES: usize = 4096;

pub fn encode(format: PcmFormat, mode: EncodeMode, feed: &dyn EncodeFeed) -> EncodeResultCode {
    let code = run(format, mode, feed);
    feed.stop();
    code
}

fn run(format: PcmFormat, mode: EncodeMode, feed: &dyn EncodeFeed) -> EncodeResultCode {
    match feed.start() {
        Ok(()) => {}
        Err(BridgeError::SessionStopped) => return EncodeResultCode::Success,
        Err(e) => {
            tracing::warn!(%e, "Recording could not be opened");
            return EncodeResultCode::UnsupportedDeviceParameters;
        }
    }

    let mut output = FeedWriter::new(feed);
    let code = pump(format, mode, feed, &mut output);
    if code.is_success() && output.refused() {
        return EncodeResultCode::UnknownFailure;
    }
    code
}

fn pump(format: PcmFormat, mode: EncodeMode, feed: &dyn EncodeFeed, output: &mut FeedWriter<'_>) -> EncodeResultCode {
    let mut encoder = match build_encoder(format, mode, output) {
        Ok(encoder) => encoder,
        Err(e) => {
            tracing::warn!(%e, "Failed to initialise Vorbis encoder");
            return EncodeResultCode::InitializationError;
        }
    };
    tracing::debug!(?mode, sample_rate = format.sample_rate, channels = format.channels, "Encoder ready");

    let frame_bytes = format.frame_bytes();
    let mut buf = vec![0_u8; READ_BUFFER_BYTES];
    let mut pending: Vec<u8> = Vec::with_capacity(READ_BUFFER_BYTES + frame_bytes);

    loop {
        let n = feed.read_input(&mut buf);
        if n == 0 {
            break;
        }
        pending.extend_from_slice(&buf[..n]);

        // A read may end mid-frame; the remainder waits for the next one.
        let whole = pending.len() - pending.len() % frame_bytes;
        if whole == 0 {
            continue;
        }
        let planes = pcm::deinterleave_le_bytes(&pending[..whole], format.channels);
        pending.drain(..whole);

        if let Err(e) = encoder.encode_audio_block(&planes) {
            tracing::warn!(%e, "Encoding failed");
            return EncodeResultCode::UnknownFailure;
        }
    }

    if !pending.is_empty() {
        tracing::debug!(bytes = pending.len(), "Dropping partial trailing frame");
    }

    match encoder.finish() {
        Ok(_) => EncodeResultCode::Success,
        Err(e) => {
            tracing::warn!(%e, "Failed to finalise Vorbis stream");
            EncodeResultCode::UnknownFailure
        }
    }
}

fn strategy(mode: EncodeMode) -> Result<VorbisBitrateManagementStrategy, EngineError> {
    match mode {
        EncodeMode::Quality(target_quality) => Ok(VorbisBitrateManagementStrategy::QualityVbr { target_quality }),
        EncodeMode::Bitrate(bitrate) => NonZeroU32::new(bitrate)
            .map(|average_bitrate| VorbisBitrateManagementStrategy::Abr { average_bitrate })
            .ok_or_else(|| EngineError::Format("bitrate must be non-zero".into())),
    }
}

fn build_encoder<W: Write>(format: PcmFormat, mode: EncodeMode, sink: W) -> Result<VorbisEncoder<W>, EngineError> {
    let sample_rate = NonZeroU32::new(format.sample_rate)
        .ok_or_else(|| EngineError::Format("sample rate must be non-zero".into()))?;
    let channels = u8::try_from(format.channels)
        .ok()
        .and_then(NonZeroU8::new)
        .ok_or_else(|| EngineError::Format(format!("unsupported channel count {}", format.channels)))?;

    let mut builder = VorbisEncoderBuilder::new(sample_rate, channels, sink)?;
    builder.bitrate_management_strategy(strategy(mode)?);
    Ok(builder.build()?)
}
