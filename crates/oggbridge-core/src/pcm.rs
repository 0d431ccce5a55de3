//! PCM sample conversions shared by engines and device adapters.
//!
//! Everything on the feed boundary is interleaved signed 16-bit PCM; bytes on
//! the sink/source boundary are little-endian.

/// Output buffer length in samples used by the decode loop.
pub const OUTPUT_BUFFER_SAMPLES: usize = 4096;

/// Frames per decode chunk for the given channel count.
pub const fn frames_per_chunk(channels: u16) -> usize {
    let channels = if channels == 0 { 1 } else { channels as usize };
    OUTPUT_BUFFER_SAMPLES / channels
}

/// Convert a float sample in `[-1.0, 1.0]` to i16, rounding half up and clamping.
#[allow(clippy::cast_possible_truncation)]
pub fn float_to_i16(sample: f32) -> i16 {
    let value = (sample * 32767.0 + 0.5).floor();
    value.clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

pub fn i16_to_float(sample: i16) -> f32 {
    f32::from(sample) / 32768.0
}

/// Interleave `frames` frames of planar float audio starting at `offset`.
pub fn interleave_into<P: AsRef<[f32]>>(planes: &[P], offset: usize, frames: usize, out: &mut Vec<i16>) {
    out.clear();
    out.reserve(frames * planes.len());
    for frame in offset..offset + frames {
        for plane in planes {
            out.push(float_to_i16(plane.as_ref()[frame]));
        }
    }
}

pub fn samples_to_le_bytes(samples: &[i16], out: &mut Vec<u8>) {
    out.clear();
    out.reserve(samples.len() * 2);
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
}

/// Decode little-endian i16 samples; a trailing odd byte is ignored.
pub fn le_bytes_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Split interleaved little-endian i16 bytes into float planes.
///
/// Only whole frames are converted.
pub fn deinterleave_le_bytes(bytes: &[u8], channels: u16) -> Vec<Vec<f32>> {
    let channels = usize::from(channels.max(1));
    let frames = bytes.len() / (channels * 2);
    let mut planes = vec![Vec::with_capacity(frames); channels];
    for (index, pair) in bytes.chunks_exact(2).take(frames * channels).enumerate() {
        let sample = i16::from_le_bytes([pair[0], pair[1]]);
        planes[index % channels].push(i16_to_float(sample));
    }
    planes
}
