//! Audio capture: cpal input stream feeding a shared sample buffer.
//!
//! The cpal callback converts whatever the device delivers to interleaved
//! i16 and pushes it into a [`CaptureBuffer`]; the recorder's engine thread
//! pulls it back out as little-endian bytes through
//! [`DeviceSource`](crate::DeviceSource).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig, SupportedStreamConfigRange};
use oggbridge_core::{PcmFormat, pcm};

use crate::error::AudioDeviceError;

/// Ten seconds of 48 kHz stereo; older samples are dropped beyond this.
pub const DEFAULT_CAPTURE_CAPACITY: usize = 48_000 * 2 * 10;

#[derive(Debug, Default)]
struct CaptureState {
    samples: VecDeque<i16>,
    dropped: u64,
}

/// Bounded FIFO of captured samples shared between the device callback and
/// the reading thread.
#[derive(Debug, Clone)]
pub struct CaptureBuffer {
    inner: Arc<(Mutex<CaptureState>, Condvar)>,
    capturing: Arc<AtomicBool>,
    capacity: usize,
}

impl Default for CaptureBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPTURE_CAPACITY)
    }
}

impl CaptureBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new((Mutex::new(CaptureState::default()), Condvar::new())),
            capturing: Arc::new(AtomicBool::new(false)),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CaptureState> {
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accept samples from the device. Ignored while not capturing.
    pub fn push(&self, samples: &[i16]) {
        if !self.is_capturing() || samples.is_empty() {
            return;
        }
        let mut state = self.lock();
        state.samples.extend(samples.iter().copied());
        let excess = state.samples.len().saturating_sub(self.capacity);
        if excess > 0 {
            state.samples.drain(..excess);
            state.dropped += excess as u64;
        }
        drop(state);
        self.inner.1.notify_all();
    }

    /// Copy up to `buf.len() / 2` samples into `buf` as little-endian bytes,
    /// waiting at most `timeout` for the first sample. Returns bytes written.
    pub fn read_into(&self, buf: &mut [u8], timeout: Duration) -> usize {
        let wanted = buf.len() / 2;
        if wanted == 0 {
            return 0;
        }

        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        while state.samples.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                return 0;
            }
            state = self
                .inner
                .1
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        let count = wanted.min(state.samples.len());
        for (chunk, sample) in buf.chunks_exact_mut(2).zip(state.samples.drain(..count)) {
            chunk.copy_from_slice(&sample.to_le_bytes());
        }
        count * 2
    }

    pub fn set_capturing(&self, capturing: bool) {
        self.capturing.store(capturing, Ordering::Release);
        if !capturing {
            self.inner.1.notify_all();
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Acquire)
    }

    /// Discard buffered samples and the overflow count.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.samples.clear();
        state.dropped = 0;
    }

    pub fn len(&self) -> usize {
        self.lock().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples discarded because the reader fell behind.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }
}

// ── Device stream ──────────────────────────────────────────────────

/// Pick a supported input configuration with exactly the requested channel
/// count and a rate range containing the requested rate. Prefers I16, then
/// F32, then I32.
pub fn select_input_config(
    ranges: impl IntoIterator<Item = SupportedStreamConfigRange>,
    format: PcmFormat,
) -> Option<(StreamConfig, SampleFormat)> {
    let rank = |sample_format: SampleFormat| match sample_format {
        SampleFormat::I16 => Some(0),
        SampleFormat::F32 => Some(1),
        SampleFormat::I32 => Some(2),
        _ => None,
    };

    ranges
        .into_iter()
        .filter(|range| {
            range.channels() == format.channels
                && range.min_sample_rate().0 <= format.sample_rate
                && format.sample_rate <= range.max_sample_rate().0
        })
        .filter_map(|range| rank(range.sample_format()).map(|r| (r, range)))
        .min_by_key(|(r, _)| *r)
        .map(|(_, range)| {
            let sample_format = range.sample_format();
            let config: StreamConfig = range.with_sample_rate(SampleRate(format.sample_rate)).into();
            (config, sample_format)
        })
}

/// Open the default input device for `format`. The returned stream is not
/// yet playing; samples reach `buffer` only while it is capturing.
pub fn open_input_stream(format: PcmFormat, buffer: CaptureBuffer) -> Result<Stream, AudioDeviceError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(AudioDeviceError::NoInputDevice)?;

    let ranges = device
        .supported_input_configs()
        .map_err(|e| AudioDeviceError::InputStreamError(e.to_string()))?;
    let (config, sample_format) =
        select_input_config(ranges, format).ok_or(AudioDeviceError::UnsupportedParameters {
            sample_rate: format.sample_rate,
            channels: format.channels,
        })?;

    tracing::info!(
        device = %device.name().unwrap_or_default(),
        sample_rate = format.sample_rate,
        channels = format.channels,
        ?sample_format,
        "Audio capture opened"
    );

    build_input_stream(&device, &config, sample_format, buffer)
}

fn build_input_stream(
    device: &Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    buffer: CaptureBuffer,
) -> Result<Stream, AudioDeviceError> {
    let err_fn = |err: cpal::StreamError| {
        tracing::error!(%err, "Audio input stream error");
    };

    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| buffer.push(data),
            err_fn,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let samples: Vec<i16> = data.iter().map(|&s| pcm::float_to_i16(s)).collect();
                buffer.push(&samples);
            },
            err_fn,
            None,
        ),
        SampleFormat::I32 => device.build_input_stream(
            config,
            move |data: &[i32], _: &cpal::InputCallbackInfo| {
                let samples: Vec<i16> = data.iter().map(|&s| i32_to_i16(s)).collect();
                buffer.push(&samples);
            },
            err_fn,
            None,
        ),
        _ => {
            return Err(AudioDeviceError::InputStreamError(format!(
                "Unsupported sample format: {sample_format:?}"
            )));
        }
    };

    stream.map_err(|e| AudioDeviceError::InputStreamError(e.to_string()))
}

#[allow(clippy::cast_possible_truncation)]
const fn i32_to_i16(sample: i32) -> i16 {
    (sample >> 16) as i16
}
