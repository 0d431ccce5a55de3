//! Playback sink on the default output device via `rodio`.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use oggbridge_core::{AudioSink, BridgeError, PcmFormat, pcm};
use rodio::Sink;
use rodio::buffer::SamplesBuffer;

use crate::audio_thread::AudioThreadHandle;
use crate::error::AudioDeviceError;

/// Queued buffers allowed ahead of the device once playing.
pub const DEFAULT_MAX_QUEUED_BUFFERS: usize = 8;

const QUEUE_POLL: Duration = Duration::from_millis(5);

/// [`AudioSink`] that plays PCM on the default output device.
///
/// `open` creates a paused rodio sink, so bytes written before `start` are
/// queued but silent (the player's Buffering state relies on this). Once
/// started, `write` blocks while more than `max_queued` buffers are waiting,
/// which paces the decoder to real time.
pub struct DeviceSink {
    audio: Arc<AudioThreadHandle>,
    sink: Option<Arc<Sink>>,
    format: Option<PcmFormat>,
    started: bool,
    max_queued: usize,
}

impl DeviceSink {
    pub const fn new(audio: Arc<AudioThreadHandle>) -> Self {
        Self {
            audio,
            sink: None,
            format: None,
            started: false,
            max_queued: DEFAULT_MAX_QUEUED_BUFFERS,
        }
    }

    #[must_use]
    pub const fn with_max_queued(mut self, buffers: usize) -> Self {
        self.max_queued = if buffers == 0 { 1 } else { buffers };
        self
    }

    /// Spawn a private audio thread for this sink.
    pub fn open_default() -> Result<Self, AudioDeviceError> {
        AudioThreadHandle::shared().map(Self::new)
    }

    fn active(&self) -> Result<(&Sink, PcmFormat), AudioDeviceError> {
        match (&self.sink, self.format) {
            (Some(sink), Some(format)) => Ok((sink, format)),
            _ => Err(AudioDeviceError::NotOpen),
        }
    }
}

impl AudioSink for DeviceSink {
    fn open(&mut self, format: PcmFormat) -> Result<(), BridgeError> {
        if let Some(previous) = self.sink.take() {
            previous.stop();
        }
        let sink = self.audio.open_output()?;
        tracing::debug!(
            sample_rate = format.sample_rate,
            channels = format.channels,
            "Playback sink opened"
        );
        self.sink = Some(sink);
        self.format = Some(format);
        self.started = false;
        Ok(())
    }

    fn start(&mut self) -> Result<(), BridgeError> {
        let (sink, _) = self.active()?;
        sink.play();
        self.started = true;
        tracing::debug!("Playback sink started");
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, BridgeError> {
        let (sink, format) = self.active()?;
        let samples: Vec<f32> = pcm::le_bytes_to_samples(data)
            .into_iter()
            .map(pcm::i16_to_float)
            .collect();
        if samples.is_empty() {
            return Ok(data.len());
        }

        if self.started {
            while sink.len() >= self.max_queued && !sink.is_paused() {
                thread::sleep(QUEUE_POLL);
            }
        }
        sink.append(SamplesBuffer::new(format.channels, format.sample_rate, samples));
        Ok(data.len())
    }

    fn drain(&mut self) -> Result<(), BridgeError> {
        let (sink, _) = self.active()?;
        if !sink.is_paused() {
            sink.sleep_until_end();
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BridgeError> {
        if let Some(sink) = &self.sink {
            sink.stop();
        }
        self.started = false;
        Ok(())
    }

    fn close(&mut self) -> Result<(), BridgeError> {
        if self.sink.take().is_some() {
            self.audio.release_output();
            tracing::debug!("Playback sink closed");
        }
        self.format = None;
        self.started = false;
        Ok(())
    }
}
