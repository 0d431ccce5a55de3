//! Capture source on the default input device via `cpal`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use oggbridge_core::{AudioSource, BridgeError, PcmFormat};

use crate::audio_thread::AudioThreadHandle;
use crate::capture::CaptureBuffer;
use crate::error::AudioDeviceError;

/// How long `read` waits for the device before giving up.
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(2);

const READ_SLICE: Duration = Duration::from_millis(50);

/// [`AudioSource`] that records from the default input device.
///
/// `read` blocks until the device delivers audio. A device that stays silent
/// for longer than the stall timeout is reported as a source error, which the
/// recorder treats as a request to finish.
pub struct DeviceSource {
    audio: Arc<AudioThreadHandle>,
    buffer: CaptureBuffer,
    stall_timeout: Duration,
    open: bool,
}

impl DeviceSource {
    pub fn new(audio: Arc<AudioThreadHandle>) -> Self {
        Self {
            audio,
            buffer: CaptureBuffer::default(),
            stall_timeout: DEFAULT_STALL_TIMEOUT,
            open: false,
        }
    }

    #[must_use]
    pub const fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    /// Spawn a private audio thread for this source.
    pub fn open_default() -> Result<Self, AudioDeviceError> {
        AudioThreadHandle::shared().map(Self::new)
    }

    pub const fn buffer(&self) -> &CaptureBuffer {
        &self.buffer
    }
}

impl AudioSource for DeviceSource {
    fn open(&mut self, format: PcmFormat) -> Result<(), BridgeError> {
        self.audio.open_input(format, self.buffer.clone())?;
        self.open = true;
        Ok(())
    }

    fn start(&mut self) -> Result<(), BridgeError> {
        if !self.open {
            return Err(not_open());
        }
        self.audio.start_input()?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, BridgeError> {
        if !self.open {
            return Err(not_open());
        }
        if buf.len() < 2 {
            return Ok(0);
        }

        let deadline = Instant::now() + self.stall_timeout;
        loop {
            if !self.buffer.is_capturing() && self.buffer.is_empty() {
                return Ok(0);
            }
            let n = self.buffer.read_into(buf, READ_SLICE);
            if n > 0 {
                return Ok(n);
            }
            if Instant::now() >= deadline {
                return Err(AudioDeviceError::CaptureStalled(self.stall_timeout.as_millis()).into());
            }
        }
    }

    fn stop(&mut self) -> Result<(), BridgeError> {
        if !self.open {
            return Ok(());
        }
        self.audio.stop_input()?;
        let dropped = self.buffer.dropped();
        if dropped > 0 {
            tracing::warn!(dropped, "Capture overflowed, samples were discarded");
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), BridgeError> {
        if self.open {
            self.audio.close_input();
            self.buffer.set_capturing(false);
            self.buffer.clear();
            self.open = false;
        }
        Ok(())
    }
}

fn not_open() -> BridgeError {
    BridgeError::Source(AudioDeviceError::NotOpen.to_string())
}
