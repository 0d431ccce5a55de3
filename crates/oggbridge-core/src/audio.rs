//! `AudioSink` and `AudioSource` ports plus byte-stream adapters.
//!
//! These traits decouple the feeds from any particular audio backend:
//!
//! | Implementor | Where used |
//! |---|---|
//! | [`WriterSink`] / [`ReaderSource`] | Files, pipes and in-memory buffers (offline decode/encode, tests) |
//! | `DeviceSink` / `DeviceSource` (oggbridge-audio) | Local playback via rodio, capture via cpal |
//!
//! Both carry interleaved little-endian signed 16-bit PCM. The owning feed
//! serialises access; only the engine thread reads or writes, and open/close
//! happen under the feed's lock.

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::BridgeError;
use crate::stream_info::PcmFormat;

/// Byte-oriented PCM output endpoint.
pub trait AudioSink: Send {
    /// Prepare for the given format. Output is not audible until [`start`](AudioSink::start).
    fn open(&mut self, format: PcmFormat) -> Result<(), BridgeError>;

    fn start(&mut self) -> Result<(), BridgeError>;

    /// Queue PCM bytes. Returns the number of bytes accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize, BridgeError>;

    /// Block until queued audio has been played out.
    fn drain(&mut self) -> Result<(), BridgeError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BridgeError>;

    fn close(&mut self) -> Result<(), BridgeError>;
}

/// Byte-oriented PCM input endpoint.
pub trait AudioSource: Send {
    fn open(&mut self, format: PcmFormat) -> Result<(), BridgeError>;

    fn start(&mut self) -> Result<(), BridgeError>;

    /// Read PCM bytes. Returns 0 at end of input.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, BridgeError>;

    fn stop(&mut self) -> Result<(), BridgeError>;

    fn close(&mut self) -> Result<(), BridgeError>;
}

// ── Writer-backed sink ─────────────────────────────────────────────

/// Sink that writes raw PCM to any [`Write`].
pub struct WriterSink<W> {
    writer: W,
    format: Option<PcmFormat>,
}

impl<W: Write + Send> WriterSink<W> {
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            format: None,
        }
    }

    pub const fn format(&self) -> Option<PcmFormat> {
        self.format
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> AudioSink for WriterSink<W> {
    fn open(&mut self, format: PcmFormat) -> Result<(), BridgeError> {
        self.format = Some(format);
        Ok(())
    }

    fn start(&mut self) -> Result<(), BridgeError> {
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, BridgeError> {
        self.writer
            .write_all(data)
            .map_err(|e| BridgeError::Sink(e.to_string()))?;
        Ok(data.len())
    }

    fn stop(&mut self) -> Result<(), BridgeError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), BridgeError> {
        self.writer
            .flush()
            .map_err(|e| BridgeError::Sink(e.to_string()))
    }
}

// ── Reader-backed source ───────────────────────────────────────────

/// Source that reads raw PCM from any [`Read`]; end of input ends the recording.
pub struct ReaderSource<R> {
    reader: R,
}

impl<R: Read + Send> ReaderSource<R> {
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read + Send> AudioSource for ReaderSource<R> {
    fn open(&mut self, _format: PcmFormat) -> Result<(), BridgeError> {
        Ok(())
    }

    fn start(&mut self) -> Result<(), BridgeError> {
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, BridgeError> {
        loop {
            match self.reader.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(BridgeError::Source(e.to_string())),
            }
        }
    }

    fn stop(&mut self) -> Result<(), BridgeError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), BridgeError> {
        Ok(())
    }
}

// ── Shared in-memory buffer ────────────────────────────────────────

/// Cloneable in-memory byte buffer implementing [`Write`].
///
/// Clones share storage, so a caller can hand one clone to a sink or
/// recorder and inspect the bytes through another.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contents(&self) -> Vec<u8> {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
