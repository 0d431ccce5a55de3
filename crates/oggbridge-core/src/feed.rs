//! The feed protocol: callbacks the codec engine drives during a single drive call.
//!
//! All methods are invoked synchronously on the engine thread. They take
//! `&self` so a feed can be shared (`Arc`) with the controller that issues
//! pause/seek/stop commands from another thread; implementations keep their
//! mutable parts behind atomics and locks.

use std::io::{self, Read, Write};

use crate::error::BridgeError;
use crate::stream_info::StreamInfo;

/// Callbacks used by a decode drive call.
pub trait DecodeFeed: Send + Sync {
    /// Called once before any data transfer.
    fn start_reading_header(&self);

    /// Called once after the headers are parsed.
    ///
    /// Fails if the session is not reading headers or the stream format is
    /// unsupported. [`BridgeError::SessionStopped`] means a stop won the race
    /// and the engine should wind down quietly.
    fn start(&self, info: &StreamInfo) -> Result<(), BridgeError>;

    /// Pull encoded input. Returns 0 at end of input or once stopped.
    fn read_input(&self, buf: &mut [u8]) -> usize;

    /// Push decoded interleaved PCM. Returns `false` to end the drive loop.
    fn write_output(&self, pcm: &[i16]) -> bool;

    fn report_elapsed_seconds(&self, seconds: u64);

    /// Current seek request in seconds, `-1` when none. Edge-triggered: the
    /// engine acts only when the value differs from the previous poll.
    fn query_seek_target(&self) -> i64;

    /// Terminal hook. Idempotent; called on every exit path.
    fn stop(&self);
}

/// Callbacks used by an encode drive call.
pub trait EncodeFeed: Send + Sync {
    /// Open the capture source and output. A no-op while already recording.
    fn start(&self) -> Result<(), BridgeError>;

    /// Pull interleaved little-endian PCM. Returns 0 on stop or end of input.
    fn read_input(&self, buf: &mut [u8]) -> usize;

    /// Push encoded bytes. Returns 0 when the output refuses them.
    fn write_output(&self, data: &[u8]) -> usize;

    /// Ask for a graceful stop; the engine flushes before returning.
    fn stop_encoding(&self);

    /// Hard stop. Idempotent; called on every exit path.
    fn stop(&self);
}

/// [`Read`] view over a decode feed's input side.
pub struct FeedReader<'a> {
    feed: &'a dyn DecodeFeed,
}

impl<'a> FeedReader<'a> {
    pub fn new(feed: &'a dyn DecodeFeed) -> Self {
        Self { feed }
    }
}

impl Read for FeedReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        Ok(self.feed.read_input(buf))
    }
}

/// [`Write`] view over an encode feed's output side.
///
/// A refused write surfaces as [`io::ErrorKind::BrokenPipe`] and is remembered
/// so the engine can report it after the encoder returns.
pub struct FeedWriter<'a> {
    feed: &'a dyn EncodeFeed,
    refused: bool,
}

impl<'a> FeedWriter<'a> {
    pub fn new(feed: &'a dyn EncodeFeed) -> Self {
        Self {
            feed,
            refused: false,
        }
    }

    pub const fn refused(&self) -> bool {
        self.refused
    }
}

impl Write for FeedWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.refused {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "output closed"));
        }
        match self.feed.write_output(buf) {
            0 => {
                self.refused = true;
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "output refused encoded data"))
            }
            accepted => Ok(accepted.min(buf.len())),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
