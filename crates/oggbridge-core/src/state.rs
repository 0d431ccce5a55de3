//! Session state machines shared between the command thread and the engine thread.
//!
//! ```text
//!   Playback:  Stopped → ReadingHeader → Buffering → Playing → Stopped
//!                                   └──────────────┘
//!   Recording: Stopped → Recording → Stopping → Stopped
//! ```
//!
//! The state lives in a single atomic byte. The high bit is a terminal latch:
//! it is set by the first `stop()` of a session so that exactly one terminal
//! notification is produced, and it blocks a late engine callback from moving
//! a stopped session forward again. The controller re-arms it before each
//! new session.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

const TERMINAL: u8 = 0x80;

/// A state enum that can be stored in an [`AtomicState`].
pub trait SessionState: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    const STOPPED: Self;

    fn to_raw(self) -> u8;

    fn from_raw(raw: u8) -> Self;

    fn name(self) -> &'static str;
}

/// Current state of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    Stopped,
    ReadingHeader,
    /// Output accumulates in the sink, which has not been started yet.
    Buffering,
    Playing,
}

impl SessionState for PlaybackState {
    const STOPPED: Self = Self::Stopped;

    fn to_raw(self) -> u8 {
        match self {
            Self::Stopped => 0,
            Self::ReadingHeader => 1,
            Self::Buffering => 2,
            Self::Playing => 3,
        }
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::ReadingHeader,
            2 => Self::Buffering,
            3 => Self::Playing,
            _ => Self::Stopped,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::ReadingHeader => "reading-header",
            Self::Buffering => "buffering",
            Self::Playing => "playing",
        }
    }
}

/// Current state of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordingState {
    Stopped,
    Recording,
    /// Graceful stop requested; the engine is flushing its last frames.
    Stopping,
}

impl SessionState for RecordingState {
    const STOPPED: Self = Self::Stopped;

    fn to_raw(self) -> u8 {
        match self {
            Self::Stopped => 0,
            Self::Recording => 1,
            Self::Stopping => 2,
        }
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Recording,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Recording => "recording",
            Self::Stopping => "stopping",
        }
    }
}

/// Atomic cell holding a [`SessionState`] plus the terminal latch.
pub struct AtomicState<S> {
    raw: AtomicU8,
    _state: PhantomData<S>,
}

impl<S: SessionState> AtomicState<S> {
    /// A stopped, armed state: the first `stop()` will latch.
    pub fn new() -> Self {
        Self {
            raw: AtomicU8::new(S::STOPPED.to_raw()),
            _state: PhantomData,
        }
    }

    pub fn get(&self) -> S {
        S::from_raw(self.raw.load(Ordering::Acquire) & !TERMINAL)
    }

    /// Whether the current session already produced its terminal stop.
    pub fn is_latched(&self) -> bool {
        self.raw.load(Ordering::Acquire) & TERMINAL != 0
    }

    /// Move `from → to` if the state is exactly `from` and the latch is clear.
    pub fn transition(&self, from: S, to: S) -> bool {
        let moved = self
            .raw
            .compare_exchange(from.to_raw(), to.to_raw(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if moved {
            tracing::debug!(from = from.name(), to = to.name(), "Session state changed");
        }
        moved
    }

    /// Force the state to stopped and set the latch.
    ///
    /// Returns the state observed before the call and whether this call set
    /// the latch (only one caller per session sees `true`).
    pub fn stop(&self) -> (S, bool) {
        let previous = self.raw.swap(S::STOPPED.to_raw() | TERMINAL, Ordering::AcqRel);
        let state = S::from_raw(previous & !TERMINAL);
        let latched = previous & TERMINAL == 0;
        if latched {
            tracing::debug!(from = state.name(), "Session stopped");
        }
        (state, latched)
    }

    /// Clear the latch of a stopped state so a new session can begin.
    ///
    /// Returns `false` (and changes nothing) if the state is not stopped.
    pub fn rearm(&self) -> bool {
        let stopped = S::STOPPED.to_raw();
        self.raw
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                (raw & !TERMINAL == stopped).then_some(stopped)
            })
            .is_ok()
    }
}

impl<S: SessionState> Default for AtomicState<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SessionState> fmt::Debug for AtomicState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicState")
            .field("state", &self.get())
            .field("latched", &self.is_latched())
            .finish()
    }
}
