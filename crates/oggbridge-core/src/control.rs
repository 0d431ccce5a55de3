//! Shared control block written by the command thread and read by feed callbacks.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use crate::state::{AtomicState, PlaybackState, RecordingState};
use crate::stream_info::PcmFormat;

/// Seek value meaning "no seek pending".
pub const NO_SEEK: i64 = -1;

/// Playback flags: state, pause gate, seek request.
///
/// `wait_for_resume` is the only place a feed callback blocks. It re-checks
/// its condition at least every `poll_interval`, so a missed wakeup costs at
/// most one interval.
#[derive(Debug)]
pub struct PlaybackControl {
    state: AtomicState<PlaybackState>,
    paused: Mutex<bool>,
    resumed: Condvar,
    seek_target: AtomicI64,
    stop_requested: AtomicBool,
    poll_interval: Duration,
}

impl PlaybackControl {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            state: AtomicState::new(),
            paused: Mutex::new(false),
            resumed: Condvar::new(),
            seek_target: AtomicI64::new(NO_SEEK),
            stop_requested: AtomicBool::new(false),
            poll_interval,
        }
    }

    pub const fn state_cell(&self) -> &AtomicState<PlaybackState> {
        &self.state
    }

    pub fn state(&self) -> PlaybackState {
        self.state.get()
    }

    pub fn pause(&self) {
        *self.paused.lock().unwrap_or_else(PoisonError::into_inner) = true;
        tracing::debug!(state = ?self.state(), "Playback paused");
    }

    /// Clear the pause flag and wake any callback blocked in [`Self::wait_for_resume`].
    pub fn resume(&self) {
        *self.paused.lock().unwrap_or_else(PoisonError::into_inner) = false;
        self.resumed.notify_all();
        tracing::debug!("Playback resumed");
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wake waiters without touching the pause flag (used after a state change).
    pub fn wake(&self) {
        let _guard = self.paused.lock().unwrap_or_else(PoisonError::into_inner);
        self.resumed.notify_all();
    }

    /// Block while paused and playing. Returns immediately otherwise.
    pub fn wait_for_resume(&self) {
        let mut paused = self.paused.lock().unwrap_or_else(PoisonError::into_inner);
        while *paused && self.state.get() == PlaybackState::Playing {
            paused = self
                .resumed
                .wait_timeout(paused, self.poll_interval)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Record a seek request; `-1` clears it.
    pub fn request_seek(&self, seconds: i64) {
        self.seek_target.store(seconds, Ordering::Release);
        tracing::debug!(seconds, "Seek requested");
    }

    pub fn seek_target(&self) -> i64 {
        self.seek_target.load(Ordering::Acquire)
    }

    pub fn mark_stop_requested(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Whether the current session was stopped by the application, as
    /// opposed to ending on its own.
    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Prepare for a new session. Pause and seek values are left untouched.
    pub fn begin_session(&self) -> bool {
        if !self.state.rearm() {
            return false;
        }
        self.stop_requested.store(false, Ordering::Release);
        true
    }
}

impl Default for PlaybackControl {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

/// Recording flags: state plus the format requested for the current session.
#[derive(Debug, Default)]
pub struct RecordingControl {
    state: AtomicState<RecordingState>,
    format: Mutex<Option<PcmFormat>>,
}

impl RecordingControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn state_cell(&self) -> &AtomicState<RecordingState> {
        &self.state
    }

    pub fn state(&self) -> RecordingState {
        self.state.get()
    }

    pub fn set_format(&self, format: PcmFormat) {
        *self.format.lock().unwrap_or_else(PoisonError::into_inner) = Some(format);
    }

    pub fn format(&self) -> Option<PcmFormat> {
        *self.format.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
