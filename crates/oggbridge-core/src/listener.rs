//! Status listeners and the events emitted through them.
//!
//! Listener calls run on whichever thread produced the notification (usually
//! the engine thread) and must return quickly. The tokio channel impls make
//! the common case a non-blocking send.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::result::{DecodeResultCode, EncodeResultCode};
use crate::stream_info::StreamInfo;

/// Lifecycle notifications for a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerStatus {
    /// Header reading began.
    Started,
    /// The feed released its sink. Sent exactly once per session.
    Stopped,
    /// The drive call returned success.
    Finished,
    /// The drive call returned an error code.
    Failed(DecodeResultCode),
}

/// Lifecycle notifications for a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecorderStatus {
    /// Source and output are open; encoding has begun.
    Started,
    /// The feed closed its source and output. Sent exactly once per session.
    Stopped,
    Finished,
    Failed(EncodeResultCode),
}

impl PlayerStatus {
    /// Whether this is the drive thread's final word on the session.
    pub const fn is_outcome(self) -> bool {
        matches!(self, Self::Finished | Self::Failed(_))
    }
}

impl RecorderStatus {
    pub const fn is_outcome(self) -> bool {
        matches!(self, Self::Finished | Self::Failed(_))
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait PlayerListener: Send + Sync {
    fn on_status(&self, status: PlayerStatus);

    fn on_stream_info(&self, info: &StreamInfo);

    fn on_progress(&self, seconds: u64);
}

#[cfg_attr(test, mockall::automock)]
pub trait RecorderListener: Send + Sync {
    fn on_status(&self, status: RecorderStatus);
}

// ── Channel-backed listeners ───────────────────────────────────────

/// Events emitted by a player to the application layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    Status(PlayerStatus),
    StreamInfo(StreamInfo),
    Progress(u64),
}

/// Events emitted by a recorder to the application layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderEvent {
    Status(RecorderStatus),
}

impl PlayerListener for mpsc::UnboundedSender<PlayerEvent> {
    fn on_status(&self, status: PlayerStatus) {
        let _ = self.send(PlayerEvent::Status(status));
    }

    fn on_stream_info(&self, info: &StreamInfo) {
        let _ = self.send(PlayerEvent::StreamInfo(info.clone()));
    }

    fn on_progress(&self, seconds: u64) {
        let _ = self.send(PlayerEvent::Progress(seconds));
    }
}

impl RecorderListener for mpsc::UnboundedSender<RecorderEvent> {
    fn on_status(&self, status: RecorderStatus) {
        let _ = self.send(RecorderEvent::Status(status));
    }
}

/// Listener that drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl PlayerListener for NoopListener {
    fn on_status(&self, _status: PlayerStatus) {}

    fn on_stream_info(&self, _info: &StreamInfo) {}

    fn on_progress(&self, _seconds: u64) {}
}

impl RecorderListener for NoopListener {
    fn on_status(&self, _status: RecorderStatus) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_listener_forwards_events() {
        let (tx, mut rx) = mpsc::unbounded_channel::<PlayerEvent>();
        let info = StreamInfo::new(44_100, 2, "Xiph", 10);

        tx.on_status(PlayerStatus::Started);
        tx.on_stream_info(&info);
        tx.on_progress(3);

        assert_eq!(rx.try_recv().unwrap(), PlayerEvent::Status(PlayerStatus::Started));
        assert_eq!(rx.try_recv().unwrap(), PlayerEvent::StreamInfo(info));
        assert_eq!(rx.try_recv().unwrap(), PlayerEvent::Progress(3));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_channel_is_ignored() {
        let (tx, rx) = mpsc::unbounded_channel::<RecorderEvent>();
        drop(rx);
        tx.on_status(RecorderStatus::Stopped);
    }

    #[test]
    fn outcome_classification() {
        assert!(PlayerStatus::Finished.is_outcome());
        assert!(PlayerStatus::Failed(DecodeResultCode::PrematureEof).is_outcome());
        assert!(!PlayerStatus::Stopped.is_outcome());
        assert!(RecorderStatus::Failed(EncodeResultCode::UnknownFailure).is_outcome());
        assert!(!RecorderStatus::Started.is_outcome());
    }
}
