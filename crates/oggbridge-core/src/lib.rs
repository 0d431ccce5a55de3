//! Callback bridge between a blocking Vorbis codec engine and application code.
//!
//! The engine runs one long drive call per session on a dedicated thread and
//! calls back into a feed to pull input and push output. This crate defines
//! that feed protocol, the shared session state the callbacks observe, and
//! the playback/recording controllers built on top of it. Codec and device
//! adapters live in `oggbridge-vorbis` and `oggbridge-audio`.
#![deny(unused_crate_dependencies)]

pub mod audio;
pub mod control;
pub mod engine;
pub mod error;
pub mod feed;
pub mod listener;
pub mod pcm;
pub mod player;
pub mod recorder;
pub mod result;
pub mod settings;
pub mod state;
pub mod stream_info;

// Re-export commonly used types for convenience
pub use audio::{AudioSink, AudioSource, ReaderSource, SharedBuffer, WriterSink};
pub use engine::{CodecEngine, ElapsedClock, EncodeMode, SeekTracker};
pub use error::BridgeError;
pub use feed::{DecodeFeed, EncodeFeed, FeedReader, FeedWriter};
pub use listener::{
    NoopListener, PlayerEvent, PlayerListener, PlayerStatus, RecorderEvent, RecorderListener,
    RecorderStatus,
};
pub use player::{BufferingPolicy, PlaybackSource, Player, PlayerConfig, PlayerFeed};
pub use recorder::{RecordTarget, Recorder, RecorderFeed};
pub use result::{DecodeResultCode, EncodeResultCode};
pub use settings::{Settings, SettingsError, validate_settings};
pub use state::{PlaybackState, RecordingState};
pub use stream_info::{PcmFormat, StreamInfo};
