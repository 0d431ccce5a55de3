//! Audio device adapters for oggbridge.
//!
//! [`DeviceSink`] plays decoder output through `rodio`; [`DeviceSource`]
//! captures recorder input through `cpal`. Both implement the byte-level
//! ports from `oggbridge-core` and talk to the hardware through one
//! [`AudioThreadHandle`], which keeps the `!Send` device handles on a
//! dedicated thread.
//!
//! ```no_run
//! use oggbridge_audio::{AudioThreadHandle, DeviceSink, DeviceSource};
//!
//! let audio = AudioThreadHandle::shared()?;
//! let sink = DeviceSink::new(audio.clone());
//! let source = DeviceSource::new(audio);
//! # Ok::<(), oggbridge_audio::AudioDeviceError>(())
//! ```
#![deny(unused_crate_dependencies)]

pub mod audio_thread;
pub mod capture;
pub mod error;
pub mod playback;
pub mod source;

pub use audio_thread::AudioThreadHandle;
pub use capture::CaptureBuffer;
pub use error::AudioDeviceError;
pub use playback::DeviceSink;
pub use source::DeviceSource;
