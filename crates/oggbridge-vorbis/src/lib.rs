//! libvorbis-backed codec engine for the oggbridge feed protocol.
//!
//! [`VorbisEngine`] runs each decode or encode as one blocking drive call
//! over a feed. Headers are read page by page with the `ogg` crate so
//! that failures map onto [`DecodeResultCode`](oggbridge_core::DecodeResultCode)
//! values; audio packets are handled by `vorbis_rs`.
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tokio as _;

pub mod container;
pub mod decode;
pub mod encode;
pub mod engine;
pub mod error;
pub mod header;

pub use engine::VorbisEngine;
pub use error::EngineError;
pub use header::{HeaderError, VorbisHeaders};
