//! The `oggbridge` command-line tool.
//!
//! `main.rs` is the composition root: it loads settings, builds a
//! [`CliContext`] and dispatches each [`Commands`] variant to a handler.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used only by the binary
use anyhow as _;
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

// Re-export primary types for convenient access
pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::{Commands, EncodeArgs};
pub use error::CliError;
pub use parser::Cli;
