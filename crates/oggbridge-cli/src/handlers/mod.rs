//! Command handlers.
//!
//! Handlers follow one pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<(), CliError>`
//! - Build a controller from the context's engine plus a sink or source
//! - Start it and watch its event channel until the session ends

pub mod info;
pub mod play;
pub mod record;
pub mod session;
pub mod transcode;
