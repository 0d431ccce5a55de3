//! CLI bootstrap - the composition root.
//!
//! Loads settings and initialises the codec engine once. Handlers receive
//! the resulting [`CliContext`] and open audio devices themselves, since
//! only some commands need them.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use oggbridge_core::{CodecEngine, Settings, validate_settings};
use oggbridge_vorbis::VorbisEngine;

use crate::error::CliError;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Optional JSON settings file.
    pub settings_path: Option<PathBuf>,
}

/// Fully composed context for CLI commands.
pub struct CliContext {
    pub engine: Arc<dyn CodecEngine>,
    pub settings: Settings,
}

impl CliContext {
    pub fn engine(&self) -> Arc<dyn CodecEngine> {
        Arc::clone(&self.engine)
    }

    pub const fn settings(&self) -> &Settings {
        &self.settings
    }
}

/// Read a settings file. Missing fields keep their defaults.
pub fn load_settings(path: &Path) -> Result<Settings, CliError> {
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::Config(format!("cannot read {}: {e}", path.display())))?;
    let settings: Settings = serde_json::from_str(&text)
        .map_err(|e| CliError::Config(format!("invalid settings in {}: {e}", path.display())))?;
    validate_settings(&settings)?;
    Ok(settings)
}

/// Bootstrap the CLI application.
pub fn bootstrap(config: CliConfig) -> Result<CliContext, CliError> {
    let settings = match &config.settings_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading settings");
            load_settings(path)?
        }
        None => Settings::with_defaults(),
    };

    let engine: Arc<dyn CodecEngine> = VorbisEngine::shared();
    Ok(CliContext { engine, settings })
}
