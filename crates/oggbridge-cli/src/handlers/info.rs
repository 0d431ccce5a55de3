//! Info command handler.

use std::path::Path;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::print_stream_info;

/// Read a file's headers and duration without playing it.
pub fn execute(ctx: &CliContext, file: &Path, json: bool) -> Result<(), CliError> {
    let info = ctx.engine.read_file_metadata(file)?;

    if json {
        let text = serde_json::to_string_pretty(&info).map_err(|e| CliError::Io(e.to_string()))?;
        println!("{text}");
    } else {
        println!("File:        {}", file.display());
        print_stream_info(&info);
    }
    Ok(())
}
