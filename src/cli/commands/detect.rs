//! detect command - Report the MIME type of a local file

use std::path::Path;

use anyhow::{Context as _, Result};
use serde_json::json;

use super::Context;
use crate::connection::detectors_from_config;

/// Run the configured detector chain over `file`.
pub fn detect(ctx: &Context, file: &Path) -> Result<()> {
    let config = ctx.load_config()?;
    let detectors = detectors_from_config(&config);
    let mime = detectors
        .detect_file(file)
        .with_context(|| format!("Failed to inspect '{}'", file.display()))?;

    if ctx.json {
        crate::ui::output::json(&json!({
            "file": file.display().to_string(),
            "mime_type": mime,
        }))?;
    } else {
        println!("{}", mime.as_deref().unwrap_or("unknown"));
    }
    Ok(())
}
