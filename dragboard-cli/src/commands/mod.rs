//! Command implementations

pub mod check;
pub mod replay;

use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use dragboard::Container;
use serde::Serialize;
use std::path::Path;

/// Read a board file in the `fetchBoard` shape
pub fn read_board(path: &Path) -> Result<Vec<Container>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read board file {}", path.display()))?;
    dragboard::parse_board(&text)
        .with_context(|| format!("failed to parse board file {}", path.display()))
}

/// Render `value` in the requested format
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml_ng::to_string(value)?,
    })
}
