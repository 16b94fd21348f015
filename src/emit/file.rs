//! Inventory file output

use crate::model::Inventory;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default inventory file name
pub const DEFAULT_OUTPUT: &str = "import.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    /// Guess the format from a file extension, defaulting to JSON
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => OutputFormat::Yaml,
            _ => OutputFormat::Json,
        }
    }
}

/// Serialize an inventory
pub fn render_inventory(inventory: &Inventory, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(inventory).context("Failed to serialize inventory")
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(inventory).context("Failed to serialize inventory")
        }
    }
}

/// Validate and write the inventory to `path`
pub fn write_inventory(path: &Path, inventory: &Inventory, format: OutputFormat) -> Result<()> {
    inventory
        .validate()
        .context("Refusing to write an invalid inventory")?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let content = render_inventory(inventory, format)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!("Wrote {} resources to {}", inventory.len(), path.display());
    Ok(())
}
