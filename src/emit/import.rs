//! External import invocation
//!
//! Runs the declarative-management CLI (`pulumi` by default) either once per
//! record or once over a whole inventory file. Output is passed through to
//! the terminal.

use super::Importer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

pub const DEFAULT_IMPORT_PROGRAM: &str = "pulumi";

/// Arguments for importing a single resource
pub fn incremental_args(type_token: &str, name: &str, identity: &str) -> Vec<String> {
    vec![
        "import".to_string(),
        "--yes".to_string(),
        "--skip-preview".to_string(),
        type_token.to_string(),
        name.to_string(),
        identity.to_string(),
    ]
}

/// Arguments for importing a whole inventory file
pub fn bulk_args(path: &Path) -> Vec<String> {
    vec![
        "import".to_string(),
        "-p".to_string(),
        "1".to_string(),
        "-f".to_string(),
        path.display().to_string(),
        "--yes".to_string(),
    ]
}

async fn execute(program: &str, args: &[String]) -> Result<()> {
    tracing::info!("Executing: {} {}", program, args.join(" "));

    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .with_context(|| format!("Failed to launch {}", program))?;

    if !status.success() {
        match status.code() {
            Some(code) => anyhow::bail!("{} exited with code {}", program, code),
            None => anyhow::bail!("{} was interrupted", program),
        }
    }
    Ok(())
}

/// Imports each record as it is discovered
#[derive(Debug, Clone)]
pub struct CommandImporter {
    program: String,
}

impl CommandImporter {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

impl Default for CommandImporter {
    fn default() -> Self {
        Self::new(DEFAULT_IMPORT_PROGRAM)
    }
}

#[async_trait]
impl Importer for CommandImporter {
    async fn import(&mut self, type_token: &str, name: &str, identity: &str) -> Result<()> {
        execute(&self.program, &incremental_args(type_token, name, identity)).await
    }
}

/// Import a previously written inventory file in one go
pub async fn run_bulk_import(program: &str, path: &Path) -> Result<()> {
    execute(program, &bulk_args(path)).await
}
