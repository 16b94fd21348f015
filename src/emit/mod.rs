//! Inventory emitters
//!
//! Consumers of discovered records:
//!
//! - [`file`] - Serializes the final inventory (export mode)
//! - [`register`] - Streams "register as externally managed" calls
//! - [`import`] - Runs the external import tool per record or in bulk

pub mod file;
pub mod import;
pub mod register;

pub use file::{write_inventory, OutputFormat};
pub use import::{run_bulk_import, CommandImporter};
pub use register::StreamRegistrar;

use async_trait::async_trait;

/// Opaque reference to a registered record
pub type LiveHandle = String;

/// Live-register mode collaborator
#[async_trait]
pub trait Registrar: Send {
    /// Register one record; `parent` is the handle of its registered parent
    async fn register(
        &mut self,
        type_token: &str,
        name: &str,
        identity: &str,
        parent: Option<&LiveHandle>,
    ) -> anyhow::Result<LiveHandle>;
}

/// Incremental-import mode collaborator
#[async_trait]
pub trait Importer: Send {
    async fn import(&mut self, type_token: &str, name: &str, identity: &str) -> anyhow::Result<()>;
}
