//! Type catalogs
//!
//! A catalog answers one question: which resource kinds exist? It is read
//! once at the start of a run.
//!
//! - [`registry`] - Embedded GCP resource definitions
//! - [`schema`] - Provider package schema (known tokens and namespace aliases)
//!
//! The Azure catalog queries the subscription's resource providers and lives
//! with the rest of the Azure adapter.

pub mod registry;
pub mod schema;

pub use schema::{PackageSchema, SchemaCache};

use crate::model::TypeDescriptor;
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait TypeCatalog: Send + Sync {
    async fn descriptors(&self) -> Result<Vec<TypeDescriptor>>;
}

/// The embedded GCP registry as a catalog
#[derive(Debug, Clone, Copy, Default)]
pub struct GcpRegistryCatalog;

#[async_trait]
impl TypeCatalog for GcpRegistryCatalog {
    async fn descriptors(&self) -> Result<Vec<TypeDescriptor>> {
        Ok(registry::descriptors())
    }
}
