//! cloudsweep
//!
//! Concurrent discovery of every resource in a cloud account, assembled into
//! one deduplicated inventory that can be exported, registered or imported.

pub mod aws;
pub mod azure;
pub mod catalog;
pub mod config;
pub mod discovery;
pub mod emit;
pub mod error;
pub mod gcp;
pub mod kubernetes;
pub mod mapper;
pub mod model;
pub mod provider;

pub use discovery::{discover, DiscoveryOutcome, EngineConfig, RunMode};
pub use error::DiscoveryError;
pub use model::{CanonicalRecord, Inventory, TypeDescriptor};
pub use provider::{Lister, Page, Provider};
