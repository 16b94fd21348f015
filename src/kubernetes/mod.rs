//! Kubernetes adapter
//!
//! - [`catalog`] - Listable resources from API discovery
//! - [`provider`] - The [`Provider`](crate::provider::Provider) implementation

pub mod catalog;
pub mod provider;

pub use catalog::KubeDiscoveryCatalog;
pub use provider::{KubeLister, KubeProvider};
