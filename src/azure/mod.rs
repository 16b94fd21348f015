//! Azure adapter
//!
//! - [`auth`] - Static token or default credential chain
//! - [`client`] - Azure Resource Manager REST client
//! - [`catalog`] - Resource types registered in the subscription
//! - [`provider`] - The [`Provider`](crate::provider::Provider) implementation

pub mod auth;
pub mod catalog;
pub mod client;
pub mod provider;

pub use auth::ArmCredentials;
pub use catalog::ArmProviderCatalog;
pub use client::ArmClient;
pub use provider::{AzureLister, AzureProvider};
