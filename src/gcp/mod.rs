//! GCP adapter
//!
//! - [`auth`] - Credentials (ADC or a pre-issued token)
//! - [`client`] - Per-worker client building paged list requests
//! - [`http`] - HTTP utilities for REST API calls
//! - [`provider`] - The [`Provider`](crate::provider::Provider) implementation

pub mod auth;
pub mod client;
pub mod http;
pub mod provider;

pub use auth::GcpCredentials;
pub use provider::{GcpLister, GcpProvider};
