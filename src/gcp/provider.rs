//! GCP provider
//!
//! Types come from the embedded registry. Every worker gets its own
//! [`GcpClient`]; credentials are shared so the token is fetched once.

use super::auth::GcpCredentials;
use super::client::GcpClient;
use crate::catalog::registry::{get_resource, ResourceDef};
use crate::error::DiscoveryError;
use crate::mapper::gcp_type_token;
use crate::model::TypeDescriptor;
use crate::provider::{ListedItem, Lister, Page, Provider};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

pub const DEFAULT_WORKERS: usize = 3;

fn definition(descriptor: &TypeDescriptor) -> Result<&'static ResourceDef> {
    get_resource(&descriptor.listing_key)
        .with_context(|| format!("Unknown resource: {}", descriptor.listing_key))
}

pub struct GcpProvider {
    credentials: GcpCredentials,
    project_id: String,
    endpoint: Option<String>,
}

impl GcpProvider {
    pub fn new(credentials: GcpCredentials, project_id: &str) -> Self {
        Self {
            credentials,
            project_id: project_id.to_string(),
            endpoint: None,
        }
    }

    /// Send every request to `endpoint` instead of the per-service hosts
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}

impl Provider for GcpProvider {
    fn name(&self) -> &str {
        "gcp"
    }

    fn default_workers(&self) -> usize {
        DEFAULT_WORKERS
    }

    fn type_token(&self, descriptor: &TypeDescriptor) -> Result<String, DiscoveryError> {
        gcp_type_token(descriptor)
    }

    fn identify(&self, descriptor: &TypeDescriptor, type_token: &str, item: &Value) -> Result<ListedItem> {
        let def = definition(descriptor)?;
        let identity = item
            .get(&def.id_field)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .with_context(|| format!("{} item without '{}'", type_token, def.id_field))?;

        Ok(ListedItem {
            identity: identity.to_string(),
            parent: None,
        })
    }

    fn new_lister(&self) -> Result<Box<dyn Lister>> {
        let client = GcpClient::new(
            self.credentials.clone(),
            &self.project_id,
            self.endpoint.as_deref(),
        )?;
        Ok(Box::new(GcpLister { client }))
    }
}

pub struct GcpLister {
    client: GcpClient,
}

#[async_trait]
impl Lister for GcpLister {
    async fn list_page(&mut self, descriptor: &TypeDescriptor, cursor: Option<&str>) -> Result<Page> {
        let def = definition(descriptor)?;
        self.client.list_page(def, cursor).await
    }
}
