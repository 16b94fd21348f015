//! ARM resource provider catalog
//!
//! Every top-level resource type of every registered namespace in the
//! subscription becomes one descriptor.

use super::client::{split_list_response, ArmClient};
use crate::catalog::TypeCatalog;
use crate::model::TypeDescriptor;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub struct ArmProviderCatalog {
    client: ArmClient,
}

impl ArmProviderCatalog {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TypeCatalog for ArmProviderCatalog {
    async fn descriptors(&self) -> Result<Vec<TypeDescriptor>> {
        let mut descriptors = Vec::new();
        let mut url = self.client.subscription_url("providers")?.to_string();

        loop {
            let response = self.client.get(&url).await?;
            let (namespaces, next) = split_list_response(&response);
            for namespace in &namespaces {
                descriptors.extend(namespace_descriptors(namespace));
            }
            match next {
                Some(next) if next != url => url = next,
                _ => break,
            }
        }

        tracing::info!("Catalog lists {} resource types", descriptors.len());
        Ok(descriptors)
    }
}

/// Descriptors for one provider namespace entry
pub fn namespace_descriptors(entry: &Value) -> Vec<TypeDescriptor> {
    let Some(namespace) = entry.get("namespace").and_then(|v| v.as_str()) else {
        return vec![];
    };

    let registered = entry
        .get("registrationState")
        .and_then(|v| v.as_str())
        .map(|s| s.eq_ignore_ascii_case("Registered"))
        .unwrap_or(false);
    if !registered {
        return vec![];
    }

    entry
        .get("resourceTypes")
        .and_then(|v| v.as_array())
        .map(|types| {
            types
                .iter()
                .filter_map(|t| t.get("resourceType").and_then(|v| v.as_str()))
                // Nested types are only reachable through their parent
                .filter(|t| !t.contains('/'))
                .map(|kind| {
                    let key = format!("{}/{}", namespace, kind);
                    TypeDescriptor::new(&key, namespace, kind, &key)
                })
                .collect()
        })
        .unwrap_or_default()
}
