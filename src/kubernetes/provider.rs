//! Kubernetes provider
//!
//! Identities are `<namespace>/<name>` for namespaced objects and `<name>`
//! for cluster-scoped ones. Every resource type is listed across all
//! namespaces.

use super::catalog::api_resource;
use crate::error::DiscoveryError;
use crate::mapper::kube_type_token;
use crate::model::{sanitize_display_name, TypeDescriptor};
use crate::provider::{ListedItem, Lister, Page, Provider};
use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::api::{Api, DynamicObject, ListParams};
use serde_json::Value;

pub const DEFAULT_WORKERS: usize = 10;

/// Objects requested per list call
pub const PAGE_SIZE: u32 = 500;

/// `ns/name`, or `name` when the object is cluster-scoped
pub fn object_identity(item: &Value) -> Option<String> {
    let metadata = item.get("metadata")?;
    let name = metadata
        .get("name")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())?;
    match metadata
        .get("namespace")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
    {
        Some(namespace) => Some(format!("{}/{}", namespace, name)),
        None => Some(name.to_string()),
    }
}

#[derive(Clone)]
pub struct KubeProvider {
    config: kube::Config,
}

impl KubeProvider {
    pub fn new(config: kube::Config) -> Self {
        Self { config }
    }

    /// A client with its own connection pool
    pub fn client(&self) -> Result<kube::Client> {
        kube::Client::try_from(self.config.clone()).context("Failed to create Kubernetes client")
    }
}

impl Provider for KubeProvider {
    fn name(&self) -> &str {
        "kubernetes"
    }

    fn default_workers(&self) -> usize {
        DEFAULT_WORKERS
    }

    fn type_token(&self, descriptor: &TypeDescriptor) -> Result<String, DiscoveryError> {
        kube_type_token(descriptor)
    }

    fn identify(&self, _descriptor: &TypeDescriptor, type_token: &str, item: &Value) -> Result<ListedItem> {
        let identity = object_identity(item)
            .with_context(|| format!("{} object without metadata.name", type_token))?;
        Ok(ListedItem {
            identity,
            parent: None,
        })
    }

    /// Namespace and name together, so equal names in two namespaces differ
    fn display_name(&self, _type_token: &str, identity: &str) -> String {
        sanitize_display_name(identity)
    }

    fn new_lister(&self) -> Result<Box<dyn Lister>> {
        Ok(Box::new(KubeLister {
            client: self.client()?,
        }))
    }
}

pub struct KubeLister {
    client: kube::Client,
}

#[async_trait]
impl Lister for KubeLister {
    async fn list_page(&mut self, descriptor: &TypeDescriptor, cursor: Option<&str>) -> Result<Page> {
        let resource = api_resource(descriptor)?;
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &resource);

        let mut params = ListParams::default().limit(PAGE_SIZE);
        if let Some(token) = cursor {
            params = params.continue_token(token);
        }

        let list = api
            .list(&params)
            .await
            .with_context(|| format!("Failed to list {}", resource.plural))?;

        let next = list.metadata.continue_.clone().filter(|c| !c.is_empty());
        let items = list
            .items
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to encode listed object")?;

        Ok(Page { items, next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_identity() {
        assert_eq!(
            object_identity(&json!({"metadata": {"name": "web", "namespace": "default"}})).as_deref(),
            Some("default/web")
        );
        assert_eq!(
            object_identity(&json!({"metadata": {"name": "kube-system"}})).as_deref(),
            Some("kube-system")
        );
        assert_eq!(object_identity(&json!({"metadata": {"namespace": "default"}})), None);
        assert_eq!(object_identity(&json!({"kind": "Pod"})), None);
    }

    #[test]
    fn test_identify_and_display_name() {
        let provider = KubeProvider::new(kube::Config::new("http://127.0.0.1:6443".parse().unwrap()));
        let pods = TypeDescriptor::new("v1/pods", "core/v1", "Pod", "pods");
        let token = provider.type_token(&pods).unwrap();
        assert_eq!(token, "kubernetes:core/v1:Pod");

        let listed = provider
            .identify(&pods, &token, &json!({"metadata": {"name": "web-1", "namespace": "shop"}}))
            .unwrap();
        assert_eq!(listed.identity, "shop/web-1");
        assert_eq!(provider.display_name(&token, &listed.identity), "shopweb1");
        assert!(provider.identify(&pods, &token, &json!({})).is_err());
    }
}
