//! API discovery catalog
//!
//! One descriptor per listable resource at its group's preferred version.
//! Subresources and resources without the `list` verb are left out.

use crate::catalog::TypeCatalog;
use crate::model::TypeDescriptor;
use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::discovery::{verbs, ApiCapabilities, ApiResource, Discovery};

pub struct KubeDiscoveryCatalog {
    client: kube::Client,
}

impl KubeDiscoveryCatalog {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TypeCatalog for KubeDiscoveryCatalog {
    async fn descriptors(&self) -> Result<Vec<TypeDescriptor>> {
        let discovery = Discovery::new(self.client.clone())
            .run()
            .await
            .context("Kubernetes API discovery failed")?;

        let mut descriptors = Vec::new();
        for group in discovery.groups() {
            for (resource, caps) in group.recommended_resources() {
                if let Some(descriptor) = resource_descriptor(&resource, &caps) {
                    descriptors.push(descriptor);
                }
            }
        }

        tracing::info!("Catalog lists {} resource types", descriptors.len());
        Ok(descriptors)
    }
}

/// `core/<version>` for the legacy group, `<group>/<version>` otherwise
pub fn group_version(group: &str, version: &str) -> String {
    if group.is_empty() {
        format!("core/{}", version)
    } else {
        format!("{}/{}", group, version)
    }
}

/// Descriptor keyed by `<apiVersion>/<plural>`, listed by plural name
pub fn resource_descriptor(resource: &ApiResource, caps: &ApiCapabilities) -> Option<TypeDescriptor> {
    if !caps.supports_operation(verbs::LIST) {
        return None;
    }
    let key = format!("{}/{}", resource.api_version, resource.plural);
    Some(TypeDescriptor::new(
        &key,
        &group_version(&resource.group, &resource.version),
        &resource.kind,
        &resource.plural,
    ))
}

/// Rebuild the API resource a descriptor was made from
pub fn api_resource(descriptor: &TypeDescriptor) -> Result<ApiResource> {
    let (group, version) = descriptor
        .namespace
        .split_once('/')
        .with_context(|| format!("'{}' is not <group>/<version>", descriptor.namespace))?;
    let group = if group == "core" { "" } else { group };
    let api_version = if group.is_empty() {
        version.to_string()
    } else {
        format!("{}/{}", group, version)
    };

    Ok(ApiResource {
        group: group.to_string(),
        version: version.to_string(),
        api_version,
        kind: descriptor.kind.clone(),
        plural: descriptor.listing_key.clone(),
    })
}
