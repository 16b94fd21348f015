//! Resource Registry - Load GCP resource definitions from JSON
//!
//! Definitions are embedded at compile time, so new resource types are added
//! by editing `src/resources/*.json` rather than code.

use crate::model::TypeDescriptor;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[
    include_str!("../resources/compute.json"),
    include_str!("../resources/storage.json"),
    include_str!("../resources/gke.json"),
    include_str!("../resources/iam.json"),
    include_str!("../resources/pubsub.json"),
];

fn default_id_field() -> String {
    "selfLink".to_string()
}

/// Resource definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDef {
    pub display_name: String,
    pub service: String,
    pub version: String,
    /// REST collection name, e.g. `instances`
    pub collection: String,
    pub host: String,
    /// Path template; `{project}` is substituted at request time
    pub path: String,
    /// Dot-separated path to the item array in the response
    pub response_path: String,
    /// Response is keyed by zone or region and must be flattened
    #[serde(default)]
    pub aggregated: bool,
    /// Field holding the unique identifier of an item
    #[serde(default = "default_id_field")]
    pub id_field: String,
}

impl ResourceDef {
    pub fn namespace(&self) -> String {
        format!("{}/{}", self.service, self.version)
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub resources: HashMap<String, ResourceDef>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<ResourceConfig> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static ResourceConfig {
    REGISTRY.get_or_init(|| {
        let mut final_config = ResourceConfig {
            resources: HashMap::new(),
        };

        for content in RESOURCE_FILES {
            // Embedded at compile time; a parse failure is a build defect
            let partial: ResourceConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded resource JSON: {}", e));
            final_config.resources.extend(partial.resources);
        }

        final_config
    })
}

/// Get a resource definition by key
pub fn get_resource(key: &str) -> Option<&'static ResourceDef> {
    get_registry().resources.get(key)
}

/// Get all resource keys
pub fn get_all_resource_keys() -> Vec<&'static str> {
    get_registry()
        .resources
        .keys()
        .map(|s| s.as_str())
        .collect()
}

/// Type descriptors for every registered resource
///
/// The listing key is the registry key; the lister looks the definition up
/// again when it builds a request.
pub fn descriptors() -> Vec<TypeDescriptor> {
    get_registry()
        .resources
        .iter()
        .map(|(key, def)| TypeDescriptor::new(key, &def.namespace(), &def.collection, key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_loads_successfully() {
        let registry = get_registry();
        assert!(
            !registry.resources.is_empty(),
            "Registry should have resources"
        );
    }

    #[test]
    fn test_compute_instances_resource_exists() {
        let resource = get_resource("compute-instances");
        assert!(
            resource.is_some(),
            "Compute instances resource should exist"
        );

        let resource = resource.unwrap();
        assert_eq!(resource.display_name, "VM Instances");
        assert_eq!(resource.service, "compute");
        assert!(resource.aggregated);
        assert_eq!(resource.id_field, "selfLink");
    }

    #[test]
    fn test_every_path_is_project_scoped() {
        for key in get_all_resource_keys() {
            let def = get_resource(key).unwrap();
            assert!(def.path.contains("{project}"), "{} path lacks project", key);
            assert!(def.path.starts_with('/'), "{} path must be host-relative", key);
        }
    }

    #[test]
    fn test_descriptors_cover_registry() {
        let descriptors = descriptors();
        assert_eq!(descriptors.len(), get_all_resource_keys().len());

        let instances = descriptors
            .iter()
            .find(|d| d.key == "compute-instances")
            .unwrap();
        assert_eq!(instances.namespace, "compute/v1");
        assert_eq!(instances.kind, "instances");
        assert_eq!(instances.listing_key, "compute-instances");
    }

    #[test]
    fn test_every_descriptor_maps_to_a_token() {
        for descriptor in descriptors() {
            assert!(
                crate::mapper::gcp_type_token(&descriptor).is_ok(),
                "{} should map",
                descriptor.key
            );
        }
    }
}
