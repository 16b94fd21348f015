//! Azure provider
//!
//! Resource groups are the parent type: they are listed first, and every
//! other resource is linked to the group named in its ID.

use super::auth::ArmCredentials;
use super::client::{split_list_response, ArmClient};
use crate::catalog::PackageSchema;
use crate::error::DiscoveryError;
use crate::mapper::{arm_type_token, AliasTable};
use crate::model::TypeDescriptor;
use crate::provider::{ListedItem, Lister, Page, Provider};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_LOCATION: &str = "westus2";

/// Location value that disables location filtering
pub const ANY_LOCATION: &str = "*";

pub const RESOURCE_GROUP_KEY: &str = "Microsoft.Resources/resourceGroups";

pub fn resource_group_descriptor() -> TypeDescriptor {
    TypeDescriptor::new(
        RESOURCE_GROUP_KEY,
        "Microsoft.Resources",
        "resourceGroups",
        RESOURCE_GROUP_KEY,
    )
}

/// `/subscriptions/<s>/resourceGroups/<rg>` for an ID nested inside a group
pub fn resource_group_of(identity: &str) -> Option<String> {
    let segments: Vec<&str> = identity.split('/').collect();
    // ["", "subscriptions", sub, "resourceGroups", rg, provider...]
    if segments.len() <= 5
        || !segments[0].is_empty()
        || !segments[1].eq_ignore_ascii_case("subscriptions")
        || !segments[3].eq_ignore_ascii_case("resourceGroups")
        || segments[4].is_empty()
    {
        return None;
    }
    Some(format!("/subscriptions/{}/resourceGroups/{}", segments[2], segments[4]))
}

#[derive(Clone)]
pub struct AzureProvider {
    credentials: ArmCredentials,
    subscription: String,
    endpoint: String,
    location: Option<String>,
    schema: Option<Arc<PackageSchema>>,
    aliases: AliasTable,
}

impl AzureProvider {
    pub fn new(credentials: ArmCredentials, subscription: &str, endpoint: &str) -> Self {
        Self {
            credentials,
            subscription: subscription.to_string(),
            endpoint: endpoint.to_string(),
            location: None,
            schema: None,
            aliases: AliasTable::new(),
        }
    }

    /// Only list resources in `location`; `*` lists every location
    pub fn with_location(mut self, location: &str) -> Self {
        self.location = match location.trim() {
            "" | ANY_LOCATION => None,
            loc => Some(loc.to_string()),
        };
        self
    }

    /// Check tokens against a package schema and use its namespace aliases
    pub fn with_schema(mut self, schema: Arc<PackageSchema>) -> Self {
        self.aliases = schema.aliases().clone();
        self.schema = Some(schema);
        self
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn client(&self) -> Result<ArmClient> {
        ArmClient::new(self.credentials.clone(), &self.subscription, &self.endpoint)
    }
}

impl Provider for AzureProvider {
    fn name(&self) -> &str {
        "azure"
    }

    fn default_workers(&self) -> usize {
        DEFAULT_WORKERS
    }

    fn type_token(&self, descriptor: &TypeDescriptor) -> Result<String, DiscoveryError> {
        let token = arm_type_token(descriptor, &self.aliases)?;
        match &self.schema {
            Some(schema) if !schema.contains(&token) => Err(DiscoveryError::unmappable(
                &descriptor.key,
                format!("{} is not in the package schema", token),
            )),
            _ => Ok(token),
        }
    }

    fn identify(&self, _descriptor: &TypeDescriptor, type_token: &str, item: &Value) -> Result<ListedItem> {
        let identity = item
            .get("id")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .with_context(|| format!("{} item without 'id'", type_token))?;

        Ok(ListedItem {
            identity: identity.to_string(),
            parent: resource_group_of(identity),
        })
    }

    fn parent_descriptor(&self) -> Option<TypeDescriptor> {
        Some(resource_group_descriptor())
    }

    /// ARM IDs are case-insensitive
    fn parent_key(&self, identity: &str) -> String {
        identity.to_ascii_lowercase()
    }

    fn new_lister(&self) -> Result<Box<dyn Lister>> {
        Ok(Box::new(AzureLister {
            client: self.client()?,
            location: self.location.clone(),
        }))
    }
}

pub struct AzureLister {
    client: ArmClient,
    location: Option<String>,
}

impl AzureLister {
    fn first_url(&self, descriptor: &TypeDescriptor) -> Result<String> {
        if descriptor.listing_key.eq_ignore_ascii_case(RESOURCE_GROUP_KEY) {
            return Ok(self.client.subscription_url("resourcegroups")?.to_string());
        }

        let mut filter = format!("resourceType eq '{}'", descriptor.listing_key);
        if let Some(location) = &self.location {
            filter.push_str(&format!(" and location eq '{}'", location));
        }

        let mut url = self.client.subscription_url("resources")?;
        url.query_pairs_mut().append_pair("$filter", &filter);
        Ok(url.to_string())
    }

    /// Resource groups cannot be filtered server-side by location
    fn keep(&self, descriptor: &TypeDescriptor, item: &Value) -> bool {
        let Some(location) = &self.location else {
            return true;
        };
        if !descriptor.listing_key.eq_ignore_ascii_case(RESOURCE_GROUP_KEY) {
            return true;
        }
        item.get("location")
            .and_then(|v| v.as_str())
            .map(|l| l.eq_ignore_ascii_case(location))
            .unwrap_or(false)
    }
}

#[async_trait]
impl Lister for AzureLister {
    async fn list_page(&mut self, descriptor: &TypeDescriptor, cursor: Option<&str>) -> Result<Page> {
        let url = match cursor {
            Some(next) => next.to_string(),
            None => self.first_url(descriptor)?,
        };

        let response = self.client.get(&url).await?;
        let (items, next) = split_list_response(&response);
        let items = items
            .into_iter()
            .filter(|item| self.keep(descriptor, item))
            .collect();

        Ok(Page { items, next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SUB: &str = "00000000-0000-0000-0000-000000000001";

    fn provider() -> AzureProvider {
        AzureProvider::new(ArmCredentials::from_token("t"), SUB, "https://management.azure.com")
    }

    #[test]
    fn test_resource_group_of() {
        assert_eq!(
            resource_group_of("/subscriptions/s/resourceGroups/rg1/providers/Microsoft.Compute/virtualMachines/vm1"),
            Some("/subscriptions/s/resourceGroups/rg1".to_string())
        );
        assert_eq!(
            resource_group_of("/subscriptions/s/resourcegroups/RG1/providers/Microsoft.Web/sites/app"),
            Some("/subscriptions/s/resourceGroups/RG1".to_string())
        );
        assert_eq!(resource_group_of("/subscriptions/s/resourceGroups/rg1"), None);
        assert_eq!(resource_group_of("/subscriptions/s/providers/Microsoft.Foo/bars/b"), None);
        assert_eq!(resource_group_of("not-an-id"), None);
    }

    #[test]
    fn test_resource_group_token() {
        assert_eq!(
            provider().type_token(&resource_group_descriptor()).unwrap(),
            crate::mapper::AZURE_RESOURCE_GROUP_TOKEN
        );
    }

    #[test]
    fn test_schema_rejects_unknown_tokens() {
        let schema = PackageSchema::from_json(
            r#"{"resources": {"azure-native:compute:VirtualMachine": {}}}"#,
        )
        .unwrap();
        let p = provider().with_schema(Arc::new(schema));

        let vm = TypeDescriptor::new("k", "Microsoft.Compute", "virtualMachines", "k");
        assert!(p.type_token(&vm).is_ok());

        let disk = TypeDescriptor::new("k", "Microsoft.Compute", "disks", "k");
        assert!(matches!(
            p.type_token(&disk),
            Err(DiscoveryError::UnmappableType { .. })
        ));
    }

    #[test]
    fn test_identify_derives_parent() {
        let p = provider();
        let item = json!({"id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/acct"});
        let listed = p.identify(&resource_group_descriptor(), "azure-native:storage:StorageAccount", &item).unwrap();
        assert_eq!(listed.parent.as_deref(), Some("/subscriptions/s/resourceGroups/rg"));
        assert_eq!(p.display_name("", &listed.identity), "acct");
        assert!(p.identify(&resource_group_descriptor(), "t", &json!({"name": "x"})).is_err());
    }

    #[test]
    fn test_parent_key_is_case_insensitive() {
        let p = provider();
        assert_eq!(
            p.parent_key("/subscriptions/S/resourceGroups/RG"),
            p.parent_key("/subscriptions/s/resourcegroups/rg")
        );
    }

    #[test]
    fn test_location_wildcard_disables_filter() {
        assert_eq!(provider().with_location("*").location(), None);
        assert_eq!(provider().with_location("eastus").location(), Some("eastus"));
    }

    #[test]
    fn test_first_url_filters_by_type_and_location() {
        let lister = AzureLister {
            client: provider().client().unwrap(),
            location: Some("westus2".to_string()),
        };
        let vm = TypeDescriptor::new(
            "Microsoft.Compute/virtualMachines",
            "Microsoft.Compute",
            "virtualMachines",
            "Microsoft.Compute/virtualMachines",
        );
        let url = url::Url::parse(&lister.first_url(&vm).unwrap()).unwrap();
        let filter = url
            .query_pairs()
            .find(|(k, _)| k == "$filter")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(
            filter,
            "resourceType eq 'Microsoft.Compute/virtualMachines' and location eq 'westus2'"
        );

        let groups = lister.first_url(&resource_group_descriptor()).unwrap();
        assert!(groups.contains("/resourcegroups?api-version=2021-04-01"));
        assert!(lister.keep(&resource_group_descriptor(), &json!({"location": "WestUS2"})));
        assert!(!lister.keep(&resource_group_descriptor(), &json!({"location": "eastus"})));
    }
}
