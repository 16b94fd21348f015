//! AWS provider
//!
//! AWS has no group-like parent type; every record is top-level. Identities
//! are Cloud Control identifiers, which are only unique within a type, so
//! display names carry the namespace and type as well.

use crate::catalog::PackageSchema;
use crate::error::DiscoveryError;
use crate::mapper::{aws_type_token, split_token};
use crate::model::{sanitize_display_name, TypeDescriptor};
use crate::provider::{ListedItem, Lister, Page, Provider};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_cloudcontrol::config::retry::RetryConfig;
use aws_sdk_cloudcontrol::error::DisplayErrorContext;
use aws_sdk_cloudcontrol::operation::list_resources::ListResourcesOutput;
use aws_sdk_cloudcontrol::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_WORKERS: usize = 3;

/// Largest page Cloud Control returns
pub const PAGE_SIZE: i32 = 100;

/// Cloud Control throttles aggressively; retry well past the SDK default
pub const MAX_ATTEMPTS: u32 = 10;

/// Types whose listing or import is known to fail
pub const RESOURCES_TO_SKIP: &[&str] = &[
    // needs an account registered as a publisher
    "aws-native:cloudformation:PublicTypeVersion",
    // lists the built-in AwsDataCatalog, which cannot be read back
    "aws-native:athena:DataCatalog",
    // lists built-in connectors, which cannot be read back
    "aws-native:appflow:Connector",
    // identifiers collide once names are sanitized
    "aws-native:efs:FileSystem",
    // auto-defined rules cannot be tagged
    "aws-native:route53resolver:ResolverRule",
];

#[derive(Clone)]
pub struct AwsProvider {
    config: aws_sdk_cloudcontrol::Config,
    /// module -> PascalCase namespace
    namespaces: Arc<HashMap<String, String>>,
}

impl AwsProvider {
    pub fn new(config: aws_sdk_cloudcontrol::Config, schema: &PackageSchema) -> Self {
        Self {
            config,
            namespaces: Arc::new(schema.namespaces().clone()),
        }
    }

    /// Service config from the shared AWS config, with extra retries
    pub fn from_shared_config(shared: &aws_config::SdkConfig, schema: &PackageSchema) -> Self {
        let config = aws_sdk_cloudcontrol::config::Builder::from(shared)
            .retry_config(RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS))
            .build();
        Self::new(config, schema)
    }

    pub fn client(&self) -> Client {
        Client::from_conf(self.config.clone())
    }
}

impl Provider for AwsProvider {
    fn name(&self) -> &str {
        "aws"
    }

    fn default_workers(&self) -> usize {
        DEFAULT_WORKERS
    }

    fn type_token(&self, descriptor: &TypeDescriptor) -> Result<String, DiscoveryError> {
        aws_type_token(descriptor)
    }

    fn identify(&self, _descriptor: &TypeDescriptor, type_token: &str, item: &Value) -> Result<ListedItem> {
        let identity = item
            .get("Identifier")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .with_context(|| format!("{} item without 'Identifier'", type_token))?;

        Ok(ListedItem {
            identity: identity.to_string(),
            parent: None,
        })
    }

    /// `<Namespace><Type><Identifier>`, sanitized
    fn display_name(&self, type_token: &str, identity: &str) -> String {
        let Some((_, module, kind)) = split_token(type_token) else {
            return sanitize_display_name(identity);
        };
        let namespace = self
            .namespaces
            .get(module)
            .map(String::as_str)
            .unwrap_or(module);
        sanitize_display_name(&format!("{}{}{}", namespace, kind, identity))
    }

    fn builtin_exclusions(&self) -> &[&'static str] {
        RESOURCES_TO_SKIP
    }

    fn new_lister(&self) -> Result<Box<dyn Lister>> {
        Ok(Box::new(AwsLister {
            client: self.client(),
        }))
    }
}

pub struct AwsLister {
    client: Client,
}

#[async_trait]
impl Lister for AwsLister {
    async fn list_page(&mut self, descriptor: &TypeDescriptor, cursor: Option<&str>) -> Result<Page> {
        let output = self
            .client
            .list_resources()
            .type_name(&descriptor.listing_key)
            .max_results(PAGE_SIZE)
            .set_next_token(cursor.map(str::to_string))
            .send()
            .await
            .map_err(|e| {
                anyhow!(
                    "ListResources {} failed: {}",
                    descriptor.listing_key,
                    DisplayErrorContext(&e)
                )
            })?;

        Ok(page_from_output(&output))
    }
}

/// Items carry the identifier and the decoded property document
pub fn page_from_output(output: &ListResourcesOutput) -> Page {
    let items = output
        .resource_descriptions()
        .iter()
        .map(|r| {
            let properties = r
                .properties()
                .and_then(|p| serde_json::from_str::<Value>(p).ok())
                .unwrap_or(Value::Null);
            json!({
                "Identifier": r.identifier(),
                "Properties": properties,
            })
        })
        .collect();

    let next = output
        .next_token()
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    Page { items, next }
}
