//! aws-native schema catalog
//!
//! Every resource token in the package schema is one descriptor; its listing
//! key is the Cloud Control type name.

use crate::catalog::{PackageSchema, TypeCatalog};
use crate::mapper::{cloud_control_type_name, split_token, AWS_PACKAGE};
use crate::model::TypeDescriptor;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Where the aws-native package schema is published
pub const SCHEMA_URL: &str = "https://raw.githubusercontent.com/pulumi/pulumi-aws-native/master/provider/cmd/pulumi-resource-aws-native/schema.json";

pub struct AwsSchemaCatalog {
    schema: Arc<PackageSchema>,
}

impl AwsSchemaCatalog {
    pub fn new(schema: Arc<PackageSchema>) -> Self {
        Self { schema }
    }
}

#[async_trait]
impl TypeCatalog for AwsSchemaCatalog {
    async fn descriptors(&self) -> Result<Vec<TypeDescriptor>> {
        let mut descriptors: Vec<TypeDescriptor> = Vec::new();
        for token in self.schema.tokens() {
            match schema_descriptor(token, self.schema.namespaces()) {
                Some(descriptor) => descriptors.push(descriptor),
                None => tracing::warn!("Ignoring schema token {}", token),
            }
        }

        tracing::info!("Catalog lists {} resource types", descriptors.len());
        Ok(descriptors)
    }
}

/// Descriptor for one `aws-native:<module>:<Type>` token
pub fn schema_descriptor(token: &str, namespaces: &HashMap<String, String>) -> Option<TypeDescriptor> {
    let (package, module, kind) = split_token(token)?;
    if package != AWS_PACKAGE {
        return None;
    }
    Some(TypeDescriptor::new(
        token,
        module,
        kind,
        &cloud_control_type_name(module, kind, namespaces),
    ))
}
