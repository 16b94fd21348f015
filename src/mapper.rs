//! Type-Token Mapper
//!
//! Pure translation from provider-native type descriptors to canonical type
//! tokens of the form `<package>:<module>:<Kind>`. No network access; the
//! only failure is [`DiscoveryError::UnmappableType`].

use crate::error::DiscoveryError;
use crate::model::TypeDescriptor;
use std::collections::HashMap;

pub const GCP_PACKAGE: &str = "google-native";
pub const AZURE_PACKAGE: &str = "azure-native";
pub const AWS_PACKAGE: &str = "aws-native";
pub const KUBERNETES_PACKAGE: &str = "kubernetes";

/// Token used for Azure resource groups, the parent type of everything else
pub const AZURE_RESOURCE_GROUP_TOKEN: &str = "azure-native:resources:ResourceGroup";

/// Namespace aliases published by a provider package
///
/// Keys are compared lowercased. Lookups that miss fall back to the raw
/// namespace.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, native: &str, module: &str) {
        self.aliases
            .insert(native.to_ascii_lowercase(), module.to_string());
    }

    /// Build from a package's `language.csharp.namespaces` table
    ///
    /// That table maps module -> PascalCase namespace; the alias table needs
    /// the reverse direction.
    pub fn from_csharp_namespaces(namespaces: &HashMap<String, String>) -> Self {
        let mut table = Self::new();
        for (module, csharp) in namespaces {
            table.insert(csharp, module);
        }
        table
    }

    pub fn resolve<'a>(&'a self, raw: &'a str) -> &'a str {
        self.aliases
            .get(&raw.to_ascii_lowercase())
            .map(String::as_str)
            .unwrap_or(raw)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// `google-native:<service>/<version>:<Kind>`
///
/// The descriptor namespace is `<service>/<version>` and its kind is the REST
/// collection name.
pub fn gcp_type_token(descriptor: &TypeDescriptor) -> Result<String, DiscoveryError> {
    check_part(descriptor, "namespace", &descriptor.namespace)?;
    if !descriptor.namespace.contains('/') {
        return Err(DiscoveryError::unmappable(
            &descriptor.key,
            format!("namespace '{}' is not <service>/<version>", descriptor.namespace),
        ));
    }
    let kind = singular_pascal(last_kind_segment(descriptor)?);
    Ok(format!("{}:{}:{}", GCP_PACKAGE, descriptor.namespace, kind))
}

/// `azure-native:<module>:<Kind>`
///
/// `Microsoft.Compute` + `virtualMachines` maps to
/// `azure-native:compute:VirtualMachine`.
pub fn arm_type_token(
    descriptor: &TypeDescriptor,
    aliases: &AliasTable,
) -> Result<String, DiscoveryError> {
    check_part(descriptor, "namespace", &descriptor.namespace)?;
    let raw = strip_prefix_ignore_case(&descriptor.namespace, "Microsoft.");
    if raw.is_empty() {
        return Err(DiscoveryError::unmappable(&descriptor.key, "empty namespace"));
    }
    let module = aliases.resolve(raw).to_ascii_lowercase();
    let kind = singular_pascal(last_kind_segment(descriptor)?);
    Ok(format!("{}:{}:{}", AZURE_PACKAGE, module, kind))
}

/// `aws-native:<module>:<Type>`
///
/// AWS descriptors come from the package schema, so the kind is already the
/// singular type name.
pub fn aws_type_token(descriptor: &TypeDescriptor) -> Result<String, DiscoveryError> {
    check_part(descriptor, "namespace", &descriptor.namespace)?;
    check_part(descriptor, "kind", &descriptor.kind)?;
    Ok(format!(
        "{}:{}:{}",
        AWS_PACKAGE, descriptor.namespace, descriptor.kind
    ))
}

/// `AWS::<Namespace>::<Type>` for a module and type
///
/// The module's PascalCase namespace comes from `namespaces` (module ->
/// namespace); a module without an entry is used as is.
pub fn cloud_control_type_name(
    module: &str,
    kind: &str,
    namespaces: &HashMap<String, String>,
) -> String {
    let namespace = namespaces.get(module).map(String::as_str).unwrap_or(module);
    format!("AWS::{}::{}", namespace, kind)
}

/// `kubernetes:<group>/<version>:<Kind>`
///
/// The descriptor namespace is already `<group>/<version>`, with `core` for
/// the legacy group. Kubernetes kinds are singular PascalCase.
pub fn kube_type_token(descriptor: &TypeDescriptor) -> Result<String, DiscoveryError> {
    check_part(descriptor, "namespace", &descriptor.namespace)?;
    check_part(descriptor, "kind", &descriptor.kind)?;
    match descriptor.namespace.split_once('/') {
        Some((group, version)) if !group.is_empty() && !version.is_empty() => {}
        _ => {
            return Err(DiscoveryError::unmappable(
                &descriptor.key,
                format!("namespace '{}' is not <group>/<version>", descriptor.namespace),
            ))
        }
    }
    if descriptor.kind.contains('/') {
        return Err(DiscoveryError::unmappable(&descriptor.key, "subresource kind"));
    }
    Ok(format!(
        "{}:{}:{}",
        KUBERNETES_PACKAGE, descriptor.namespace, descriptor.kind
    ))
}

/// Split a canonical token into package, module and kind
pub fn split_token(token: &str) -> Option<(&str, &str, &str)> {
    let mut parts = token.splitn(3, ':');
    let package = parts.next()?;
    let module = parts.next()?;
    let kind = parts.next()?;
    if package.is_empty() || module.is_empty() || kind.is_empty() || kind.contains(':') {
        return None;
    }
    Some((package, module, kind))
}

fn last_kind_segment(descriptor: &TypeDescriptor) -> Result<&str, DiscoveryError> {
    check_part(descriptor, "kind", &descriptor.kind)?;
    descriptor
        .kind
        .rsplit('/')
        .find(|s| !s.is_empty())
        .ok_or_else(|| DiscoveryError::unmappable(&descriptor.key, "empty kind"))
}

fn check_part(descriptor: &TypeDescriptor, label: &str, value: &str) -> Result<(), DiscoveryError> {
    if value.is_empty() {
        return Err(DiscoveryError::unmappable(
            &descriptor.key,
            format!("empty {}", label),
        ));
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '/' | '_' | '-')))
    {
        return Err(DiscoveryError::unmappable(
            &descriptor.key,
            format!("{} '{}' contains '{}'", label, value, bad),
        ));
    }
    Ok(())
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> &'a str {
    if value.len() >= prefix.len() && value[..prefix.len()].eq_ignore_ascii_case(prefix) {
        &value[prefix.len()..]
    } else {
        value
    }
}

/// `backendServices` -> `BackendService`
///
/// Singularization follows the pluralize rule set, so `Redis` and `aliases`
/// come out as `Redis` and `Alias`.
pub fn singular_pascal(collection: &str) -> String {
    let singular = pluralizer::pluralize(collection, 1, false);
    let mut chars = singular.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
