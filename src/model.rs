//! Inventory data model
//!
//! Type descriptors come in from a catalog, canonical records go out of the
//! discovery engine, and an [`Inventory`] collects them for the emitters.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// A resource kind as supplied by a type catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    /// Opaque identifier of the kind within its catalog
    pub key: String,
    /// Namespace or group label (e.g. `compute/v1`, `Microsoft.Compute`)
    pub namespace: String,
    /// Provider-native kind or collection name (e.g. `instances`)
    pub kind: String,
    /// What the provider's listing call expects for this kind
    pub listing_key: String,
}

impl TypeDescriptor {
    pub fn new(key: &str, namespace: &str, kind: &str, listing_key: &str) -> Self {
        Self {
            key: key.to_string(),
            namespace: namespace.to_string(),
            kind: kind.to_string(),
            listing_key: listing_key.to_string(),
        }
    }
}

/// One discovered resource instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    #[serde(rename = "type")]
    pub type_token: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "id")]
    pub identity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Property names downstream tooling should treat specially
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<String>,
}

impl CanonicalRecord {
    /// Build a record, deriving a sanitized display name from `name_source`
    pub fn new(type_token: &str, identity: &str, name_source: &str, parent: Option<String>) -> Self {
        Self {
            type_token: type_token.to_string(),
            display_name: sanitize_display_name(name_source),
            identity: identity.to_string(),
            parent,
            provider: None,
            version: None,
            properties: Vec::new(),
        }
    }

    /// The uniqueness key of a record within one run
    pub fn key(&self) -> (String, String) {
        (self.type_token.clone(), self.identity.clone())
    }
}

/// Strip every character outside `[A-Za-z0-9 ]`
///
/// Distinct identities that only differ in stripped characters collide; no
/// disambiguator is appended.
pub fn sanitize_display_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect()
}

/// Last non-empty `/`-separated segment of an identity
pub fn last_segment(identity: &str) -> &str {
    identity
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or(identity)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InventoryError {
    #[error("record {identity} references parent {parent} which is not in the inventory")]
    DanglingParent { identity: String, parent: String },
    #[error("duplicate record {type_token} {identity}")]
    Duplicate { type_token: String, identity: String },
}

/// The assembled result of a discovery run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(rename = "nameTable", default)]
    pub name_table: BTreeMap<String, String>,
    pub resources: Vec<CanonicalRecord>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: CanonicalRecord) {
        self.resources.push(record);
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Records of one type, in inventory order
    pub fn of_type<'a>(&'a self, type_token: &'a str) -> impl Iterator<Item = &'a CanonicalRecord> {
        self.resources
            .iter()
            .filter(move |r| r.type_token == type_token)
    }

    /// Check that keys are unique and every parent is present
    pub fn validate(&self) -> Result<(), InventoryError> {
        let mut keys = HashSet::new();
        let identities: HashSet<&str> = self.resources.iter().map(|r| r.identity.as_str()).collect();

        for record in &self.resources {
            if !keys.insert((record.type_token.as_str(), record.identity.as_str())) {
                return Err(InventoryError::Duplicate {
                    type_token: record.type_token.clone(),
                    identity: record.identity.clone(),
                });
            }
            if let Some(parent) = &record.parent {
                if !identities.contains(parent.as_str()) {
                    return Err(InventoryError::DanglingParent {
                        identity: record.identity.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
