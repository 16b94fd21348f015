//! Provider seam
//!
//! A [`Provider`] describes one cloud to the discovery engine: how its type
//! descriptors map to tokens, how raw listing items map to identities, and
//! how to build a [`Lister`] for each worker. Listers hold network clients
//! and are never shared between workers.

use crate::error::DiscoveryError;
use crate::model::{last_segment, sanitize_display_name, TypeDescriptor};
use async_trait::async_trait;
use serde_json::Value;

/// One page of a listing call
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Value>,
    /// Continuation cursor; `None` means the listing is done
    pub next: Option<String>,
}

impl Page {
    pub fn last(items: Vec<Value>) -> Self {
        Self { items, next: None }
    }

    pub fn more(items: Vec<Value>, cursor: &str) -> Self {
        Self {
            items,
            next: Some(cursor.to_string()),
        }
    }
}

/// Identity information extracted from a raw item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedItem {
    pub identity: String,
    /// Enclosing group derived from the identity path, if any
    pub parent: Option<String>,
}

/// Paginated listing client owned by exactly one worker
#[async_trait]
pub trait Lister: Send {
    /// Fetch one page of `descriptor`, continuing from `cursor`
    async fn list_page(
        &mut self,
        descriptor: &TypeDescriptor,
        cursor: Option<&str>,
    ) -> anyhow::Result<Page>;
}

pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    /// Worker count used when none is configured
    fn default_workers(&self) -> usize;

    /// Canonical token for a descriptor
    fn type_token(&self, descriptor: &TypeDescriptor) -> Result<String, DiscoveryError>;

    /// Extract identity (and derived parent) from a raw listing item
    ///
    /// An error here means the item is malformed; the worker reports it as a
    /// fault and moves on to the next item.
    fn identify(
        &self,
        descriptor: &TypeDescriptor,
        type_token: &str,
        item: &Value,
    ) -> anyhow::Result<ListedItem>;

    /// Human-usable name, restricted to `[A-Za-z0-9 ]`
    fn display_name(&self, _type_token: &str, identity: &str) -> String {
        sanitize_display_name(last_segment(identity))
    }

    /// Group-like type listed before everything else when parent-linking
    fn parent_descriptor(&self) -> Option<TypeDescriptor> {
        None
    }

    /// Normalized form used to match derived parents to published ones
    fn parent_key(&self, identity: &str) -> String {
        identity.to_string()
    }

    /// Type tokens this provider never lists, on top of configured exclusions
    fn builtin_exclusions(&self) -> &[&'static str] {
        &[]
    }

    /// A fresh listing client for one worker
    fn new_lister(&self) -> anyhow::Result<Box<dyn Lister>>;
}
