//! Provider package schema
//!
//! A package schema lists every resource token a provider package knows and
//! the namespace naming it publishes for other languages. It is fetched once
//! per run and shared read-only afterwards.

use crate::mapper::AliasTable;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::OnceCell;

#[derive(Deserialize)]
struct RawSchema {
    #[serde(default)]
    resources: HashMap<String, serde::de::IgnoredAny>,
    #[serde(default)]
    language: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct PackageSchema {
    tokens: HashSet<String>,
    /// module -> PascalCase namespace
    namespaces: HashMap<String, String>,
    aliases: AliasTable,
}

impl PackageSchema {
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: RawSchema =
            serde_json::from_str(content).context("Failed to parse package schema")?;

        let namespaces: HashMap<String, String> = raw
            .language
            .get("csharp")
            .and_then(|v| v.get("namespaces"))
            .and_then(|v| v.as_object())
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            tokens: raw.resources.into_keys().collect(),
            aliases: AliasTable::from_csharp_namespaces(&namespaces),
            namespaces,
        })
    }

    pub async fn fetch(http: &reqwest::Client, url: &str) -> Result<Self> {
        tracing::info!("Fetching package schema from {}", url);

        let response = http
            .get(url)
            .send()
            .await
            .context("Failed to download package schema")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Package schema download failed: {}", status);
        }

        let body = response
            .text()
            .await
            .context("Failed to read package schema")?;
        let schema = Self::from_json(&body)?;

        tracing::info!(
            "Loaded schema with {} resource types and {} namespace aliases",
            schema.tokens.len(),
            schema.aliases.len()
        );
        Ok(schema)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn namespaces(&self) -> &HashMap<String, String> {
        &self.namespaces
    }
}

/// Fetch-once holder for a schema URL
pub struct SchemaCache {
    url: String,
    http: reqwest::Client,
    cell: OnceCell<Arc<PackageSchema>>,
}

impl SchemaCache {
    pub fn new(url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("cloudsweep/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            url: url.to_string(),
            http,
            cell: OnceCell::new(),
        })
    }

    pub async fn get(&self) -> Result<Arc<PackageSchema>> {
        self.cell
            .get_or_try_init(|| async {
                PackageSchema::fetch(&self.http, &self.url).await.map(Arc::new)
            })
            .await
            .cloned()
    }
}
