//! GCP Client
//!
//! Combines authentication and HTTP for one listing worker, and knows how
//! to turn a registry definition into a paged list request.

use super::auth::GcpCredentials;
use super::http::GcpHttpClient;
use crate::catalog::registry::ResourceDef;
use crate::provider::Page;
use anyhow::{Context, Result};
use serde_json::Value;
use url::Url;

/// Main GCP client
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    pub project_id: String,
    /// Replaces `https://<host>` for every request (emulators, tests)
    pub endpoint: Option<String>,
}

impl GcpClient {
    pub fn new(credentials: GcpCredentials, project_id: &str, endpoint: Option<&str>) -> Result<Self> {
        Ok(Self {
            credentials,
            http: GcpHttpClient::new()?,
            project_id: project_id.to_string(),
            endpoint: endpoint.map(|e| e.trim_end_matches('/').to_string()),
        })
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String> {
        self.credentials.get_token().await
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.get(url, &token).await
    }

    /// Build the list URL for a definition, continuing from `page_token`
    pub fn list_url(&self, def: &ResourceDef, page_token: Option<&str>) -> Result<Url> {
        let path = def.path.replace("{project}", &self.project_id);
        let base = match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://{}", def.host),
        };

        let mut url = Url::parse(&format!("{}{}", base, path))
            .with_context(|| format!("Invalid list URL for {}", def.collection))?;
        if let Some(token) = page_token {
            url.query_pairs_mut().append_pair("pageToken", token);
        }
        Ok(url)
    }

    /// Fetch one page of a collection
    pub async fn list_page(&self, def: &ResourceDef, page_token: Option<&str>) -> Result<Page> {
        let url = self.list_url(def, page_token)?;
        let response = self.get(url.as_str()).await?;

        let items = if def.aggregated {
            flatten_aggregated(&response)
        } else {
            extract_items(&response, &def.response_path)
        };

        // An empty token ends the listing the same way a missing one does
        let next = response
            .get("nextPageToken")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty());

        Ok(match next {
            Some(token) => Page::more(items, token),
            None => Page::last(items),
        })
    }
}

/// Follow a dot-separated path to the item array
fn extract_items(response: &Value, path: &str) -> Vec<Value> {
    if path.is_empty() {
        return response.as_array().cloned().unwrap_or_default();
    }

    let mut current = response;
    for part in path.split('.') {
        current = match current.get(part) {
            Some(v) => v,
            None => return vec![],
        };
    }

    current.as_array().cloned().unwrap_or_default()
}

/// Merge a zone/region keyed `items` map into one list
fn flatten_aggregated(response: &Value) -> Vec<Value> {
    let Some(scopes) = response.get("items").and_then(|v| v.as_object()) else {
        return vec![];
    };

    let mut all_items = Vec::new();
    for scope in scopes.values() {
        let Some(obj) = scope.as_object() else {
            continue;
        };
        for (key, value) in obj {
            if key == "warning" {
                continue;
            }
            if let Some(arr) = value.as_array() {
                all_items.extend(arr.iter().cloned());
            }
        }
    }
    all_items
}
