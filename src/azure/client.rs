//! Azure Resource Manager client
//!
//! Bearer-token GET requests against the management endpoint. One client per
//! worker; workers share the credentials and their token cache.

use super::auth::ArmCredentials;
use crate::gcp::http::sanitize_for_log;
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";
pub const API_VERSION: &str = "2021-04-01";

pub const SUBSCRIPTION_ENV: &str = "ARM_SUBSCRIPTION_ID";
pub const LOCATION_ENV: &str = "ARM_LOCATION";

/// Subscription IDs are GUIDs
pub fn validate_subscription_id(subscription: &str) -> bool {
    uuid::Uuid::parse_str(subscription).is_ok()
}

pub struct ArmClient {
    client: Client,
    credentials: ArmCredentials,
    endpoint: String,
    subscription: String,
}

impl ArmClient {
    pub fn new(credentials: ArmCredentials, subscription: &str, endpoint: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("cloudsweep/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            credentials,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            subscription: subscription.to_string(),
        })
    }

    pub fn subscription(&self) -> &str {
        &self.subscription
    }

    /// `<endpoint>/subscriptions/<sub>/<path>?api-version=...`
    pub fn subscription_url(&self, path: &str) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/subscriptions/{}/{}",
            self.endpoint, self.subscription, path
        ))
        .context("Invalid management URL")?;
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        Ok(url)
    }

    pub async fn get(&self, url: &str) -> Result<Value> {
        tracing::debug!("GET {}", url);

        let token = self.credentials.get_token().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&token)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            tracing::debug!("ARM error: {} - {}", status, sanitize_for_log(&body));
            anyhow::bail!("API request failed: {}", status);
        }

        serde_json::from_str(&body).context("Failed to parse response JSON")
    }
}

/// The `value` array and `nextLink` of an ARM list response
pub fn split_list_response(response: &Value) -> (Vec<Value>, Option<String>) {
    let items = response
        .get("value")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    let next = response
        .get("nextLink")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    (items, next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SUB: &str = "00000000-0000-0000-0000-000000000001";

    #[test]
    fn test_subscription_url() {
        let client = ArmClient::new(ArmCredentials::from_token("t"), SUB, "https://management.azure.com/").unwrap();
        let url = client.subscription_url("resourcegroups").unwrap();
        assert_eq!(
            url.as_str(),
            format!(
                "https://management.azure.com/subscriptions/{}/resourcegroups?api-version=2021-04-01",
                SUB
            )
        );
    }

    #[test]
    fn test_split_list_response() {
        let (items, next) = split_list_response(&json!({
            "value": [{"id": "a"}],
            "nextLink": "https://next"
        }));
        assert_eq!(items.len(), 1);
        assert_eq!(next.as_deref(), Some("https://next"));

        let (items, next) = split_list_response(&json!({"value": [], "nextLink": ""}));
        assert!(items.is_empty());
        assert!(next.is_none());
    }

    #[test]
    fn test_validate_subscription_id() {
        assert!(validate_subscription_id(SUB));
        assert!(!validate_subscription_id("../../etc"));
    }
}
