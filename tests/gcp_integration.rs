//! Integration tests for GCP discovery using wiremock
//!
//! The provider is pointed at a mock server standing in for every Google API
//! host, and whole discovery runs are checked end to end.

use cloudsweep::catalog::registry::descriptors;
use cloudsweep::discovery::{discover, EngineConfig, SideEffect};
use cloudsweep::gcp::{GcpCredentials, GcpProvider};
use cloudsweep::model::TypeDescriptor;
use cloudsweep::provider::Provider;
use serde_json::json;
use std::num::NonZeroUsize;
use std::sync::Arc;
use wiremock::matchers::{bearer_token, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT: &str = "test-project-1";

fn provider(server: &MockServer) -> Arc<dyn Provider> {
    Arc::new(
        GcpProvider::new(GcpCredentials::from_token("test-token"), PROJECT)
            .with_endpoint(&server.uri()),
    )
}

fn catalog(keys: &[&str]) -> Vec<TypeDescriptor> {
    descriptors()
        .into_iter()
        .filter(|d| keys.contains(&d.key.as_str()))
        .collect()
}

fn config(workers: usize) -> EngineConfig {
    EngineConfig::new(NonZeroUsize::new(workers).unwrap())
}

fn self_link(collection: &str, name: &str) -> String {
    format!(
        "https://www.googleapis.com/compute/v1/projects/{}/global/{}/{}",
        PROJECT, collection, name
    )
}

mod gcp_discovery_tests {
    use super::*;

    /// Pages are followed via pageToken until nextPageToken disappears
    #[tokio::test]
    async fn test_pagination_follows_next_page_token() {
        let server = MockServer::start().await;
        let list_path = format!("/compute/v1/projects/{}/global/networks", PROJECT);

        // Second page
        Mock::given(method("GET"))
            .and(path(list_path.as_str()))
            .and(query_param("pageToken", "token-page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"name": "net-2", "selfLink": self_link("networks", "net-2")},
                    {"name": "net-3", "selfLink": self_link("networks", "net-3")}
                ]
            })))
            .with_priority(1)
            .mount(&server)
            .await;

        // First page
        Mock::given(method("GET"))
            .and(path(list_path.as_str()))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"name": "net-1", "selfLink": self_link("networks", "net-1")},
                    {"name": "net-2", "selfLink": self_link("networks", "net-2")}
                ],
                "nextPageToken": "token-page-2"
            })))
            .mount(&server)
            .await;

        let outcome = discover(
            provider(&server),
            catalog(&["compute-networks"]),
            &config(1),
            SideEffect::None,
        )
        .await
        .expect("Discovery should succeed");

        assert_eq!(outcome.inventory.len(), 3);
        assert_eq!(outcome.stats.duplicates_skipped, 1);

        let names: Vec<&str> = outcome
            .inventory
            .resources
            .iter()
            .map(|r| r.display_name.as_str())
            .collect();
        assert!(names.contains(&"net1") && names.contains(&"net3"));
        assert!(outcome
            .inventory
            .resources
            .iter()
            .all(|r| r.type_token == "google-native:compute/v1:Network"));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
    }

    /// An empty nextPageToken ends the listing
    #[tokio::test]
    async fn test_empty_page_token_ends_listing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/compute/v1/projects/{}/global/firewalls", PROJECT).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"selfLink": self_link("firewalls", "allow-ssh")}],
                "nextPageToken": ""
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = discover(
            provider(&server),
            catalog(&["compute-firewalls"]),
            &config(1),
            SideEffect::None,
        )
        .await
        .expect("Discovery should succeed");

        assert_eq!(outcome.inventory.len(), 1);
        assert_eq!(outcome.inventory.resources[0].display_name, "allowssh");
    }

    /// Aggregated responses are flattened across zones, skipping warnings
    #[tokio::test]
    async fn test_aggregated_listing_is_flattened() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/compute/v1/projects/{}/aggregated/instances", PROJECT).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": {
                    "zones/us-central1-a": {
                        "instances": [
                            {"name": "vm-1", "selfLink": "https://x/zones/us-central1-a/instances/vm-1"},
                            {"name": "vm-2", "selfLink": "https://x/zones/us-central1-a/instances/vm-2"}
                        ]
                    },
                    "zones/us-east1-b": {
                        "warning": {"code": "NO_RESULTS_ON_PAGE", "message": "empty"}
                    },
                    "zones/europe-west1-c": {
                        "instances": [
                            {"name": "vm-3", "selfLink": "https://x/zones/europe-west1-c/instances/vm-3"}
                        ]
                    }
                }
            })))
            .mount(&server)
            .await;

        let outcome = discover(
            provider(&server),
            catalog(&["compute-instances"]),
            &config(2),
            SideEffect::None,
        )
        .await
        .expect("Discovery should succeed");

        assert_eq!(outcome.inventory.len(), 3);
        assert_eq!(outcome.stats.types_listed, 1);
    }

    /// A failing API only costs its own type
    #[tokio::test]
    async fn test_forbidden_type_does_not_stop_others() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/compute/v1/projects/{}/global/networks", PROJECT).as_str()))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": 403, "message": "Permission denied"}
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/storage/v1/b"))
            .and(query_param("project", PROJECT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"name": "logs-bucket", "selfLink": "https://www.googleapis.com/storage/v1/b/logs-bucket"}
                ]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/v1/projects/{}/topics", PROJECT).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "topics": [
                    {"name": format!("projects/{}/topics/events", PROJECT)},
                    {"labels": {}}
                ]
            })))
            .mount(&server)
            .await;

        let outcome = discover(
            provider(&server),
            catalog(&["compute-networks", "storage-buckets", "pubsub-topics"]),
            &config(3),
            SideEffect::None,
        )
        .await
        .expect("Discovery should succeed");

        assert_eq!(outcome.stats.types_failed, 1);
        assert_eq!(outcome.stats.types_listed, 2);
        // the topic without a name
        assert_eq!(outcome.stats.worker_faults, 1);

        let mut ids: Vec<&str> = outcome
            .inventory
            .resources
            .iter()
            .map(|r| r.identity.as_str())
            .collect();
        ids.sort();
        assert_eq!(
            ids,
            vec![
                "https://www.googleapis.com/storage/v1/b/logs-bucket",
                "projects/test-project-1/topics/events",
            ]
        );
    }

    /// Excluded keys never reach the network
    #[tokio::test]
    async fn test_excluded_type_is_not_requested() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = discover(
            provider(&server),
            catalog(&["compute-networks"]),
            &config(1).with_exclusions(["google-native:compute/v1:Network"]),
            SideEffect::None,
        )
        .await
        .expect("Discovery should succeed");

        assert!(outcome.inventory.is_empty());
        assert_eq!(outcome.stats.types_excluded, 1);
    }
}
