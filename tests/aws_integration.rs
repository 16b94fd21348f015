//! Integration tests for AWS discovery using wiremock
//!
//! The Cloud Control client is pointed at a mock server speaking the
//! `awsJson1_0` protocol.

use aws_sdk_cloudcontrol::config::retry::RetryConfig;
use aws_sdk_cloudcontrol::config::{BehaviorVersion, Credentials, Region};
use cloudsweep::aws::{AwsProvider, AwsSchemaCatalog};
use cloudsweep::catalog::{PackageSchema, TypeCatalog};
use cloudsweep::discovery::{discover, EngineConfig, SideEffect};
use serde_json::{json, Value};
use std::num::NonZeroUsize;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

const SCHEMA: &str = r#"{
    "name": "aws-native",
    "resources": {
        "aws-native:ec2:VPC": {},
        "aws-native:s3:Bucket": {},
        "aws-native:efs:FileSystem": {}
    },
    "language": {
        "csharp": {"namespaces": {"ec2": "EC2", "s3": "S3", "efs": "EFS"}}
    }
}"#;

fn schema() -> Arc<PackageSchema> {
    Arc::new(PackageSchema::from_json(SCHEMA).unwrap())
}

fn provider(server: &MockServer, schema: &PackageSchema) -> AwsProvider {
    let config = aws_sdk_cloudcontrol::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(Credentials::new("AKIDTEST", "secret", None, None, "test"))
        .endpoint_url(server.uri())
        .retry_config(RetryConfig::disabled())
        .build();
    AwsProvider::new(config, schema)
}

fn list_response(type_name: &str, ids: &[&str], next: Option<&str>) -> ResponseTemplate {
    let mut body = json!({
        "TypeName": type_name,
        "ResourceDescriptions": ids
            .iter()
            .map(|id| json!({"Identifier": id, "Properties": format!("{{\"Id\":\"{}\"}}", id)}))
            .collect::<Vec<Value>>()
    });
    if let Some(token) = next {
        body["NextToken"] = json!(token);
    }
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/x-amz-json-1.0")
}

fn list_resources() -> MockBuilder {
    Mock::given(method("POST")).and(header("x-amz-target", "CloudApiService.ListResources"))
}

mod aws_discovery_tests {
    use super::*;

    /// NextToken is followed, the skip list holds, and one failing type is isolated
    #[tokio::test]
    async fn test_cloud_control_discovery() {
        let server = MockServer::start().await;

        list_resources()
            .and(body_partial_json(json!({"TypeName": "AWS::EC2::VPC", "NextToken": "page-2"})))
            .respond_with(list_response("AWS::EC2::VPC", &["vpc-2", "vpc-3"], None))
            .with_priority(1)
            .mount(&server)
            .await;

        list_resources()
            .and(body_partial_json(json!({"TypeName": "AWS::EC2::VPC"})))
            .respond_with(list_response("AWS::EC2::VPC", &["vpc-1", "vpc-2"], Some("page-2")))
            .mount(&server)
            .await;

        list_resources()
            .and(body_partial_json(json!({"TypeName": "AWS::S3::Bucket"})))
            .respond_with(ResponseTemplate::new(400).set_body_raw(
                json!({"__type": "UnsupportedActionException", "Message": "not supported"}).to_string(),
                "application/x-amz-json-1.0",
            ))
            .mount(&server)
            .await;

        list_resources()
            .and(body_partial_json(json!({"TypeName": "AWS::EFS::FileSystem"})))
            .respond_with(list_response("AWS::EFS::FileSystem", &["fs-1"], None))
            .expect(0)
            .mount(&server)
            .await;

        let schema = schema();
        let catalog = AwsSchemaCatalog::new(schema.clone())
            .descriptors()
            .await
            .expect("Catalog should load");
        assert_eq!(catalog.len(), 3);

        let outcome = discover(
            Arc::new(provider(&server, &schema)),
            catalog,
            &EngineConfig::new(NonZeroUsize::new(3).unwrap()),
            SideEffect::None,
        )
        .await
        .expect("Discovery should succeed");

        assert_eq!(outcome.stats.types_listed, 1);
        assert_eq!(outcome.stats.types_failed, 1);
        assert_eq!(outcome.stats.types_excluded, 1);
        assert_eq!(outcome.stats.duplicates_skipped, 1);

        let mut ids: Vec<&str> = outcome
            .inventory
            .resources
            .iter()
            .map(|r| r.identity.as_str())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["vpc-1", "vpc-2", "vpc-3"]);

        let first = &outcome.inventory.resources[0];
        assert_eq!(first.type_token, "aws-native:ec2:VPC");
        assert!(first.display_name.starts_with("EC2VPCvpc"));
    }
}
