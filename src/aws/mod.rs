//! AWS adapter
//!
//! Listing goes through the Cloud Control API, which lists any resource type
//! by its CloudFormation name (`AWS::EC2::VPC`).
//!
//! - [`catalog`] - Resource types from the aws-native package schema
//! - [`provider`] - The [`Provider`](crate::provider::Provider) implementation

pub mod catalog;
pub mod provider;

pub use catalog::AwsSchemaCatalog;
pub use provider::{AwsLister, AwsProvider, RESOURCES_TO_SKIP};
