//! Concurrent discovery engine
//!
//! # Architecture
//!
//! - [`partition`] - Round-robin split of the type catalog into shards
//! - [`worker`] - One shard worker per shard, each with its own listing client
//! - [`aggregator`] - Single consumer assembling the inventory
//! - [`engine`] - Two-phase orchestration and queue lifecycle
//! - [`stats`] - Counters passed by reference into every task
//!
//! # Example
//!
//! ```ignore
//! use cloudsweep::discovery::{discover, EngineConfig, SideEffect};
//!
//! async fn run(provider: Arc<dyn Provider>, catalog: Vec<TypeDescriptor>) -> anyhow::Result<()> {
//!     let config = EngineConfig::new(NonZeroUsize::new(4).unwrap());
//!     let outcome = discover(provider, catalog, &config, SideEffect::None).await?;
//!     println!("Total resources: {}", outcome.inventory.len());
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod engine;
pub mod partition;
pub mod stats;
pub mod worker;

pub use aggregator::{AggregateReport, Aggregator, SideEffect};
pub use engine::{discover, DiscoveryOutcome, QUEUE_CAPACITY};
pub use partition::partition;
pub use stats::{DiscoveryStats, StatsSnapshot};
pub use worker::{ParentIndex, ShardWorker, WorkerReport};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::num::NonZeroUsize;

/// What happens to each record after discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Write the inventory file only
    #[default]
    Export,
    /// Register each record as externally managed while discovering
    LiveRegister,
    /// Run the external import for each record as it arrives
    IncrementalImport,
}

/// Engine settings supplied by the configuration layer
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub workers: NonZeroUsize,
    /// Descriptor keys or type tokens that are never listed
    pub exclusions: HashSet<String>,
    /// List the provider's group-like type first and link children to it
    pub parent_linking: bool,
}

impl EngineConfig {
    pub fn new(workers: NonZeroUsize) -> Self {
        Self {
            workers,
            exclusions: HashSet::new(),
            parent_linking: true,
        }
    }

    pub fn with_exclusions<I, S>(mut self, exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusions.extend(exclusions.into_iter().map(Into::into));
        self
    }

    pub fn without_parent_linking(mut self) -> Self {
        self.parent_linking = false;
        self
    }
}
