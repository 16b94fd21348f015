//! Discovery engine
//!
//! Wires the pieces together: an optional parent pass, N shard workers in a
//! [`JoinSet`], a closer task that waits for all of them and then drops the
//! last sender, and the aggregator draining the queue until it closes.

use super::aggregator::{Aggregator, SideEffect};
use super::partition::partition;
use super::stats::{DiscoveryStats, StatsSnapshot};
use super::worker::{ParentIndex, ShardWorker};
use super::EngineConfig;
use crate::error::DiscoveryError;
use crate::model::{Inventory, TypeDescriptor};
use crate::provider::Provider;
use anyhow::anyhow;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Capacity of the queue between workers and the aggregator
pub const QUEUE_CAPACITY: usize = 1024;

/// Result of one discovery run
#[derive(Debug, Default)]
pub struct DiscoveryOutcome {
    pub inventory: Inventory,
    pub stats: StatsSnapshot,
    pub parents_published: usize,
    pub duplicates_collapsed: usize,
    pub side_effect_failures: usize,
}

/// Discover every resource of every type in `catalog`
///
/// Only setup problems (building listing clients, task failures outside the
/// workers) are returned as errors; everything else degrades into warnings
/// and counters on the outcome.
pub async fn discover(
    provider: Arc<dyn Provider>,
    catalog: Vec<TypeDescriptor>,
    config: &EngineConfig,
    side_effect: SideEffect,
) -> Result<DiscoveryOutcome, DiscoveryError> {
    let stats = Arc::new(DiscoveryStats::new());
    let mut exclusions = config.exclusions.clone();
    exclusions.extend(provider.builtin_exclusions().iter().map(|s| s.to_string()));
    let exclusions = Arc::new(exclusions);

    let parent_descriptor = if config.parent_linking {
        provider.parent_descriptor()
    } else {
        None
    };

    // Listing clients are not shared; build one per concurrent unit up front
    let parent_lister = match parent_descriptor {
        Some(_) => Some(provider.new_lister().map_err(DiscoveryError::FatalSetup)?),
        None => None,
    };
    let mut listers = Vec::with_capacity(config.workers.get());
    for _ in 0..config.workers.get() {
        listers.push(provider.new_lister().map_err(DiscoveryError::FatalSetup)?);
    }

    let catalog: Vec<TypeDescriptor> = match &parent_descriptor {
        Some(parent) => catalog.into_iter().filter(|d| d.key != parent.key).collect(),
        None => catalog,
    };

    tracing::info!(
        provider = provider.name(),
        types = catalog.len(),
        workers = config.workers.get(),
        parent_linking = parent_descriptor.is_some(),
        "starting discovery"
    );

    let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
    let aggregator = tokio::spawn(Aggregator::new(side_effect).run(rx));

    // Phase one: every parent is on the queue before any child worker exists
    let parents = match (parent_descriptor, parent_lister) {
        (Some(descriptor), Some(lister)) => {
            let report = ShardWorker::new(
                0,
                provider.clone(),
                lister,
                exclusions.clone(),
                tx.clone(),
                stats.clone(),
            )
            .run(vec![descriptor])
            .await;

            let mut index = ParentIndex::new();
            for (_, identity) in report.seen {
                index.insert(provider.parent_key(&identity), identity);
            }
            tracing::info!("Published {} parent resources", index.len());
            Some(Arc::new(index))
        }
        _ => None,
    };
    let parents_published = parents.as_ref().map(|p| p.len()).unwrap_or(0);

    // Phase two
    let mut workers = JoinSet::new();
    for (index, (shard, lister)) in partition(catalog, config.workers)
        .into_iter()
        .zip(listers)
        .enumerate()
    {
        let mut worker = ShardWorker::new(
            index + 1,
            provider.clone(),
            lister,
            exclusions.clone(),
            tx.clone(),
            stats.clone(),
        );
        if let Some(parents) = &parents {
            worker = worker.with_parents(parents.clone());
        }
        workers.spawn(worker.run(shard));
    }

    let closer_stats = stats.clone();
    let closer = tokio::spawn(async move {
        let mut finished = 0usize;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(report) => {
                    if report.stopped_early {
                        tracing::warn!(worker = report.worker, "worker stopped before finishing its shard");
                    }
                    finished += 1;
                }
                Err(err) => {
                    tracing::warn!("shard worker ended abnormally: {}", err);
                    closer_stats.worker_fault();
                }
            }
        }
        drop(tx);
        finished
    });

    let finished = closer
        .await
        .map_err(|err| DiscoveryError::FatalSetup(anyhow!("queue closer failed: {}", err)))?;
    let aggregate = aggregator
        .await
        .map_err(|err| DiscoveryError::FatalSetup(anyhow!("aggregator failed: {}", err)))?;

    tracing::info!(
        workers = finished,
        records = aggregate.inventory.len(),
        "discovery finished"
    );

    Ok(DiscoveryOutcome {
        inventory: aggregate.inventory,
        stats: stats.snapshot(),
        parents_published,
        duplicates_collapsed: aggregate.duplicates_collapsed,
        side_effect_failures: aggregate.side_effect_failures,
    })
}
