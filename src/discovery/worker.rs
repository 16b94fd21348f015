//! Shard Worker
//!
//! Lists every type of one shard in sequence, page by page, and publishes
//! each unique record onto the shared queue. Failures are contained here:
//! a failed listing abandons one type, a malformed item is skipped, and a
//! panic while processing a type is caught so siblings never notice.

use super::stats::DiscoveryStats;
use crate::error::DiscoveryError;
use crate::model::{CanonicalRecord, TypeDescriptor};
use crate::provider::{Lister, Provider};
use futures::FutureExt;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;

/// How often (in published records) progress is logged at info level
const PROGRESS_INTERVAL: usize = 100;

/// Published parent identities, keyed by the provider's parent key
#[derive(Debug, Default)]
pub struct ParentIndex {
    by_key: HashMap<String, String>,
}

impl ParentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, identity: String) {
        self.by_key.insert(key, identity);
    }

    /// Identity of the published parent for `key`
    pub fn resolve(&self, key: &str) -> Option<&str> {
        self.by_key.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// What a worker hands back when it finishes
#[derive(Debug, Default)]
pub struct WorkerReport {
    pub worker: usize,
    /// Every `(type_token, identity)` this worker published
    pub seen: HashSet<(String, String)>,
    /// The queue closed before the shard was finished
    pub stopped_early: bool,
}

enum Outcome {
    Excluded,
    Unmappable(DiscoveryError),
    Listed,
    Failed(DiscoveryError),
    QueueClosed,
}

pub struct ShardWorker {
    id: usize,
    provider: Arc<dyn Provider>,
    lister: Box<dyn Lister>,
    exclusions: Arc<HashSet<String>>,
    parents: Option<Arc<ParentIndex>>,
    tx: mpsc::Sender<CanonicalRecord>,
    stats: Arc<DiscoveryStats>,
    seen: HashSet<(String, String)>,
}

impl ShardWorker {
    pub fn new(
        id: usize,
        provider: Arc<dyn Provider>,
        lister: Box<dyn Lister>,
        exclusions: Arc<HashSet<String>>,
        tx: mpsc::Sender<CanonicalRecord>,
        stats: Arc<DiscoveryStats>,
    ) -> Self {
        Self {
            id,
            provider,
            lister,
            exclusions,
            parents: None,
            tx,
            stats,
            seen: HashSet::new(),
        }
    }

    /// Attach parents published by the first pass
    pub fn with_parents(mut self, parents: Arc<ParentIndex>) -> Self {
        self.parents = Some(parents);
        self
    }

    /// Process the whole shard and report what was published
    pub async fn run(mut self, shard: Vec<TypeDescriptor>) -> WorkerReport {
        tracing::debug!(worker = self.id, types = shard.len(), "shard worker started");
        let mut stopped_early = false;

        for descriptor in &shard {
            let outcome = AssertUnwindSafe(self.process(descriptor))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Outcome::Listed) => self.stats.type_listed(),
                Ok(Outcome::Excluded) => {
                    tracing::debug!(worker = self.id, key = %descriptor.key, "type excluded");
                    self.stats.type_excluded();
                }
                Ok(Outcome::Unmappable(err)) => {
                    tracing::warn!(worker = self.id, "skipping type: {}", err);
                    self.stats.type_unmappable();
                }
                Ok(Outcome::Failed(err)) => {
                    tracing::warn!(worker = self.id, "abandoning type: {}", err);
                    self.stats.type_failed();
                }
                Ok(Outcome::QueueClosed) => {
                    tracing::warn!(worker = self.id, "output queue closed, stopping shard");
                    stopped_early = true;
                    break;
                }
                Err(panic) => {
                    let err = DiscoveryError::fault(
                        self.id,
                        format!("{} while listing {}", panic_message(panic.as_ref()), descriptor.key),
                    );
                    tracing::warn!("{}", err);
                    self.stats.worker_fault();
                }
            }
        }

        tracing::debug!(worker = self.id, published = self.seen.len(), "shard worker finished");

        WorkerReport {
            worker: self.id,
            seen: self.seen,
            stopped_early,
        }
    }

    async fn process(&mut self, descriptor: &TypeDescriptor) -> Outcome {
        if self.exclusions.contains(&descriptor.key) {
            return Outcome::Excluded;
        }

        let token = match self.provider.type_token(descriptor) {
            Ok(token) => token,
            Err(err) => return Outcome::Unmappable(err),
        };

        if self.exclusions.contains(&token) {
            return Outcome::Excluded;
        }

        match self.list_type(descriptor, &token).await {
            Ok(true) => Outcome::Listed,
            Ok(false) => Outcome::QueueClosed,
            Err(err) => Outcome::Failed(err),
        }
    }

    /// Page through one type; `Ok(false)` when the queue has closed
    async fn list_type(
        &mut self,
        descriptor: &TypeDescriptor,
        token: &str,
    ) -> Result<bool, DiscoveryError> {
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .lister
                .list_page(descriptor, cursor.as_deref())
                .await
                .map_err(|source| DiscoveryError::ListingFailure {
                    type_token: token.to_string(),
                    source,
                })?;
            pages += 1;

            for item in &page.items {
                self.stats.item_listed();

                let listed = match self.provider.identify(descriptor, token, item) {
                    Ok(listed) => listed,
                    Err(err) => {
                        let fault = DiscoveryError::fault(
                            self.id,
                            format!("malformed {} item: {:#}", token, err),
                        );
                        tracing::warn!("{}", fault);
                        self.stats.worker_fault();
                        continue;
                    }
                };

                if !self
                    .seen
                    .insert((token.to_string(), listed.identity.clone()))
                {
                    self.stats.duplicate_skipped();
                    continue;
                }

                let parent = self.link_parent(listed.parent.as_deref());
                let name = self.provider.display_name(token, &listed.identity);
                let record = CanonicalRecord::new(token, &listed.identity, &name, parent);

                if self.tx.send(record).await.is_err() {
                    return Ok(false);
                }

                let total = self.stats.record_published();
                if total % PROGRESS_INTERVAL == 0 {
                    tracing::info!("Discovered {} resources so far", total);
                }
            }

            match page.next {
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    tracing::warn!(
                        worker = self.id,
                        type_token = token,
                        "listing cursor did not advance, stopping after {} pages",
                        pages
                    );
                    break;
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        tracing::debug!(worker = self.id, type_token = token, pages, "type listed");
        Ok(true)
    }

    /// Keep a derived parent only if the first pass published it
    fn link_parent(&self, derived: Option<&str>) -> Option<String> {
        let derived = derived?;
        let parents = self.parents.as_ref()?;
        let key = self.provider.parent_key(derived);
        match parents.resolve(&key) {
            Some(identity) => Some(identity.to_string()),
            None => {
                tracing::debug!(worker = self.id, parent = derived, "parent not published, dropping link");
                None
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic".to_string()
    }
}
