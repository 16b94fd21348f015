//! Aggregator
//!
//! The single consumer of the shared queue. Collapses duplicates that slipped
//! past the per-worker sets, appends records in arrival order, and runs the
//! per-record side effect of the current mode.

use crate::emit::{Importer, LiveHandle, Registrar};
use crate::error::DiscoveryError;
use crate::model::{CanonicalRecord, Inventory};
use futures::FutureExt;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;

/// Per-record side effect performed before the next record is taken
pub enum SideEffect {
    /// Export mode: records are only collected
    None,
    Register(Box<dyn Registrar>),
    Import(Box<dyn Importer>),
}

impl SideEffect {
    fn action(&self) -> &'static str {
        match self {
            SideEffect::None => "collect",
            SideEffect::Register(_) => "register",
            SideEffect::Import(_) => "import",
        }
    }
}

#[derive(Debug, Default)]
pub struct AggregateReport {
    pub inventory: Inventory,
    pub duplicates_collapsed: usize,
    pub side_effect_failures: usize,
}

pub struct Aggregator {
    inventory: Inventory,
    seen: HashSet<(String, String)>,
    side_effect: SideEffect,
    /// Live handles of registered records, by identity
    handles: HashMap<String, LiveHandle>,
    duplicates_collapsed: usize,
    side_effect_failures: usize,
}

impl Aggregator {
    pub fn new(side_effect: SideEffect) -> Self {
        Self {
            inventory: Inventory::new(),
            seen: HashSet::new(),
            side_effect,
            handles: HashMap::new(),
            duplicates_collapsed: 0,
            side_effect_failures: 0,
        }
    }

    /// Drain the queue until every sender is gone
    pub async fn run(mut self, mut rx: mpsc::Receiver<CanonicalRecord>) -> AggregateReport {
        while let Some(record) = rx.recv().await {
            self.accept(record).await;
        }

        tracing::debug!(
            records = self.inventory.len(),
            duplicates = self.duplicates_collapsed,
            "output queue drained"
        );

        AggregateReport {
            inventory: self.inventory,
            duplicates_collapsed: self.duplicates_collapsed,
            side_effect_failures: self.side_effect_failures,
        }
    }

    async fn accept(&mut self, record: CanonicalRecord) {
        if !self.seen.insert(record.key()) {
            tracing::debug!(
                type_token = %record.type_token,
                identity = %record.identity,
                "collapsing duplicate from another shard"
            );
            self.duplicates_collapsed += 1;
            return;
        }

        let applied = AssertUnwindSafe(self.apply_side_effect(&record))
            .catch_unwind()
            .await;
        match applied {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!("{}", err);
                self.side_effect_failures += 1;
            }
            Err(_) => {
                tracing::warn!(
                    "{} panicked for {}",
                    self.side_effect.action(),
                    record.identity
                );
                self.side_effect_failures += 1;
            }
        }

        self.inventory.push(record);
    }

    async fn apply_side_effect(&mut self, record: &CanonicalRecord) -> Result<(), DiscoveryError> {
        let action = self.side_effect.action();
        let result = match &mut self.side_effect {
            SideEffect::None => Ok(()),
            SideEffect::Register(registrar) => {
                let parent = record
                    .parent
                    .as_ref()
                    .and_then(|identity| self.handles.get(identity))
                    .cloned();
                let registered = registrar
                    .register(
                        &record.type_token,
                        &record.display_name,
                        &record.identity,
                        parent.as_ref(),
                    )
                    .await;
                registered.map(|handle| {
                    self.handles.insert(record.identity.clone(), handle);
                })
            }
            SideEffect::Import(importer) => {
                importer
                    .import(&record.type_token, &record.display_name, &record.identity)
                    .await
            }
        };

        result.map_err(|source| DiscoveryError::SideEffectFailure {
            action,
            identity: record.identity.clone(),
            source,
        })
    }
}
