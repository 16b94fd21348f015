//! Discovery error taxonomy
//!
//! Everything except [`DiscoveryError::FatalSetup`] is recovered where it
//! happens and only ever surfaces as a warning plus a counter.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// A catalog entry has no canonical token
    #[error("cannot map type {descriptor}: {reason}")]
    UnmappableType { descriptor: String, reason: String },

    /// The native listing call for one type failed
    #[error("listing {type_token} failed: {source:#}")]
    ListingFailure {
        type_token: String,
        #[source]
        source: anyhow::Error,
    },

    /// Unexpected internal fault inside a shard worker
    #[error("worker {worker} fault: {message}")]
    WorkerFault { worker: usize, message: String },

    /// Register or import call failed for one record
    #[error("{action} failed for {identity}: {source:#}")]
    SideEffectFailure {
        action: &'static str,
        identity: String,
        #[source]
        source: anyhow::Error,
    },

    /// Catalog, credential or output failure; ends the run
    #[error("setup failed: {0:#}")]
    FatalSetup(#[source] anyhow::Error),
}

impl DiscoveryError {
    pub fn unmappable(descriptor: &str, reason: impl Into<String>) -> Self {
        Self::UnmappableType {
            descriptor: descriptor.to_string(),
            reason: reason.into(),
        }
    }

    pub fn fault(worker: usize, message: impl Into<String>) -> Self {
        Self::WorkerFault {
            worker,
            message: message.into(),
        }
    }

    /// Whether this error must end the run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalSetup(_))
    }
}

impl From<anyhow::Error> for DiscoveryError {
    fn from(err: anyhow::Error) -> Self {
        Self::FatalSetup(err)
    }
}
