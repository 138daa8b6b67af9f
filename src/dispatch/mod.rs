//! Provider matching and the offer protocol.
//!
//! Dispatch finds eligible providers for a pending-match job, ranks them
//! deterministically, and runs the offer/accept/decline/expire protocol
//! with a bounded re-offer budget. Candidate data comes from a read-only
//! provider directory owned elsewhere.

pub mod config;
mod memory;
pub mod provider;
pub mod ranking;
pub mod service;

pub use config::{DispatchConfig, RankingWeights};
pub use memory::InMemoryProviderDirectory;
pub use provider::{
    ProviderDirectory, ProviderDirectoryError, ProviderDirectoryResult, ProviderQuery,
    ProviderSnapshot, ProviderSummary,
};
pub use service::{DispatchError, DispatchResult, DispatchService};

#[cfg(test)]
mod tests;
