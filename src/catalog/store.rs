//! Read-only store port for catalog and SLA profile lookups.

use super::domain::{ProviderLevel, Region, ServiceTask, SlaProfile, TaskCode};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for catalog store operations.
pub type CatalogStoreResult<T> = Result<T, CatalogStoreError>;

/// Read-only catalog lookup contract.
///
/// The engine never writes through this port.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Looks up a task by its closed-catalog code.
    ///
    /// Returns `None` when the code is not in the catalog.
    async fn task(&self, code: &TaskCode) -> CatalogStoreResult<Option<ServiceTask>>;

    /// Looks up the SLA profile for a task/level/region combination.
    ///
    /// Implementations fall back from an exact `(code, level, region)`
    /// match to the `(code, level)` default when no regional override
    /// exists. Returns `None` when no profile applies.
    async fn sla_profile(
        &self,
        code: &TaskCode,
        level: ProviderLevel,
        region: &Region,
    ) -> CatalogStoreResult<Option<SlaProfile>>;
}

/// Errors returned by catalog store implementations.
#[derive(Debug, Clone, Error)]
pub enum CatalogStoreError {
    /// Persistence-layer failure.
    #[error("catalog store error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl CatalogStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
