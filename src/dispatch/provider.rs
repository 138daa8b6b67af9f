//! Provider directory port and the read models it serves.
//!
//! The directory is owned by another subsystem; the dispatcher only reads
//! from it. Candidate queries are pre-filtered by geography, while
//! availability and qualification filtering stays in the dispatch service
//! where the rules live.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::catalog::ProviderLevel;
use crate::job::domain::{GeoPoint, ProviderId};
use crate::pricing::BasisPoints;

/// Result type for provider directory operations.
pub type ProviderDirectoryResult<T> = Result<T, ProviderDirectoryError>;

/// Point-in-time read model of one provider, as the directory knows them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSnapshot {
    /// Provider identifier.
    pub id: ProviderId,
    /// Qualification level on the closed 1..=4 scale.
    pub level: ProviderLevel,
    /// Whether the account is active (not suspended or offboarded).
    pub active: bool,
    /// Whether the provider is currently reachable for offers.
    pub online: bool,
    /// Whether the provider is on the emergency call-out rota.
    pub on_call: bool,
    /// Average rating in millistars, `0..=5000`.
    pub rating_milli: u32,
    /// Historical offer acceptance rate in basis points.
    pub acceptance_rate: BasisPoints,
    /// Last known location.
    pub location: GeoPoint,
}

/// Customer-facing summary of a provider, served by the status gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSummary {
    /// Provider identifier.
    pub id: ProviderId,
    /// Display name.
    pub name: String,
    /// Qualification level.
    pub level: ProviderLevel,
    /// Average rating in millistars.
    pub rating_milli: u32,
}

/// Geographic candidate query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderQuery {
    /// Centre of the search, normally the job's service location.
    pub center: GeoPoint,
    /// Search radius in metres.
    pub radius_meters: u32,
}

/// Read-only provider lookup contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    /// Returns all providers within the query radius, in no particular
    /// order. Availability and qualification are not filtered here.
    async fn candidates(
        &self,
        query: ProviderQuery,
    ) -> ProviderDirectoryResult<Vec<ProviderSnapshot>>;

    /// Returns the customer-facing summary for one provider.
    async fn summary(&self, id: ProviderId) -> ProviderDirectoryResult<Option<ProviderSummary>>;
}

/// Errors returned by provider directory implementations.
#[derive(Debug, Clone, Error)]
pub enum ProviderDirectoryError {
    /// Persistence-layer failure.
    #[error("provider directory error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ProviderDirectoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
