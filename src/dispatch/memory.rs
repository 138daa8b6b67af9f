//! In-memory provider directory for tests and embedded use.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::provider::{
    ProviderDirectory, ProviderDirectoryError, ProviderDirectoryResult, ProviderQuery,
    ProviderSnapshot, ProviderSummary,
};
use super::ranking::distance_meters;
use crate::job::domain::ProviderId;

#[derive(Debug, Clone)]
struct ProviderRecord {
    snapshot: ProviderSnapshot,
    name: String,
}

/// Provider directory backed by a shared hash map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProviderDirectory {
    providers: Arc<RwLock<HashMap<ProviderId, ProviderRecord>>>,
}

impl InMemoryProviderDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a provider.
    pub fn upsert(&self, snapshot: ProviderSnapshot, name: impl Into<String>) {
        if let Ok(mut providers) = self.providers.write() {
            providers.insert(
                snapshot.id,
                ProviderRecord {
                    snapshot,
                    name: name.into(),
                },
            );
        }
    }

    fn lock_read(
        &self,
    ) -> ProviderDirectoryResult<std::sync::RwLockReadGuard<'_, HashMap<ProviderId, ProviderRecord>>>
    {
        self.providers.read().map_err(|_| {
            ProviderDirectoryError::persistence(std::io::Error::other("directory lock poisoned"))
        })
    }
}

#[async_trait]
impl ProviderDirectory for InMemoryProviderDirectory {
    async fn candidates(
        &self,
        query: ProviderQuery,
    ) -> ProviderDirectoryResult<Vec<ProviderSnapshot>> {
        let providers = self.lock_read()?;
        Ok(providers
            .values()
            .filter(|record| {
                distance_meters(query.center, record.snapshot.location) <= query.radius_meters
            })
            .map(|record| record.snapshot.clone())
            .collect())
    }

    async fn summary(&self, id: ProviderId) -> ProviderDirectoryResult<Option<ProviderSummary>> {
        let providers = self.lock_read()?;
        Ok(providers.get(&id).map(|record| ProviderSummary {
            id: record.snapshot.id,
            name: record.name.clone(),
            level: record.snapshot.level,
            rating_milli: record.snapshot.rating_milli,
        }))
    }
}
