//! In-memory catalog adapter for tests and embedded deployments.

use super::domain::{ProviderLevel, Region, ServiceTask, SlaProfile, TaskCode};
use super::store::{CatalogStore, CatalogStoreError, CatalogStoreResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<CatalogState>>,
}

#[derive(Debug, Default)]
struct CatalogState {
    tasks: HashMap<TaskCode, ServiceTask>,
    regional_profiles: HashMap<(TaskCode, ProviderLevel, Region), SlaProfile>,
    default_profiles: HashMap<(TaskCode, ProviderLevel), SlaProfile>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a task entry.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogStoreError::Persistence`] when the catalog lock is
    /// poisoned.
    pub fn insert_task(&self, task: ServiceTask) -> CatalogStoreResult<()> {
        let mut state = lock_write(&self.state)?;
        state.tasks.insert(task.code().clone(), task);
        Ok(())
    }

    /// Inserts or replaces the default SLA profile for a task/level pair.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogStoreError::Persistence`] when the catalog lock is
    /// poisoned.
    pub fn insert_default_profile(
        &self,
        code: TaskCode,
        level: ProviderLevel,
        profile: SlaProfile,
    ) -> CatalogStoreResult<()> {
        let mut state = lock_write(&self.state)?;
        state.default_profiles.insert((code, level), profile);
        Ok(())
    }

    /// Inserts or replaces a regional SLA profile override.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogStoreError::Persistence`] when the catalog lock is
    /// poisoned.
    pub fn insert_regional_profile(
        &self,
        code: TaskCode,
        level: ProviderLevel,
        region: Region,
        profile: SlaProfile,
    ) -> CatalogStoreResult<()> {
        let mut state = lock_write(&self.state)?;
        state.regional_profiles.insert((code, level, region), profile);
        Ok(())
    }
}

fn lock_write(
    state: &Arc<RwLock<CatalogState>>,
) -> CatalogStoreResult<std::sync::RwLockWriteGuard<'_, CatalogState>> {
    state
        .write()
        .map_err(|err| CatalogStoreError::persistence(std::io::Error::other(err.to_string())))
}

fn lock_read(
    state: &Arc<RwLock<CatalogState>>,
) -> CatalogStoreResult<std::sync::RwLockReadGuard<'_, CatalogState>> {
    state
        .read()
        .map_err(|err| CatalogStoreError::persistence(std::io::Error::other(err.to_string())))
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn task(&self, code: &TaskCode) -> CatalogStoreResult<Option<ServiceTask>> {
        let state = lock_read(&self.state)?;
        Ok(state.tasks.get(code).cloned())
    }

    async fn sla_profile(
        &self,
        code: &TaskCode,
        level: ProviderLevel,
        region: &Region,
    ) -> CatalogStoreResult<Option<SlaProfile>> {
        let state = lock_read(&self.state)?;
        let regional = state
            .regional_profiles
            .get(&(code.clone(), level, region.clone()))
            .cloned();
        if regional.is_some() {
            return Ok(regional);
        }
        Ok(state.default_profiles.get(&(code.clone(), level)).cloned())
    }
}
