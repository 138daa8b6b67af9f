//! Read-side gateway: consistent job status views for polling clients.

use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::dispatch::{ProviderDirectory, ProviderDirectoryError, ProviderSummary};
use crate::job::domain::{Assignment, Escalation, Job, JobId, JobReference};
use crate::job::ports::repository::{JobRepository, JobRepositoryError};

/// Result type for view operations.
pub type ViewResult<T> = Result<T, JobViewError>;

/// Errors returned by the view service.
#[derive(Debug, Error)]
pub enum JobViewError {
    /// Repository failure.
    #[error(transparent)]
    Repository(#[from] JobRepositoryError),

    /// Provider directory failure.
    #[error(transparent)]
    Directory(#[from] ProviderDirectoryError),
}

/// One consistent poll response: the job, its single open assignment, the
/// assigned provider's summary, and the escalation trail.
///
/// Job and assignment are read under one repository transaction, so a
/// poller never observes a mix of pre- and post-transition fields.
/// Terminal jobs keep serving their final snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    /// The job as of the read.
    pub job: Job,
    /// The open assignment, if one exists.
    pub active_assignment: Option<Assignment>,
    /// Summary of the provider holding the assignment.
    pub provider: Option<ProviderSummary>,
    /// Minutes until the provider's expected arrival, computed at read
    /// time; `None` before acceptance or once the provider has arrived.
    pub computed_eta_minutes: Option<i64>,
    /// Escalations raised against the job, oldest first.
    pub escalations: Vec<Escalation>,
}

/// Serves status views to polling clients.
#[derive(Clone)]
pub struct JobViewService<R, D, C>
where
    R: JobRepository,
    D: ProviderDirectory,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    providers: Arc<D>,
    clock: Arc<C>,
}

impl<R, D, C> JobViewService<R, D, C>
where
    R: JobRepository,
    D: ProviderDirectory,
    C: Clock + Send + Sync,
{
    /// Creates a view service.
    #[must_use]
    pub const fn new(repository: Arc<R>, providers: Arc<D>, clock: Arc<C>) -> Self {
        Self {
            repository,
            providers,
            clock,
        }
    }

    /// Returns the view for a job identifier, or `None` when unknown.
    ///
    /// # Errors
    ///
    /// Returns repository or directory failures.
    pub async fn by_id(&self, job_id: JobId) -> ViewResult<Option<JobView>> {
        let Some(snapshot) = self.repository.snapshot(job_id).await? else {
            return Ok(None);
        };
        let provider = match snapshot.active_assignment.as_ref() {
            Some(assignment) => self.providers.summary(assignment.provider_id()).await?,
            None => None,
        };
        let computed_eta_minutes = snapshot
            .active_assignment
            .as_ref()
            .and_then(|assignment| eta_minutes(assignment, self.clock.utc()));
        let escalations = self.repository.escalations_for_job(job_id).await?;
        Ok(Some(JobView {
            job: snapshot.job,
            active_assignment: snapshot.active_assignment,
            provider,
            computed_eta_minutes,
            escalations,
        }))
    }

    /// Returns the view for a human-readable job reference.
    ///
    /// # Errors
    ///
    /// Returns repository or directory failures.
    pub async fn by_reference(&self, reference: &JobReference) -> ViewResult<Option<JobView>> {
        let Some(job) = self.repository.find_by_reference(reference).await? else {
            return Ok(None);
        };
        self.by_id(job.id()).await
    }
}

/// Minutes remaining until the arrival estimate given at acceptance,
/// floored at zero for an overdue provider.
fn eta_minutes(assignment: &Assignment, now: DateTime<Utc>) -> Option<i64> {
    if assignment.arrived_at().is_some() {
        return None;
    }
    let responded_at = assignment.responded_at()?;
    let estimate = i64::from(assignment.estimated_arrival_minutes()?);
    let expected = responded_at + Duration::minutes(estimate);
    Some((expected - now).num_minutes().max(0))
}
