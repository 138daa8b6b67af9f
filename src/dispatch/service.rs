//! Offer protocol: matching, acceptance, decline, expiry, re-offers.

use mockable::Clock;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use super::config::DispatchConfig;
use super::provider::{ProviderDirectory, ProviderDirectoryError, ProviderQuery, ProviderSnapshot};
use super::ranking;
use crate::catalog::{CatalogStore, CatalogStoreError, ProviderLevel, TaskCode};
use crate::job::domain::{
    Assignment, AssignmentId, CancelledBy, DeclineReason, Escalation, EscalationType, GeoPoint,
    Job, JobDomainError, JobId, JobStatus,
};
use crate::job::ports::notification::{LifecycleEvent, NotificationDispatcher};
use crate::job::ports::repository::{JobChange, JobRepository, JobRepositoryError};
use crate::pricing::{CancellationReason, Money};
use thiserror::Error;

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors returned by the dispatch service.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The job was not found.
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// The assignment was not found.
    #[error("assignment not found: {0}")]
    AssignmentNotFound(AssignmentId),

    /// The job is not in a dispatchable state.
    #[error("job {job_id} is not dispatchable from status {status}")]
    JobNotDispatchable {
        /// The affected job.
        job_id: JobId,
        /// Its current status.
        status: JobStatus,
    },

    /// The job references a task missing from the catalog.
    #[error("unknown task code: {0}")]
    UnknownTask(TaskCode),

    /// No eligible provider was found within the search radius.
    #[error("no eligible provider for job {0}")]
    NoEligibleProvider(JobId),

    /// A domain rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] JobDomainError),

    /// Repository failure, including optimistic-concurrency conflicts.
    #[error(transparent)]
    Repository(#[from] JobRepositoryError),

    /// Catalog lookup failure.
    #[error(transparent)]
    Catalog(#[from] CatalogStoreError),

    /// Provider directory failure.
    #[error(transparent)]
    Directory(#[from] ProviderDirectoryError),
}

impl DispatchError {
    /// Returns whether the error is a retryable concurrency conflict.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::Repository(err) if err.is_stale())
    }
}

/// Matches jobs to providers and runs the offer protocol.
///
/// Exactly one assignment is open per job at any time; every mutation
/// funnels through the version-guarded repository commit, so concurrent
/// responses to the same offer resolve with one winner and one
/// [`JobRepositoryError::StaleState`] loser.
#[derive(Clone)]
pub struct DispatchService<R, S, D, N, C>
where
    R: JobRepository,
    S: CatalogStore,
    D: ProviderDirectory,
    N: NotificationDispatcher,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    catalog: Arc<S>,
    providers: Arc<D>,
    notifier: Arc<N>,
    clock: Arc<C>,
    config: DispatchConfig,
}

impl<R, S, D, N, C> DispatchService<R, S, D, N, C>
where
    R: JobRepository,
    S: CatalogStore,
    D: ProviderDirectory,
    N: NotificationDispatcher,
    C: Clock + Send + Sync,
{
    /// Creates a dispatch service.
    #[must_use]
    pub const fn new(
        repository: Arc<R>,
        catalog: Arc<S>,
        providers: Arc<D>,
        notifier: Arc<N>,
        clock: Arc<C>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            repository,
            catalog,
            providers,
            notifier,
            clock,
            config,
        }
    }

    /// Dispatches a pending-match job to the best eligible provider.
    ///
    /// Creates an open offer, moves the job to matched, and notifies the
    /// provider. The candidate search is bounded by the configured
    /// timeout; running out of time counts as finding nobody.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::NoEligibleProvider`] when no provider
    /// passes the eligibility filter, [`DispatchError::JobNotDispatchable`]
    /// when the job is not pending match, or lookup/commit failures.
    pub async fn dispatch(&self, job_id: JobId) -> DispatchResult<Assignment> {
        let job = self.load_job(job_id).await?;
        if job.status() != JobStatus::PendingMatch {
            return Err(DispatchError::JobNotDispatchable {
                job_id,
                status: job.status(),
            });
        }
        self.offer_to_best(job).await
    }

    /// Records a provider accepting their open offer.
    ///
    /// The acceptance wins or loses the commit race atomically: of two
    /// concurrent responses to the same offer, exactly one commit
    /// succeeds and the other observes a stale-state conflict.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::OfferExpired`] past the offer's hard
    /// expiry, a stale-state repository error when another writer won, or
    /// domain guards when the offer is no longer open.
    pub async fn accept_offer(
        &self,
        assignment_id: AssignmentId,
        provider_location: GeoPoint,
        estimated_arrival_minutes: u32,
    ) -> DispatchResult<Assignment> {
        let mut assignment = self.load_assignment(assignment_id).await?;
        let mut job = self.load_job(assignment.job_id()).await?;
        let sla = job
            .sla()
            .cloned()
            .ok_or(JobDomainError::MissingSla(job.id()))?;
        assignment.accept(
            provider_location,
            estimated_arrival_minutes,
            &sla,
            &*self.clock,
        )?;
        job.apply_assignment(&assignment, &*self.clock)?;
        self.repository
            .commit(JobChange::with_assignment(job, assignment.clone()))
            .await?;
        tracing::info!(
            job_id = %assignment.job_id(),
            provider_id = %assignment.provider_id(),
            "offer accepted"
        );
        self.notifier
            .dispatch(LifecycleEvent::Accepted {
                job_id: assignment.job_id(),
                provider_id: assignment.provider_id(),
            })
            .await;
        Ok(assignment)
    }

    /// Records a provider declining their open offer and re-dispatches.
    ///
    /// Returns the replacement offer, or `None` when the re-offer budget
    /// is exhausted (the job is then escalated and cancelled) or no
    /// further candidate exists.
    ///
    /// # Errors
    ///
    /// Returns domain guards when the offer is not open, or repository
    /// failures.
    pub async fn decline_offer(
        &self,
        assignment_id: AssignmentId,
        reason: DeclineReason,
    ) -> DispatchResult<Option<Assignment>> {
        let mut assignment = self.load_assignment(assignment_id).await?;
        let mut job = self.load_job(assignment.job_id()).await?;
        assignment.decline(reason, &*self.clock)?;
        job.apply_assignment(&assignment, &*self.clock)?;
        let stored = self
            .repository
            .commit(JobChange::with_assignment(job, assignment))
            .await?;
        tracing::info!(job_id = %stored.id(), ?reason, "offer declined");
        self.try_reoffer(stored).await
    }

    /// Expires an open offer past its hard expiry and re-dispatches.
    ///
    /// The response SLA clock is marked unmet on the expiring assignment.
    /// Returns the replacement offer, or `None` as for
    /// [`DispatchService::decline_offer`].
    ///
    /// # Errors
    ///
    /// Returns domain guards when the offer is not open, or repository
    /// failures.
    pub async fn expire_offer(
        &self,
        assignment_id: AssignmentId,
    ) -> DispatchResult<Option<Assignment>> {
        let mut assignment = self.load_assignment(assignment_id).await?;
        let mut job = self.load_job(assignment.job_id()).await?;
        assignment.expire(&*self.clock)?;
        job.apply_assignment(&assignment, &*self.clock)?;
        let stored = self
            .repository
            .commit(JobChange::with_assignment(job, assignment))
            .await?;
        tracing::info!(job_id = %stored.id(), "offer expired");
        self.try_reoffer(stored).await
    }

    async fn try_reoffer(&self, mut job: Job) -> DispatchResult<Option<Assignment>> {
        if job.reoffer_count() >= self.config.max_reoffers {
            self.exhaust(job).await?;
            return Ok(None);
        }
        job.record_reoffer(&*self.clock);
        match self.offer_to_best(job).await {
            Ok(assignment) => Ok(Some(assignment)),
            Err(DispatchError::NoEligibleProvider(job_id)) => {
                let fresh = self.load_job(job_id).await?;
                self.exhaust(fresh).await?;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn offer_to_best(&self, mut job: Job) -> DispatchResult<Assignment> {
        let sla = job
            .sla()
            .cloned()
            .ok_or(JobDomainError::MissingSla(job.id()))?;
        let task = self
            .catalog
            .task(job.task_code())
            .await?
            .ok_or_else(|| DispatchError::UnknownTask(job.task_code().clone()))?;
        let required_level = if job.is_emergency() {
            ProviderLevel::EMERGENCY
        } else {
            task.required_level()
        };
        let query = ProviderQuery {
            center: job.location().point(),
            radius_meters: self.config.radius_for(job.priority()),
        };
        let candidates = self.search_candidates(job.id(), query).await?;
        let eligible = self.filter_eligible(&job, required_level, candidates).await?;
        let ranked = ranking::rank(eligible, query.center, &self.config.weights);
        let Some(best) = ranked.into_iter().next() else {
            return Err(DispatchError::NoEligibleProvider(job.id()));
        };
        let assignment = Assignment::offer(
            job.id(),
            best.snapshot.id,
            best.score,
            self.config.offer_window(job.is_emergency()),
            &sla,
            &*self.clock,
        );
        job.transition_to(JobStatus::Matched, &*self.clock)?;
        self.repository
            .commit(JobChange::with_assignment(job, assignment.clone()))
            .await?;
        tracing::info!(
            job_id = %assignment.job_id(),
            provider_id = %assignment.provider_id(),
            score = assignment.match_score().value(),
            eta_minutes = best.eta_minutes,
            "offer created"
        );
        self.notifier
            .dispatch(LifecycleEvent::Matched {
                job_id: assignment.job_id(),
                provider_id: assignment.provider_id(),
            })
            .await;
        Ok(assignment)
    }

    /// Runs the directory query under the configured search budget.
    async fn search_candidates(
        &self,
        job_id: JobId,
        query: ProviderQuery,
    ) -> DispatchResult<Vec<ProviderSnapshot>> {
        let budget = StdDuration::from_millis(self.config.search_timeout_ms);
        match tokio::time::timeout(budget, self.providers.candidates(query)).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                tracing::warn!(%job_id, "candidate search timed out");
                Ok(Vec::new())
            }
        }
    }

    async fn filter_eligible(
        &self,
        job: &Job,
        required_level: ProviderLevel,
        candidates: Vec<ProviderSnapshot>,
    ) -> DispatchResult<Vec<ProviderSnapshot>> {
        let prior: HashSet<_> = self
            .repository
            .assignments_for_job(job.id())
            .await?
            .into_iter()
            .map(|assignment| assignment.provider_id())
            .collect();
        let mut eligible = Vec::new();
        for candidate in candidates {
            if !candidate.active || !candidate.online {
                continue;
            }
            if candidate.level < required_level {
                continue;
            }
            if job.is_emergency() && !(candidate.level.is_emergency_tier() && candidate.on_call) {
                continue;
            }
            if prior.contains(&candidate.id) {
                continue;
            }
            let open = self
                .repository
                .open_assignments_for_provider(candidate.id)
                .await?;
            if open.is_empty() {
                eligible.push(candidate);
            }
        }
        Ok(eligible)
    }

    /// Handles re-offer exhaustion: escalates the job as having no
    /// provider available and cancels it at zero fee.
    async fn exhaust(&self, mut job: Job) -> DispatchResult<()> {
        let job_id = job.id();
        let currency = job
            .pricing()
            .map(|pricing| pricing.quoted_price().currency())
            .ok_or(JobDomainError::MissingPricing(job_id))?;
        let escalation = Escalation::new(
            job_id,
            EscalationType::NoProviderAvailable,
            "re-offer budget exhausted with no eligible provider",
            &*self.clock,
        );
        job.cancel(
            CancelledBy::System,
            CancellationReason::NoProviderAvailable,
            Money::zero(currency),
            &*self.clock,
        )?;
        self.repository
            .commit(JobChange::job_only(job).raising(escalation))
            .await?;
        tracing::warn!(%job_id, "dispatch exhausted, job cancelled");
        self.notifier
            .dispatch(LifecycleEvent::NoProviderAvailable { job_id })
            .await;
        self.notifier
            .dispatch(LifecycleEvent::Cancelled {
                job_id,
                by: CancelledBy::System,
            })
            .await;
        Ok(())
    }

    async fn load_job(&self, job_id: JobId) -> DispatchResult<Job> {
        self.repository
            .find_by_id(job_id)
            .await?
            .ok_or(DispatchError::JobNotFound(job_id))
    }

    async fn load_assignment(&self, assignment_id: AssignmentId) -> DispatchResult<Assignment> {
        self.repository
            .find_assignment(assignment_id)
            .await?
            .ok_or(DispatchError::AssignmentNotFound(assignment_id))
    }
}
