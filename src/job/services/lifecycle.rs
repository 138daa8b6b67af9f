//! Job lifecycle orchestration from draft to settlement.

use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

use crate::catalog::{CatalogError, CatalogStore, CatalogStoreError, ProviderLevel, TaskCode};
use crate::job::domain::{
    CancelledBy, EmergencyConsent, Escalation, EscalationType, Job, JobDomainError, JobId,
    NewJob, NoteTag, PhotoRef, SlaDeadlineKind, SlaSnapshot,
};
use crate::job::ports::notification::{LifecycleEvent, NotificationDispatcher};
use crate::job::ports::payment::{PaymentError, PaymentGateway};
use crate::job::ports::repository::{JobChange, JobRepository, JobRepositoryError, JobSnapshot};
use crate::pricing::{
    CancellationReason, CommissionRate, FeeSchedule, Money, PricingError, cancellation_fee, quote,
};

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, JobLifecycleError>;

/// Errors returned by the lifecycle service.
#[derive(Debug, Error)]
pub enum JobLifecycleError {
    /// The job was not found.
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// The job references a task missing from the catalog.
    #[error("unknown task code: {0}")]
    UnknownTask(TaskCode),

    /// No SLA profile applies to the task/level/region combination.
    #[error("no SLA profile for task '{code}' at {level} in region '{region}'")]
    MissingSlaProfile {
        /// Requested task code.
        code: TaskCode,
        /// Requested provider level.
        level: ProviderLevel,
        /// Requested region.
        region: String,
    },

    /// The operation needs an open assignment and the job has none.
    #[error("job {0} has no active assignment")]
    NoActiveAssignment(JobId),

    /// A domain rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] JobDomainError),

    /// Catalog value construction failure.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Pricing or fee computation failure.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Payment collaborator failure.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Repository failure, including optimistic-concurrency conflicts.
    #[error(transparent)]
    Repository(#[from] JobRepositoryError),

    /// Catalog store failure.
    #[error(transparent)]
    CatalogStore(#[from] CatalogStoreError),
}

impl JobLifecycleError {
    /// Returns whether the error is a retryable concurrency conflict.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::Repository(err) if err.is_stale())
    }
}

/// Orchestrates the customer- and provider-facing lifecycle operations.
///
/// Pricing and SLA terms are frozen into the job exactly once, at
/// confirmation; every later operation reads the snapshots and never the
/// live catalog.
#[derive(Clone)]
pub struct JobLifecycleService<R, S, P, N, C>
where
    R: JobRepository,
    S: CatalogStore,
    P: PaymentGateway,
    N: NotificationDispatcher,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    catalog: Arc<S>,
    payments: Arc<P>,
    notifier: Arc<N>,
    clock: Arc<C>,
    fees: FeeSchedule,
    commission_rate: CommissionRate,
}

impl<R, S, P, N, C> JobLifecycleService<R, S, P, N, C>
where
    R: JobRepository,
    S: CatalogStore,
    P: PaymentGateway,
    N: NotificationDispatcher,
    C: Clock + Send + Sync,
{
    /// Creates a lifecycle service.
    #[must_use]
    pub const fn new(
        repository: Arc<R>,
        catalog: Arc<S>,
        payments: Arc<P>,
        notifier: Arc<N>,
        clock: Arc<C>,
        fees: FeeSchedule,
        commission_rate: CommissionRate,
    ) -> Self {
        Self {
            repository,
            catalog,
            payments,
            notifier,
            clock,
            fees,
            commission_rate,
        }
    }

    /// Creates and stores a draft job.
    ///
    /// # Errors
    ///
    /// Returns [`JobLifecycleError::UnknownTask`] when the requested task
    /// code is not in the catalog, or a repository failure.
    pub async fn create_draft(&self, request: NewJob) -> LifecycleResult<Job> {
        let code = request.task_code.clone();
        if self.catalog.task(&code).await?.is_none() {
            return Err(JobLifecycleError::UnknownTask(code));
        }
        let job = Job::new_draft(request, &*self.clock);
        self.repository.create(&job).await?;
        tracing::info!(job_id = %job.id(), reference = %job.reference(), "draft created");
        Ok(job)
    }

    /// Confirms a draft: quotes the price, freezes the pricing and SLA
    /// snapshots, authorizes payment, and moves the job to pending match.
    ///
    /// Emergency jobs must carry a consent record for the emergency terms.
    ///
    /// # Errors
    ///
    /// Returns [`JobLifecycleError::MissingSlaProfile`] when no profile
    /// applies, [`JobDomainError::MissingConsent`] for an emergency job
    /// without consent, payment declines, or snapshot-frozen guards on a
    /// second confirmation.
    pub async fn confirm(
        &self,
        job_id: JobId,
        consent: Option<EmergencyConsent>,
    ) -> LifecycleResult<Job> {
        let mut job = self.load_job(job_id).await?;
        let task = self
            .catalog
            .task(job.task_code())
            .await?
            .ok_or_else(|| JobLifecycleError::UnknownTask(job.task_code().clone()))?;
        let level = if job.is_emergency() {
            ProviderLevel::EMERGENCY
        } else {
            task.required_level()
        };
        let region = crate::catalog::Region::new(job.location().address().city())?;
        let profile = self
            .catalog
            .sla_profile(job.task_code(), level, &region)
            .await?
            .ok_or_else(|| JobLifecycleError::MissingSlaProfile {
                code: job.task_code().clone(),
                level,
                region: region.as_str().to_owned(),
            })?;
        let pricing = quote(&task, job.is_emergency(), self.commission_rate)?;
        let payment = self
            .payments
            .authorize(job.id(), pricing.quoted_price())
            .await?;
        job.confirm(
            pricing,
            SlaSnapshot::from_profile(&profile),
            consent,
            payment,
            &*self.clock,
        )?;
        let stored = self.repository.commit(JobChange::job_only(job)).await?;
        tracing::info!(job_id = %stored.id(), "job confirmed");
        Ok(stored)
    }

    /// Records the provider leaving for the job.
    ///
    /// # Errors
    ///
    /// Returns [`JobLifecycleError::NoActiveAssignment`] when no open
    /// assignment exists, or progress-order domain guards.
    pub async fn record_en_route(&self, job_id: JobId) -> LifecycleResult<Job> {
        let (mut job, mut assignment) = self.load_active(job_id).await?;
        assignment.mark_en_route(&*self.clock)?;
        job.apply_assignment(&assignment, &*self.clock)?;
        let stored = self
            .repository
            .commit(JobChange::with_assignment(job, assignment))
            .await?;
        self.notifier
            .dispatch(LifecycleEvent::EnRoute { job_id })
            .await;
        Ok(stored)
    }

    /// Records arrival on site, evaluating the arrival SLA clock.
    ///
    /// A late arrival that newly breaches the clock raises an SLA-breach
    /// escalation in the same commit.
    ///
    /// # Errors
    ///
    /// Returns progress-order domain guards or repository failures.
    pub async fn record_arrival(&self, job_id: JobId) -> LifecycleResult<Job> {
        let (mut job, mut assignment) = self.load_active(job_id).await?;
        let evaluated_before = assignment.sla_met(SlaDeadlineKind::Arrival).is_some();
        assignment.mark_arrived(&*self.clock)?;
        let newly_breached = !evaluated_before
            && assignment.sla_met(SlaDeadlineKind::Arrival) == Some(false);
        job.apply_assignment(&assignment, &*self.clock)?;
        let mut change = JobChange::with_assignment(job, assignment);
        if newly_breached {
            change = change.raising(Escalation::new(
                job_id,
                EscalationType::SlaBreach,
                "provider arrived after the arrival deadline",
                &*self.clock,
            ));
        }
        let stored = self.repository.commit(change).await?;
        self.notifier
            .dispatch(LifecycleEvent::Arrived { job_id })
            .await;
        if newly_breached {
            self.notifier
                .dispatch(LifecycleEvent::SlaBreached {
                    job_id,
                    deadline: SlaDeadlineKind::Arrival,
                })
                .await;
        }
        Ok(stored)
    }

    /// Records the start of work, computing the completion deadline from
    /// the frozen SLA snapshot.
    ///
    /// # Errors
    ///
    /// Returns progress-order domain guards or repository failures.
    pub async fn record_started(&self, job_id: JobId) -> LifecycleResult<Job> {
        let (mut job, mut assignment) = self.load_active(job_id).await?;
        let sla = job
            .sla()
            .cloned()
            .ok_or(JobDomainError::MissingSla(job_id))?;
        assignment.mark_started(&sla, &*self.clock)?;
        job.apply_assignment(&assignment, &*self.clock)?;
        let stored = self
            .repository
            .commit(JobChange::with_assignment(job, assignment))
            .await?;
        Ok(stored)
    }

    /// Completes the job: finalizes pricing at the quoted price, captures
    /// payment, and evaluates the completion SLA clock.
    ///
    /// The catalog is flat-priced, so the final price is always the frozen
    /// quote. A completion past its deadline raises an SLA-breach
    /// escalation but never blocks settlement.
    ///
    /// # Errors
    ///
    /// Returns progress-order domain guards, payment capture failures, or
    /// repository failures.
    pub async fn complete(&self, job_id: JobId) -> LifecycleResult<Job> {
        let (mut job, mut assignment) = self.load_active(job_id).await?;
        let evaluated_before = assignment.sla_met(SlaDeadlineKind::Completion).is_some();
        assignment.complete(&*self.clock)?;
        let newly_breached = !evaluated_before
            && assignment.sla_met(SlaDeadlineKind::Completion) == Some(false);
        job.apply_assignment(&assignment, &*self.clock)?;
        let quoted = job
            .pricing()
            .map(|pricing| pricing.quoted_price())
            .ok_or(JobDomainError::MissingPricing(job_id))?;
        job.finalize_pricing(quoted)?;
        let payment = job
            .payment()
            .cloned()
            .ok_or(JobDomainError::MissingPricing(job_id))?;
        self.payments.capture(&payment).await?;
        let mut change = JobChange::with_assignment(job, assignment);
        if newly_breached {
            change = change.raising(Escalation::new(
                job_id,
                EscalationType::SlaBreach,
                "work completed after the completion deadline",
                &*self.clock,
            ));
        }
        let stored = self.repository.commit(change).await?;
        tracing::info!(job_id = %stored.id(), "job completed and captured");
        self.notifier
            .dispatch(LifecycleEvent::Completed { job_id })
            .await;
        if newly_breached {
            self.notifier
                .dispatch(LifecycleEvent::SlaBreached {
                    job_id,
                    deadline: SlaDeadlineKind::Completion,
                })
                .await;
        }
        Ok(stored)
    }

    /// Cancels the job, charging the phase-appropriate fee and releasing
    /// the remainder of any authorization.
    ///
    /// The fee comes from the configured schedule keyed by how far the
    /// active assignment had progressed, and is always strictly below the
    /// quoted price. Any open assignment is cancelled in the same commit.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidTransition`] when the job is no
    /// longer cancellable, or payment/repository failures.
    pub async fn cancel(
        &self,
        job_id: JobId,
        by: CancelledBy,
        reason: CancellationReason,
    ) -> LifecycleResult<Job> {
        let snapshot = self.load_snapshot(job_id).await?;
        let JobSnapshot {
            mut job,
            active_assignment,
        } = snapshot;
        let phase = job.cancellation_phase(active_assignment.as_ref());
        let fee = match job.pricing() {
            Some(pricing) => cancellation_fee(&self.fees, phase, pricing.quoted_price())?,
            None => Money::zero(self.fees.accepted_fee().currency()),
        };
        let refund = match job.pricing() {
            Some(pricing) if job.payment().is_some() => Some(
                pricing
                    .quoted_price()
                    .checked_sub(fee)
                    .map_err(PricingError::from)?,
            ),
            _ => None,
        };
        let payment = job.payment().cloned();
        job.cancel(by, reason, fee, &*self.clock)?;
        let change = match active_assignment {
            Some(mut assignment) => {
                assignment.cancel(&*self.clock)?;
                JobChange::with_assignment(job, assignment)
            }
            None => JobChange::job_only(job),
        };
        let stored = self.repository.commit(change).await?;
        if let (Some(payment), Some(remainder)) = (payment, refund)
            && !remainder.is_zero()
        {
            self.payments.refund(&payment, remainder).await?;
        }
        tracing::info!(job_id = %stored.id(), ?by, ?reason, fee = %fee, "job cancelled");
        self.notifier
            .dispatch(LifecycleEvent::Cancelled { job_id, by })
            .await;
        Ok(stored)
    }

    /// Opens a post-completion dispute.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidTransition`] when the job is not
    /// completed, or repository failures.
    pub async fn open_dispute(&self, job_id: JobId) -> LifecycleResult<Job> {
        let mut job = self.load_job(job_id).await?;
        job.open_dispute(&*self.clock)?;
        let stored = self.repository.commit(JobChange::job_only(job)).await?;
        Ok(stored)
    }

    /// Settles an open dispute with a full refund of the final price.
    ///
    /// Commission and payout bookkeeping is reversed without deleting
    /// history.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidTransition`] when no dispute is
    /// open, or payment/repository failures.
    pub async fn refund(&self, job_id: JobId) -> LifecycleResult<Job> {
        let mut job = self.load_job(job_id).await?;
        job.refund(&*self.clock)?;
        let refund_amount = job
            .pricing()
            .and_then(|pricing| pricing.final_price())
            .ok_or(JobDomainError::MissingPricing(job_id))?;
        let payment = job
            .payment()
            .cloned()
            .ok_or(JobDomainError::MissingPricing(job_id))?;
        self.payments.refund(&payment, refund_amount).await?;
        let stored = self.repository.commit(JobChange::job_only(job)).await?;
        tracing::info!(job_id = %stored.id(), amount = %refund_amount, "dispute refunded");
        Ok(stored)
    }

    /// Attaches a before-work photo reference.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::PhotoLimitExceeded`] past the attachment
    /// limit, or repository failures.
    pub async fn add_before_photo(&self, job_id: JobId, photo: PhotoRef) -> LifecycleResult<Job> {
        let mut job = self.load_job(job_id).await?;
        job.add_before_photo(photo, &*self.clock)?;
        Ok(self.repository.commit(JobChange::job_only(job)).await?)
    }

    /// Attaches an after-work photo reference.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::PhotoLimitExceeded`] past the attachment
    /// limit, or repository failures.
    pub async fn add_after_photo(&self, job_id: JobId, photo: PhotoRef) -> LifecycleResult<Job> {
        let mut job = self.load_job(job_id).await?;
        job.add_after_photo(photo, &*self.clock)?;
        Ok(self.repository.commit(JobChange::job_only(job)).await?)
    }

    /// Records a structured note tag on the job.
    ///
    /// # Errors
    ///
    /// Returns repository failures.
    pub async fn add_note(&self, job_id: JobId, tag: NoteTag) -> LifecycleResult<Job> {
        let mut job = self.load_job(job_id).await?;
        job.add_note(tag, &*self.clock);
        Ok(self.repository.commit(JobChange::job_only(job)).await?)
    }

    async fn load_job(&self, job_id: JobId) -> LifecycleResult<Job> {
        self.repository
            .find_by_id(job_id)
            .await?
            .ok_or(JobLifecycleError::JobNotFound(job_id))
    }

    async fn load_snapshot(&self, job_id: JobId) -> LifecycleResult<JobSnapshot> {
        self.repository
            .snapshot(job_id)
            .await?
            .ok_or(JobLifecycleError::JobNotFound(job_id))
    }

    async fn load_active(
        &self,
        job_id: JobId,
    ) -> LifecycleResult<(Job, crate::job::domain::Assignment)> {
        let snapshot = self.load_snapshot(job_id).await?;
        let assignment = snapshot
            .active_assignment
            .ok_or(JobLifecycleError::NoActiveAssignment(job_id))?;
        Ok((snapshot.job, assignment))
    }
}
