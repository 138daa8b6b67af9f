//! Periodic sweep that detects and handles SLA deadline breaches.

use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use crate::job::domain::{
    Assignment, CancelledBy, Escalation, EscalationType, Job, JobDomainError, JobId, JobStatus,
    SlaDeadlineKind,
};
use crate::job::ports::notification::{LifecycleEvent, NotificationDispatcher};
use crate::job::ports::repository::{JobChange, JobRepository, JobRepositoryError};
use crate::pricing::{CancellationReason, Money};

/// Result type for monitor operations.
pub type SlaMonitorResult<T> = Result<T, SlaMonitorError>;

/// Errors returned by the SLA monitor.
#[derive(Debug, Error)]
pub enum SlaMonitorError {
    /// A domain rule rejected a breach action.
    #[error(transparent)]
    Domain(#[from] JobDomainError),

    /// Repository failure.
    #[error(transparent)]
    Repository(#[from] JobRepositoryError),
}

/// Monitor tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SlaMonitorConfig {
    /// Grace period past the arrival deadline before the breach is acted
    /// on; absorbs reporting lag from providers in transit.
    pub arrival_grace_minutes: u32,
}

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Jobs examined.
    pub examined: usize,
    /// Newly detected breaches, as (job, clock) pairs.
    pub breaches: Vec<(JobId, SlaDeadlineKind)>,
    /// Jobs cancelled by the sweep.
    pub cancelled: Vec<JobId>,
    /// Jobs skipped because another writer committed first; the next
    /// sweep re-examines them.
    pub skipped_stale: Vec<JobId>,
}

/// Sweeps active jobs for breached SLA clocks.
///
/// Each clock is evaluated at most once per assignment: the set-once met
/// flags make breach handling idempotent, so a breach acted on in one
/// sweep is invisible to the next. Writers that lose the commit race are
/// skipped rather than retried; the next sweep sees fresh state.
#[derive(Clone)]
pub struct SlaMonitor<R, N, C>
where
    R: JobRepository,
    N: NotificationDispatcher,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    notifier: Arc<N>,
    clock: Arc<C>,
    config: SlaMonitorConfig,
}

impl<R, N, C> SlaMonitor<R, N, C>
where
    R: JobRepository,
    N: NotificationDispatcher,
    C: Clock + Send + Sync,
{
    /// Creates a monitor.
    #[must_use]
    pub const fn new(
        repository: Arc<R>,
        notifier: Arc<N>,
        clock: Arc<C>,
        config: SlaMonitorConfig,
    ) -> Self {
        Self {
            repository,
            notifier,
            clock,
            config,
        }
    }

    /// Runs one sweep over all active jobs.
    ///
    /// # Errors
    ///
    /// Returns repository failures other than stale-state conflicts,
    /// which are counted in the report instead.
    pub async fn sweep(&self) -> SlaMonitorResult<SweepReport> {
        let now = self.clock.utc();
        let mut report = SweepReport::default();
        for job in self.repository.active_jobs().await? {
            report.examined = report.examined.saturating_add(1);
            let job_id = job.id();
            match self.examine(job, now, &mut report).await {
                Ok(()) => {}
                Err(SlaMonitorError::Repository(err)) if err.is_stale() => {
                    report.skipped_stale.push(job_id);
                }
                Err(err) => return Err(err),
            }
        }
        if !report.breaches.is_empty() {
            tracing::info!(
                examined = report.examined,
                breaches = report.breaches.len(),
                cancelled = report.cancelled.len(),
                "sweep detected breaches"
            );
        }
        Ok(report)
    }

    async fn examine(
        &self,
        job: Job,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> SlaMonitorResult<()> {
        let Some(snapshot) = self.repository.snapshot(job.id()).await? else {
            return Ok(());
        };
        match snapshot.active_assignment {
            Some(assignment) => {
                self.examine_assignment(snapshot.job, assignment, now, report)
                    .await
            }
            None => self.examine_unmatched(snapshot.job, now, report).await,
        }
    }

    /// Handles the job-level response clock while no offer is open: a
    /// confirmed job nobody accepted before the response deadline is
    /// escalated and cancelled.
    async fn examine_unmatched(
        &self,
        mut job: Job,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> SlaMonitorResult<()> {
        if job.status() != JobStatus::PendingMatch {
            return Ok(());
        }
        let (Some(confirmed_at), Some(sla)) = (job.confirmed_at(), job.sla()) else {
            return Ok(());
        };
        let deadline = sla.response_deadline(confirmed_at);
        if !due(now, deadline, confirmed_at) {
            return Ok(());
        }
        let job_id = job.id();
        let escalation = Escalation::new(
            job_id,
            EscalationType::SlaBreach,
            "no provider accepted before the response deadline",
            &*self.clock,
        );
        let cancelled = self.cancel_for_breach(&mut job)?;
        let mut change = JobChange::job_only(job);
        change = change.raising(escalation);
        self.repository.commit(change).await?;
        report.breaches.push((job_id, SlaDeadlineKind::Response));
        if cancelled {
            report.cancelled.push(job_id);
        }
        self.notify_breach(job_id, SlaDeadlineKind::Response, cancelled)
            .await;
        Ok(())
    }

    async fn examine_assignment(
        &self,
        mut job: Job,
        mut assignment: Assignment,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> SlaMonitorResult<()> {
        let job_id = job.id();
        if let Some(kind) = breached_clock(&assignment, now, self.config.arrival_grace_minutes) {
            match kind {
                SlaDeadlineKind::Response => {
                    // Expiring the offer records the unmet response flag.
                    assignment.expire(&*self.clock)?;
                }
                SlaDeadlineKind::Arrival | SlaDeadlineKind::Completion => {
                    if !assignment.mark_sla(kind, false) {
                        return Ok(());
                    }
                }
            }
            let escalation = Escalation::new(
                job_id,
                EscalationType::SlaBreach,
                format!("{kind} deadline breached"),
                &*self.clock,
            );
            // Completion overruns are escalated but the work is allowed
            // to finish. The same applies to a late arrival once the
            // provider has signalled en-route; only a silent provider
            // costs the job.
            let cancel = match kind {
                SlaDeadlineKind::Response => true,
                SlaDeadlineKind::Arrival => assignment.en_route_at().is_none(),
                SlaDeadlineKind::Completion => false,
            };
            let cancelled = if cancel {
                let was_cancelled = self.cancel_for_breach(&mut job)?;
                if was_cancelled && assignment.status().is_open() {
                    assignment.cancel(&*self.clock)?;
                }
                was_cancelled
            } else {
                false
            };
            self.repository
                .commit(JobChange::with_assignment(job, assignment).raising(escalation))
                .await?;
            report.breaches.push((job_id, kind));
            if cancelled {
                report.cancelled.push(job_id);
            }
            self.notify_breach(job_id, kind, cancelled).await;
        }
        Ok(())
    }

    /// Cancels a job for an SLA breach at zero fee.
    ///
    /// Returns `false` when the job is not in a cancellable state, in
    /// which case only the escalation is recorded.
    fn cancel_for_breach(&self, job: &mut Job) -> SlaMonitorResult<bool> {
        let Some(currency) = job.pricing().map(|p| p.quoted_price().currency()) else {
            return Ok(false);
        };
        if !job.status().is_cancellable() {
            return Ok(false);
        }
        job.cancel(
            CancelledBy::System,
            CancellationReason::SlaBreach,
            Money::zero(currency),
            &*self.clock,
        )?;
        Ok(true)
    }

    async fn notify_breach(&self, job_id: JobId, deadline: SlaDeadlineKind, cancelled: bool) {
        self.notifier
            .dispatch(LifecycleEvent::SlaBreached { job_id, deadline })
            .await;
        if cancelled {
            self.notifier
                .dispatch(LifecycleEvent::Cancelled {
                    job_id,
                    by: CancelledBy::System,
                })
                .await;
        }
    }
}

/// Returns the first breached, not-yet-evaluated clock on an assignment.
///
/// The skew guard (`now >= basis`) refuses to act when the sweep clock
/// reads earlier than the timestamp the deadline was computed from.
fn breached_clock(assignment: &Assignment, now: DateTime<Utc>, grace_minutes: u32) -> Option<SlaDeadlineKind> {
    for kind in [
        SlaDeadlineKind::Response,
        SlaDeadlineKind::Arrival,
        SlaDeadlineKind::Completion,
    ] {
        if assignment.sla_met(kind).is_some() {
            continue;
        }
        let (Some(deadline), Some(basis)) =
            (assignment.deadline(kind), assignment.deadline_basis(kind))
        else {
            continue;
        };
        let effective = if matches!(kind, SlaDeadlineKind::Arrival) {
            deadline + Duration::minutes(i64::from(grace_minutes))
        } else {
            deadline
        };
        if due(now, effective, basis) {
            return Some(kind);
        }
    }
    None
}

/// Skew-guarded due check: breached only when the sweep clock is past
/// both the deadline and its basis.
fn due(now: DateTime<Utc>, deadline: DateTime<Utc>, basis: DateTime<Utc>) -> bool {
    now >= deadline && now >= basis
}
