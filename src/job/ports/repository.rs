//! Repository port for transactional job/assignment/escalation
//! persistence.

use crate::job::domain::{
    Assignment, AssignmentId, Escalation, EscalationId, Job, JobId, JobReference, ProviderId,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for job repository operations.
pub type JobRepositoryResult<T> = Result<T, JobRepositoryError>;

/// One atomic mutation of a job and its satellite records.
///
/// Everything in a change commits together or not at all: the job row
/// (guarded by its optimistic-concurrency version), at most one touched
/// assignment, and any newly raised escalations.
#[derive(Debug, Clone)]
pub struct JobChange {
    /// The mutated job, carrying the version it was loaded at.
    pub job: Job,
    /// The touched assignment, if the mutation involved one.
    pub assignment: Option<Assignment>,
    /// Escalations raised by this mutation.
    pub escalations: Vec<Escalation>,
}

impl JobChange {
    /// Creates a job-only change.
    #[must_use]
    pub const fn job_only(job: Job) -> Self {
        Self {
            job,
            assignment: None,
            escalations: Vec::new(),
        }
    }

    /// Creates a change touching one assignment.
    #[must_use]
    pub const fn with_assignment(job: Job, assignment: Assignment) -> Self {
        Self {
            job,
            assignment: Some(assignment),
            escalations: Vec::new(),
        }
    }

    /// Adds a raised escalation to the change.
    #[must_use]
    pub fn raising(mut self, escalation: Escalation) -> Self {
        self.escalations.push(escalation);
        self
    }
}

/// A consistent composite read of a job and its active assignment.
///
/// Both records are read under one repository transaction so a poller
/// never observes a mix of pre- and post-transition fields.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    /// The job as of the read.
    pub job: Job,
    /// The single open assignment, if one exists.
    pub active_assignment: Option<Assignment>,
}

/// Job persistence contract.
///
/// The version-guarded [`JobRepository::commit`] is the only mutation
/// path after creation; all writers (accept, decline, expire, cancel,
/// sweep) race through it and exactly one of two concurrent attempts
/// wins.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Stores a new draft job.
    ///
    /// # Errors
    ///
    /// Returns [`JobRepositoryError::DuplicateJob`] when the identifier
    /// already exists.
    async fn create(&self, job: &Job) -> JobRepositoryResult<()>;

    /// Atomically commits a mutation under optimistic concurrency.
    ///
    /// Returns the stored job with its bumped version.
    ///
    /// # Errors
    ///
    /// Returns [`JobRepositoryError::StaleState`] when the job's version
    /// no longer matches the stored version (the caller must re-fetch and
    /// retry), [`JobRepositoryError::OpenAssignmentExists`] when the
    /// change would create a second open assignment, or
    /// [`JobRepositoryError::NotFound`] when the job does not exist.
    async fn commit(&self, change: JobChange) -> JobRepositoryResult<Job>;

    /// Finds a job by identifier.
    async fn find_by_id(&self, id: JobId) -> JobRepositoryResult<Option<Job>>;

    /// Finds a job by its human-readable reference.
    async fn find_by_reference(
        &self,
        reference: &JobReference,
    ) -> JobRepositoryResult<Option<Job>>;

    /// Returns all jobs in a non-terminal state, for the SLA sweep.
    async fn active_jobs(&self) -> JobRepositoryResult<Vec<Job>>;

    /// Returns the single open assignment for a job, if any.
    async fn active_assignment(&self, job_id: JobId) -> JobRepositoryResult<Option<Assignment>>;

    /// Returns all assignments ever created for a job, oldest first.
    async fn assignments_for_job(&self, job_id: JobId) -> JobRepositoryResult<Vec<Assignment>>;

    /// Returns a provider's open assignments across all jobs.
    async fn open_assignments_for_provider(
        &self,
        provider_id: ProviderId,
    ) -> JobRepositoryResult<Vec<Assignment>>;

    /// Finds an assignment by identifier.
    async fn find_assignment(
        &self,
        id: AssignmentId,
    ) -> JobRepositoryResult<Option<Assignment>>;

    /// Returns all escalations for a job, oldest first.
    async fn escalations_for_job(&self, job_id: JobId) -> JobRepositoryResult<Vec<Escalation>>;

    /// Persists a resolution update to an existing escalation.
    ///
    /// # Errors
    ///
    /// Returns [`JobRepositoryError::EscalationNotFound`] when the record
    /// does not exist.
    async fn update_escalation(&self, escalation: &Escalation) -> JobRepositoryResult<()>;

    /// Reads a consistent job + active assignment composite.
    async fn snapshot(&self, job_id: JobId) -> JobRepositoryResult<Option<JobSnapshot>>;
}

/// Errors returned by job repository implementations.
#[derive(Debug, Clone, Error)]
pub enum JobRepositoryError {
    /// A job with the same identifier already exists.
    #[error("duplicate job identifier: {0}")]
    DuplicateJob(JobId),

    /// The job was not found.
    #[error("job not found: {0}")]
    NotFound(JobId),

    /// The assignment was not found.
    #[error("assignment not found: {0}")]
    AssignmentNotFound(AssignmentId),

    /// The escalation was not found.
    #[error("escalation not found: {0}")]
    EscalationNotFound(EscalationId),

    /// Optimistic-concurrency conflict: another writer committed first.
    /// Retryable; re-fetch the job and try again.
    #[error("stale state for job {job_id}: expected version {expected}, stored {stored}")]
    StaleState {
        /// Job that was contended.
        job_id: JobId,
        /// Version the losing writer held.
        expected: u64,
        /// Version actually stored.
        stored: u64,
    },

    /// The change would violate the one-open-assignment invariant.
    #[error("job {0} already has an open assignment")]
    OpenAssignmentExists(JobId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl JobRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Returns whether the error is a retryable concurrency conflict.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::StaleState { .. })
    }
}
