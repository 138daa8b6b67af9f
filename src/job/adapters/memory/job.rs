//! In-memory job repository with version-guarded commits.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::job::domain::{
    Assignment, AssignmentId, Escalation, EscalationId, Job, JobId, JobReference, ProviderId,
};
use crate::job::ports::repository::{
    JobChange, JobRepository, JobRepositoryError, JobRepositoryResult, JobSnapshot,
};

/// Thread-safe in-memory job repository.
///
/// Mutations after creation go through [`JobRepository::commit`], which
/// compares the stored job version under the write lock so two racing
/// writers resolve to exactly one winner and one `StaleState` loser.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobRepository {
    state: Arc<RwLock<InMemoryJobState>>,
}

#[derive(Debug, Default)]
struct InMemoryJobState {
    jobs: HashMap<JobId, Job>,
    reference_index: HashMap<String, JobId>,
    assignments: HashMap<AssignmentId, Assignment>,
    job_assignments: HashMap<JobId, Vec<AssignmentId>>,
    escalations: HashMap<EscalationId, Escalation>,
    job_escalations: HashMap<JobId, Vec<EscalationId>>,
}

impl InMemoryJobRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_write(
    state: &Arc<RwLock<InMemoryJobState>>,
) -> JobRepositoryResult<std::sync::RwLockWriteGuard<'_, InMemoryJobState>> {
    state
        .write()
        .map_err(|err| JobRepositoryError::persistence(std::io::Error::other(err.to_string())))
}

fn lock_read(
    state: &Arc<RwLock<InMemoryJobState>>,
) -> JobRepositoryResult<std::sync::RwLockReadGuard<'_, InMemoryJobState>> {
    state
        .read()
        .map_err(|err| JobRepositoryError::persistence(std::io::Error::other(err.to_string())))
}

fn open_assignment_of(state: &InMemoryJobState, job_id: JobId) -> Option<&Assignment> {
    state
        .job_assignments
        .get(&job_id)
        .into_iter()
        .flatten()
        .filter_map(|id| state.assignments.get(id))
        .find(|assignment| assignment.status().is_open())
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create(&self, job: &Job) -> JobRepositoryResult<()> {
        let mut state = lock_write(&self.state)?;
        if state.jobs.contains_key(&job.id()) {
            return Err(JobRepositoryError::DuplicateJob(job.id()));
        }
        state
            .reference_index
            .insert(job.reference().as_str().to_owned(), job.id());
        state.jobs.insert(job.id(), job.clone());
        Ok(())
    }

    async fn commit(&self, change: JobChange) -> JobRepositoryResult<Job> {
        let mut state = lock_write(&self.state)?;
        let stored_version = state
            .jobs
            .get(&change.job.id())
            .ok_or(JobRepositoryError::NotFound(change.job.id()))?
            .version();

        if stored_version != change.job.version() {
            return Err(JobRepositoryError::StaleState {
                job_id: change.job.id(),
                expected: change.job.version(),
                stored: stored_version,
            });
        }

        // The one-open-assignment invariant is enforced at the same
        // commit point every writer races through.
        if let Some(assignment) = &change.assignment
            && assignment.status().is_open()
            && let Some(open) = open_assignment_of(&state, change.job.id())
            && open.id() != assignment.id()
        {
            return Err(JobRepositoryError::OpenAssignmentExists(change.job.id()));
        }

        let mut job = change.job;
        job.bump_version();

        if let Some(assignment) = change.assignment {
            state
                .job_assignments
                .entry(job.id())
                .or_default()
                .retain(|id| *id != assignment.id());
            state
                .job_assignments
                .entry(job.id())
                .or_default()
                .push(assignment.id());
            state.assignments.insert(assignment.id(), assignment);
        }
        for escalation in change.escalations {
            state
                .job_escalations
                .entry(job.id())
                .or_default()
                .push(escalation.id());
            state.escalations.insert(escalation.id(), escalation);
        }
        state.jobs.insert(job.id(), job.clone());
        Ok(job)
    }

    async fn find_by_id(&self, id: JobId) -> JobRepositoryResult<Option<Job>> {
        let state = lock_read(&self.state)?;
        Ok(state.jobs.get(&id).cloned())
    }

    async fn find_by_reference(
        &self,
        reference: &JobReference,
    ) -> JobRepositoryResult<Option<Job>> {
        let state = lock_read(&self.state)?;
        let job = state
            .reference_index
            .get(reference.as_str())
            .and_then(|id| state.jobs.get(id))
            .cloned();
        Ok(job)
    }

    async fn active_jobs(&self) -> JobRepositoryResult<Vec<Job>> {
        let state = lock_read(&self.state)?;
        let mut jobs: Vec<Job> = state
            .jobs
            .values()
            .filter(|job| !job.status().is_terminal())
            .cloned()
            .collect();
        jobs.sort_by_key(Job::id);
        Ok(jobs)
    }

    async fn active_assignment(
        &self,
        job_id: JobId,
    ) -> JobRepositoryResult<Option<Assignment>> {
        let state = lock_read(&self.state)?;
        Ok(open_assignment_of(&state, job_id).cloned())
    }

    async fn assignments_for_job(
        &self,
        job_id: JobId,
    ) -> JobRepositoryResult<Vec<Assignment>> {
        let state = lock_read(&self.state)?;
        let assignments = state
            .job_assignments
            .get(&job_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.assignments.get(id))
            .cloned()
            .collect();
        Ok(assignments)
    }

    async fn open_assignments_for_provider(
        &self,
        provider_id: ProviderId,
    ) -> JobRepositoryResult<Vec<Assignment>> {
        let state = lock_read(&self.state)?;
        let mut assignments: Vec<Assignment> = state
            .assignments
            .values()
            .filter(|assignment| {
                assignment.provider_id() == provider_id && assignment.status().is_open()
            })
            .cloned()
            .collect();
        assignments.sort_by_key(Assignment::id);
        Ok(assignments)
    }

    async fn find_assignment(
        &self,
        id: AssignmentId,
    ) -> JobRepositoryResult<Option<Assignment>> {
        let state = lock_read(&self.state)?;
        Ok(state.assignments.get(&id).cloned())
    }

    async fn escalations_for_job(
        &self,
        job_id: JobId,
    ) -> JobRepositoryResult<Vec<Escalation>> {
        let state = lock_read(&self.state)?;
        let escalations = state
            .job_escalations
            .get(&job_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.escalations.get(id))
            .cloned()
            .collect();
        Ok(escalations)
    }

    async fn update_escalation(&self, escalation: &Escalation) -> JobRepositoryResult<()> {
        let mut state = lock_write(&self.state)?;
        if !state.escalations.contains_key(&escalation.id()) {
            return Err(JobRepositoryError::EscalationNotFound(escalation.id()));
        }
        state.escalations.insert(escalation.id(), escalation.clone());
        Ok(())
    }

    async fn snapshot(&self, job_id: JobId) -> JobRepositoryResult<Option<JobSnapshot>> {
        // One lock acquisition covers both reads, so the composite is a
        // single consistent version.
        let state = lock_read(&self.state)?;
        let Some(job) = state.jobs.get(&job_id).cloned() else {
            return Ok(None);
        };
        let active_assignment = open_assignment_of(&state, job_id).cloned();
        Ok(Some(JobSnapshot {
            job,
            active_assignment,
        }))
    }
}
