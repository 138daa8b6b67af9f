//! Error types for job domain validation and state transitions.

use super::assignment::AssignmentStatus;
use super::ids::{AssignmentId, EscalationId, JobId};
use super::status::JobStatus;
use crate::pricing::PricingError;
use thiserror::Error;

/// Errors returned while constructing or mutating job domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobDomainError {
    /// The requested job state change is not in the legal transition
    /// table. Fatal to the request; never retried.
    #[error("invalid transition for job {job_id}: {from:?} -> {to:?}")]
    InvalidTransition {
        /// Job being transitioned.
        job_id: JobId,
        /// State the job is currently in.
        from: JobStatus,
        /// State that was requested.
        to: JobStatus,
    },

    /// The requested assignment state change is illegal.
    #[error("invalid transition for assignment {assignment_id}: {from:?} -> {to:?}")]
    InvalidAssignmentTransition {
        /// Assignment being transitioned.
        assignment_id: AssignmentId,
        /// State the assignment is currently in.
        from: AssignmentStatus,
        /// State that was requested.
        to: AssignmentStatus,
    },

    /// An immutable pricing/SLA snapshot field was written twice.
    /// Always a caller bug.
    #[error("snapshot fields on job {0} are frozen")]
    SnapshotFrozen(JobId),

    /// The job has no pricing snapshot yet.
    #[error("job {0} has no pricing snapshot")]
    MissingPricing(JobId),

    /// The job has no SLA snapshot yet.
    #[error("job {0} has no SLA snapshot")]
    MissingSla(JobId),

    /// An emergency job was confirmed without recorded legal consent.
    #[error("emergency job {0} requires recorded consent")]
    MissingConsent(JobId),

    /// A provider responded to an offer after its hard expiry.
    #[error("offer {0} has expired")]
    OfferExpired(AssignmentId),

    /// A progress stamp was recorded out of order.
    #[error("assignment {assignment_id} is missing the {missing} stamp")]
    ProgressOutOfOrder {
        /// Assignment being progressed.
        assignment_id: AssignmentId,
        /// Name of the stamp that must be recorded first.
        missing: &'static str,
    },

    /// A progress stamp was recorded twice.
    #[error("assignment {assignment_id} already has the {stamp} stamp")]
    DuplicateProgressStamp {
        /// Assignment being progressed.
        assignment_id: AssignmentId,
        /// Name of the duplicated stamp.
        stamp: &'static str,
    },

    /// The escalation was already resolved.
    #[error("escalation {0} is already resolved")]
    EscalationAlreadyResolved(EscalationId),

    /// The job already carries the maximum number of photo attachments.
    #[error("job {0} has reached its photo attachment limit")]
    PhotoLimitExceeded(JobId),

    /// The photo reference key is empty or too long.
    #[error("invalid photo reference key (length {0})")]
    InvalidPhotoRef(usize),

    /// Latitude/longitude outside valid ranges.
    #[error("invalid coordinates: lat {lat_e6}e-6, lng {lng_e6}e-6")]
    InvalidCoordinates {
        /// Latitude in microdegrees.
        lat_e6: i32,
        /// Longitude in microdegrees.
        lng_e6: i32,
    },

    /// A required address field is empty.
    #[error("address field '{0}' must not be empty")]
    EmptyAddressField(&'static str),

    /// The schedule window does not start before it ends.
    #[error("schedule window must start before it ends")]
    InvalidScheduleWindow,

    /// Pricing arithmetic failed while mutating the job.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Error returned while parsing job statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown job status: {0}")]
pub struct ParseJobStatusError(pub String);

/// Error returned while parsing assignment statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown assignment status: {0}")]
pub struct ParseAssignmentStatusError(pub String);
