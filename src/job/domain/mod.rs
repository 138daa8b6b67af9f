//! Domain model for job dispatch and SLA-bound lifecycle tracking.
//!
//! The job domain models draft creation, snapshot-frozen confirmation,
//! assignment offers and progress, escalations, and the legal transition
//! table, keeping all infrastructure concerns outside of the domain
//! boundary.

mod assignment;
mod error;
mod escalation;
mod ids;
mod job;
mod location;
mod snapshot;
mod status;

pub use assignment::{
    Assignment, AssignmentStatus, DeclineReason, MatchScore, SlaDeadlineKind,
};
pub use error::{JobDomainError, ParseAssignmentStatusError, ParseJobStatusError};
pub use escalation::{Escalation, EscalationType};
pub use ids::{
    AssignmentId, CustomerId, EscalationId, JobId, JobReference, PaymentRef, ProviderId,
};
pub use job::{
    CancellationRecord, CancelledBy, Job, JobPriority, NewJob, NoteTag, PhotoRef, ScheduleWindow,
};
pub use location::{Address, GeoPoint, ServiceLocation};
pub use snapshot::{EmergencyConsent, SlaSnapshot};
pub use status::JobStatus;
