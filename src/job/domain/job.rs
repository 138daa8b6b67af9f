//! Job aggregate root: one customer's request for one catalog task at one
//! location.

use super::assignment::{Assignment, AssignmentStatus};
use super::error::JobDomainError;
use super::ids::{CustomerId, JobId, JobReference, PaymentRef};
use super::location::ServiceLocation;
use super::snapshot::{EmergencyConsent, SlaSnapshot};
use super::status::JobStatus;
use crate::catalog::TaskCode;
use crate::pricing::{CancellationPhase, CancellationReason, Money, PricingSnapshot};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Maximum photo attachments per before/after list.
const MAX_PHOTOS: usize = 16;

/// Maximum length of a photo attachment key.
const MAX_PHOTO_KEY_LEN: usize = 256;

/// Job urgency tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum JobPriority {
    /// Scheduled work in a normal window.
    Standard,
    /// Same-day work with a tightened search radius.
    Urgent,
    /// Level-4 emergency call-out.
    Emergency,
}

impl JobPriority {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Urgent => "urgent",
            Self::Emergency => "emergency",
        }
    }
}

/// Who initiated a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    /// The requesting customer.
    Customer,
    /// The assigned provider.
    Provider,
    /// The platform itself (SLA breach, no provider available).
    System,
}

impl CancelledBy {
    /// Returns the job status this canceller maps to.
    #[must_use]
    pub const fn job_status(self) -> JobStatus {
        match self {
            Self::Customer => JobStatus::CancelledByCustomer,
            Self::Provider => JobStatus::CancelledByProvider,
            Self::System => JobStatus::CancelledBySystem,
        }
    }
}

/// Financial and audit record of a cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationRecord {
    /// Who cancelled.
    pub by: CancelledBy,
    /// Recorded reason category.
    pub reason: CancellationReason,
    /// Fee charged, computed before the cancellation was acknowledged.
    pub fee: Money,
    /// When the cancellation took effect.
    pub cancelled_at: DateTime<Utc>,
}

/// Requested schedule window for non-emergency jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

impl ScheduleWindow {
    /// Creates a validated window.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidScheduleWindow`] when the window
    /// does not start before it ends.
    pub fn new(
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<Self, JobDomainError> {
        if ends_at <= starts_at {
            return Err(JobDomainError::InvalidScheduleWindow);
        }
        Ok(Self { starts_at, ends_at })
    }

    /// Returns the window start.
    #[must_use]
    pub const fn starts_at(self) -> DateTime<Utc> {
        self.starts_at
    }

    /// Returns the window end.
    #[must_use]
    pub const fn ends_at(self) -> DateTime<Utc> {
        self.ends_at
    }
}

/// Predefined note tag; structured notes never carry free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteTag {
    /// Customer will not be home.
    CustomerNotHome,
    /// Pets on the premises.
    PetsOnPremises,
    /// Parking is difficult at the address.
    ParkingDifficult,
    /// Fragile items near the work area.
    FragileItems,
    /// An access code is required to enter.
    AccessCodeRequired,
    /// A follow-up visit is expected.
    FollowUpRequired,
}

/// Opaque photo attachment key with explicit limits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoRef(String);

impl PhotoRef {
    /// Creates a validated attachment key.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidPhotoRef`] when the key is empty
    /// or longer than 256 characters.
    pub fn new(key: impl Into<String>) -> Result<Self, JobDomainError> {
        let key = key.into();
        if key.is_empty() || key.len() > MAX_PHOTO_KEY_LEN {
            return Err(JobDomainError::InvalidPhotoRef(key.len()));
        }
        Ok(Self(key))
    }

    /// Returns the attachment key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Parameter object for creating a draft job.
#[derive(Debug, Clone)]
pub struct NewJob {
    /// Requesting customer.
    pub customer_id: CustomerId,
    /// Closed-catalog task code.
    pub task_code: TaskCode,
    /// Urgency tier.
    pub priority: JobPriority,
    /// Where the work happens.
    pub location: ServiceLocation,
    /// Requested window; `None` for emergency/on-demand jobs.
    pub window: Option<ScheduleWindow>,
}

/// Job aggregate root.
///
/// The SLA snapshot and commission rate are frozen at confirmation and
/// never mutated afterwards. A job is never deleted; terminal states are
/// soft-terminal and keep serving their final snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    reference: JobReference,
    customer_id: CustomerId,
    task_code: TaskCode,
    priority: JobPriority,
    emergency: bool,
    location: ServiceLocation,
    window: Option<ScheduleWindow>,
    status: JobStatus,
    sla: Option<SlaSnapshot>,
    pricing: Option<PricingSnapshot>,
    consent: Option<EmergencyConsent>,
    payment: Option<PaymentRef>,
    before_photos: Vec<PhotoRef>,
    after_photos: Vec<PhotoRef>,
    notes: Vec<NoteTag>,
    reoffer_count: u32,
    cancellation: Option<CancellationRecord>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Creates a draft job from a customer request.
    ///
    /// The emergency flag is derived from the priority tier; the
    /// human-readable reference is derived from the job identifier.
    #[must_use]
    pub fn new_draft(request: NewJob, clock: &impl Clock) -> Self {
        let id = JobId::new();
        let timestamp = clock.utc();
        Self {
            id,
            reference: JobReference::for_job(id),
            customer_id: request.customer_id,
            task_code: request.task_code,
            priority: request.priority,
            emergency: matches!(request.priority, JobPriority::Emergency),
            location: request.location,
            window: request.window,
            status: JobStatus::Draft,
            sla: None,
            pricing: None,
            consent: None,
            payment: None,
            before_photos: Vec::new(),
            after_photos: Vec::new(),
            notes: Vec::new(),
            reoffer_count: 0,
            cancellation: None,
            version: 0,
            created_at: timestamp,
            updated_at: timestamp,
            confirmed_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
        }
    }

    /// Returns the job identifier.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Returns the immutable human-readable reference.
    #[must_use]
    pub const fn reference(&self) -> &JobReference {
        &self.reference
    }

    /// Returns the requesting customer.
    #[must_use]
    pub const fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Returns the catalog task code.
    #[must_use]
    pub const fn task_code(&self) -> &TaskCode {
        &self.task_code
    }

    /// Returns the urgency tier.
    #[must_use]
    pub const fn priority(&self) -> JobPriority {
        self.priority
    }

    /// Returns whether this is an emergency job.
    #[must_use]
    pub const fn is_emergency(&self) -> bool {
        self.emergency
    }

    /// Returns the service location.
    #[must_use]
    pub const fn location(&self) -> &ServiceLocation {
        &self.location
    }

    /// Returns the requested schedule window.
    #[must_use]
    pub const fn window(&self) -> Option<ScheduleWindow> {
        self.window
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> JobStatus {
        self.status
    }

    /// Returns the frozen SLA snapshot, if confirmed.
    #[must_use]
    pub const fn sla(&self) -> Option<&SlaSnapshot> {
        self.sla.as_ref()
    }

    /// Returns the frozen pricing snapshot, if confirmed.
    #[must_use]
    pub const fn pricing(&self) -> Option<&PricingSnapshot> {
        self.pricing.as_ref()
    }

    /// Returns the recorded emergency consent, if any.
    #[must_use]
    pub const fn consent(&self) -> Option<&EmergencyConsent> {
        self.consent.as_ref()
    }

    /// Returns the payment collaborator reference, if authorized.
    #[must_use]
    pub const fn payment(&self) -> Option<&PaymentRef> {
        self.payment.as_ref()
    }

    /// Returns the before-work photo references.
    #[must_use]
    pub fn before_photos(&self) -> &[PhotoRef] {
        &self.before_photos
    }

    /// Returns the after-work photo references.
    #[must_use]
    pub fn after_photos(&self) -> &[PhotoRef] {
        &self.after_photos
    }

    /// Returns the structured note tags.
    #[must_use]
    pub fn notes(&self) -> &[NoteTag] {
        &self.notes
    }

    /// Returns how many times the job has been re-offered.
    #[must_use]
    pub const fn reoffer_count(&self) -> u32 {
        self.reoffer_count
    }

    /// Returns the cancellation record, if cancelled.
    #[must_use]
    pub const fn cancellation(&self) -> Option<&CancellationRecord> {
        self.cancellation.as_ref()
    }

    /// Returns the optimistic-concurrency version.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns when pricing was confirmed, if it has been.
    ///
    /// This is the basis of the job-level response clock while no offer
    /// is open.
    #[must_use]
    pub const fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    /// Returns when work started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Returns when work completed.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns when the job was cancelled.
    #[must_use]
    pub const fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    /// Confirms the draft: freezes pricing and SLA snapshots, records the
    /// payment authorization, and moves the job to pending match.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidTransition`] when the job is not a
    /// draft, [`JobDomainError::SnapshotFrozen`] when snapshots already
    /// exist, or [`JobDomainError::MissingConsent`] when an emergency job
    /// carries no consent record.
    pub fn confirm(
        &mut self,
        pricing: PricingSnapshot,
        sla: SlaSnapshot,
        consent: Option<EmergencyConsent>,
        payment: PaymentRef,
        clock: &impl Clock,
    ) -> Result<(), JobDomainError> {
        if self.pricing.is_some() || self.sla.is_some() {
            return Err(JobDomainError::SnapshotFrozen(self.id));
        }
        if self.emergency && consent.is_none() {
            return Err(JobDomainError::MissingConsent(self.id));
        }
        self.guard_transition(JobStatus::PendingMatch)?;
        self.pricing = Some(pricing);
        self.sla = Some(sla);
        self.consent = consent;
        self.payment = Some(payment);
        self.apply_transition(JobStatus::PendingMatch, clock);
        self.confirmed_at = Some(self.updated_at);
        Ok(())
    }

    /// Transitions the job to a new lifecycle state.
    ///
    /// This is the single authoritative transition function: assignment
    /// projections, cancellations, and dispute handling all go through it.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidTransition`] when the transition
    /// is not in the legal table.
    pub fn transition_to(
        &mut self,
        to: JobStatus,
        clock: &impl Clock,
    ) -> Result<(), JobDomainError> {
        self.guard_transition(to)?;
        self.apply_transition(to, clock);
        Ok(())
    }

    /// Projects the job status implied by an assignment's state.
    ///
    /// Returns `None` for assignment states that do not drive the job
    /// (cancelled assignments are handled by the cancellation path).
    #[must_use]
    pub const fn project_status(assignment: &Assignment) -> Option<JobStatus> {
        match assignment.status() {
            AssignmentStatus::Offered => Some(JobStatus::Matched),
            AssignmentStatus::Accepted => {
                if assignment.started_at().is_some() {
                    Some(JobStatus::InProgress)
                } else if assignment.en_route_at().is_some() {
                    Some(JobStatus::ProviderEnRoute)
                } else {
                    Some(JobStatus::ProviderAccepted)
                }
            }
            AssignmentStatus::Completed => Some(JobStatus::Completed),
            AssignmentStatus::Declined | AssignmentStatus::Expired => {
                Some(JobStatus::PendingMatch)
            }
            AssignmentStatus::Cancelled => None,
        }
    }

    /// Re-derives the job status from its active assignment.
    ///
    /// A projection equal to the current status is a no-op so repeated
    /// synchronization is idempotent. An assignment committed with more
    /// than one progress stamp at once (arrived and started in the same
    /// commit, say) projects several derived states ahead; the job walks
    /// the chain one legal step at a time.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidTransition`] when the projected
    /// state is not reachable from the current state.
    pub fn apply_assignment(
        &mut self,
        assignment: &Assignment,
        clock: &impl Clock,
    ) -> Result<(), JobDomainError> {
        const PROGRESS_CHAIN: [JobStatus; 5] = [
            JobStatus::Matched,
            JobStatus::ProviderAccepted,
            JobStatus::ProviderEnRoute,
            JobStatus::InProgress,
            JobStatus::Completed,
        ];
        let Some(target) = Self::project_status(assignment) else {
            return Ok(());
        };
        if target == self.status {
            return Ok(());
        }
        let from = PROGRESS_CHAIN.iter().position(|state| *state == self.status);
        let to = PROGRESS_CHAIN.iter().position(|state| *state == target);
        match (from, to) {
            (Some(start), Some(end)) if start < end => {
                let steps = PROGRESS_CHAIN
                    .iter()
                    .skip(start.saturating_add(1))
                    .take(end.saturating_sub(start));
                for step in steps {
                    self.transition_to(*step, clock)?;
                }
                Ok(())
            }
            _ => self.transition_to(target, clock),
        }
    }

    /// Cancels the job, recording who, why, and the fee that was computed
    /// before acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidTransition`] when the job is no
    /// longer cancellable.
    pub fn cancel(
        &mut self,
        by: CancelledBy,
        reason: CancellationReason,
        fee: Money,
        clock: &impl Clock,
    ) -> Result<(), JobDomainError> {
        self.transition_to(by.job_status(), clock)?;
        self.cancellation = Some(CancellationRecord {
            by,
            reason,
            fee,
            cancelled_at: self.updated_at,
        });
        Ok(())
    }

    /// Opens a post-completion dispute.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidTransition`] when the job is not
    /// completed.
    pub fn open_dispute(&mut self, clock: &impl Clock) -> Result<(), JobDomainError> {
        self.transition_to(JobStatus::Disputed, clock)
    }

    /// Settles a dispute with a refund, reversing commission/payout
    /// bookkeeping without deleting history.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidTransition`] when no dispute is
    /// open, or [`JobDomainError::MissingPricing`] when the job carries no
    /// pricing snapshot.
    pub fn refund(&mut self, clock: &impl Clock) -> Result<(), JobDomainError> {
        self.guard_transition(JobStatus::Refunded)?;
        let pricing = self
            .pricing
            .as_mut()
            .ok_or(JobDomainError::MissingPricing(self.id))?;
        pricing.mark_refunded()?;
        self.apply_transition(JobStatus::Refunded, clock);
        Ok(())
    }

    /// Finalizes the pricing snapshot at completion time.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::MissingPricing`] when the job was never
    /// confirmed, or a pricing error when already finalized.
    pub fn finalize_pricing(&mut self, final_price: Money) -> Result<(), JobDomainError> {
        let pricing = self
            .pricing
            .as_mut()
            .ok_or(JobDomainError::MissingPricing(self.id))?;
        pricing.finalize(final_price)?;
        Ok(())
    }

    /// Attaches a before-work photo.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::PhotoLimitExceeded`] past the attachment
    /// limit.
    pub fn add_before_photo(
        &mut self,
        photo: PhotoRef,
        clock: &impl Clock,
    ) -> Result<(), JobDomainError> {
        if self.before_photos.len() >= MAX_PHOTOS {
            return Err(JobDomainError::PhotoLimitExceeded(self.id));
        }
        self.before_photos.push(photo);
        self.touch(clock);
        Ok(())
    }

    /// Attaches an after-work photo.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::PhotoLimitExceeded`] past the attachment
    /// limit.
    pub fn add_after_photo(
        &mut self,
        photo: PhotoRef,
        clock: &impl Clock,
    ) -> Result<(), JobDomainError> {
        if self.after_photos.len() >= MAX_PHOTOS {
            return Err(JobDomainError::PhotoLimitExceeded(self.id));
        }
        self.after_photos.push(photo);
        self.touch(clock);
        Ok(())
    }

    /// Records a structured note tag; duplicates are ignored.
    pub fn add_note(&mut self, tag: NoteTag, clock: &impl Clock) {
        if !self.notes.contains(&tag) {
            self.notes.push(tag);
            self.touch(clock);
        }
    }

    /// Counts a re-offer after a decline or expiry.
    pub fn record_reoffer(&mut self, clock: &impl Clock) {
        self.reoffer_count = self.reoffer_count.saturating_add(1);
        self.touch(clock);
    }

    /// Returns the cancellation phase for fee purposes, given the current
    /// active assignment.
    #[must_use]
    pub const fn cancellation_phase(&self, active: Option<&Assignment>) -> CancellationPhase {
        match active {
            Some(assignment) => match assignment.status() {
                AssignmentStatus::Accepted => {
                    if assignment.en_route_at().is_some() {
                        CancellationPhase::EnRoute
                    } else {
                        CancellationPhase::Accepted
                    }
                }
                _ => CancellationPhase::BeforeAcceptance,
            },
            None => CancellationPhase::BeforeAcceptance,
        }
    }

    /// Bumps the optimistic-concurrency version; called by repository
    /// adapters when a commit wins.
    pub(crate) const fn bump_version(&mut self) {
        self.version = self.version.saturating_add(1);
    }

    const fn guard_transition(&self, to: JobStatus) -> Result<(), JobDomainError> {
        if !self.status.can_transition_to(to) {
            return Err(JobDomainError::InvalidTransition {
                job_id: self.id,
                from: self.status,
                to,
            });
        }
        Ok(())
    }

    fn apply_transition(&mut self, to: JobStatus, clock: &impl Clock) {
        let now = clock.utc();
        self.status = to;
        match to {
            JobStatus::InProgress => {
                if self.started_at.is_none() {
                    self.started_at = Some(now);
                }
            }
            JobStatus::Completed => {
                if self.completed_at.is_none() {
                    self.completed_at = Some(now);
                }
            }
            JobStatus::CancelledByCustomer
            | JobStatus::CancelledByProvider
            | JobStatus::CancelledBySystem => {
                if self.cancelled_at.is_none() {
                    self.cancelled_at = Some(now);
                }
            }
            _ => {}
        }
        self.updated_at = now;
    }

    /// Updates the `updated_at` timestamp to the current clock time.
    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
