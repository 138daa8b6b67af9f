//! Assignment aggregate: one provider's offer/acceptance record against a
//! job, the unit of dispatch.

use super::error::{JobDomainError, ParseAssignmentStatusError};
use super::ids::{AssignmentId, JobId, ProviderId};
use super::location::GeoPoint;
use super::snapshot::SlaSnapshot;
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Assignment lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// Offer is open and awaiting the provider's response.
    Offered,
    /// The provider accepted and holds the job.
    Accepted,
    /// The provider declined the offer.
    Declined,
    /// The offer lapsed past its hard expiry.
    Expired,
    /// The assignment was cancelled before completion.
    Cancelled,
    /// The provider completed the work.
    Completed,
}

impl AssignmentStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Offered => "offered",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Returns whether the assignment still occupies the job's single
    /// active slot.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Offered | Self::Accepted)
    }
}

impl TryFrom<&str> for AssignmentStatus {
    type Error = ParseAssignmentStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "offered" => Ok(Self::Offered),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            "expired" => Ok(Self::Expired),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseAssignmentStatusError(value.to_owned())),
        }
    }
}

/// One of the three independent SLA clocks on an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaDeadlineKind {
    /// Offer to provider response.
    Response,
    /// Acceptance to arrival on site.
    Arrival,
    /// Work start to completion.
    Completion,
}

impl SlaDeadlineKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Response => "response",
            Self::Arrival => "arrival",
            Self::Completion => "completion",
        }
    }
}

impl fmt::Display for SlaDeadlineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reason category recorded with a declined offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclineReason {
    /// The job is too far from the provider.
    TooFar,
    /// The provider is unavailable in the window.
    Unavailable,
    /// The job needs skills the provider lacks.
    WrongSkills,
    /// Any other recorded reason.
    Other,
}

/// Composite ranking score captured at offer-creation time.
///
/// Stored for audit of the ranking decision; higher is better. Integer so
/// comparisons are total and reproducible.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MatchScore(i64);

impl MatchScore {
    /// Creates a score.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw score.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

/// An offer of a job to one specific provider.
///
/// SLA deadlines, once computed, are immutable; only the met flags and the
/// actual progress timestamps change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    id: AssignmentId,
    job_id: JobId,
    provider_id: ProviderId,
    status: AssignmentStatus,
    match_score: MatchScore,
    offered_at: DateTime<Utc>,
    offer_expires_at: DateTime<Utc>,
    responded_at: Option<DateTime<Utc>>,
    decline_reason: Option<DeclineReason>,
    provider_location_at_acceptance: Option<GeoPoint>,
    estimated_arrival_minutes: Option<u32>,
    en_route_at: Option<DateTime<Utc>>,
    arrived_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    response_deadline: DateTime<Utc>,
    arrival_deadline: Option<DateTime<Utc>>,
    completion_deadline: Option<DateTime<Utc>>,
    sla_response_met: Option<bool>,
    sla_arrival_met: Option<bool>,
    sla_completion_met: Option<bool>,
}

impl Assignment {
    /// Creates a new offer with a hard expiry.
    ///
    /// The response deadline is computed from the job's frozen SLA
    /// snapshot; the offer window comes from dispatch configuration and is
    /// typically much shorter.
    #[must_use]
    pub fn offer(
        job_id: JobId,
        provider_id: ProviderId,
        match_score: MatchScore,
        offer_window: Duration,
        sla: &SlaSnapshot,
        clock: &impl Clock,
    ) -> Self {
        let offered_at = clock.utc();
        Self {
            id: AssignmentId::new(),
            job_id,
            provider_id,
            status: AssignmentStatus::Offered,
            match_score,
            offered_at,
            offer_expires_at: offered_at + offer_window,
            responded_at: None,
            decline_reason: None,
            provider_location_at_acceptance: None,
            estimated_arrival_minutes: None,
            en_route_at: None,
            arrived_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            response_deadline: sla.response_deadline(offered_at),
            arrival_deadline: None,
            completion_deadline: None,
            sla_response_met: None,
            sla_arrival_met: None,
            sla_completion_met: None,
        }
    }

    /// Returns the assignment identifier.
    #[must_use]
    pub const fn id(&self) -> AssignmentId {
        self.id
    }

    /// Returns the job this assignment belongs to.
    #[must_use]
    pub const fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Returns the offered provider.
    #[must_use]
    pub const fn provider_id(&self) -> ProviderId {
        self.provider_id
    }

    /// Returns the assignment status.
    #[must_use]
    pub const fn status(&self) -> AssignmentStatus {
        self.status
    }

    /// Returns the audited ranking score.
    #[must_use]
    pub const fn match_score(&self) -> MatchScore {
        self.match_score
    }

    /// Returns when the offer was created.
    #[must_use]
    pub const fn offered_at(&self) -> DateTime<Utc> {
        self.offered_at
    }

    /// Returns the offer's hard expiry.
    #[must_use]
    pub const fn offer_expires_at(&self) -> DateTime<Utc> {
        self.offer_expires_at
    }

    /// Returns when the provider responded, if they have.
    #[must_use]
    pub const fn responded_at(&self) -> Option<DateTime<Utc>> {
        self.responded_at
    }

    /// Returns the decline reason, if declined.
    #[must_use]
    pub const fn decline_reason(&self) -> Option<DeclineReason> {
        self.decline_reason
    }

    /// Returns the provider's location at acceptance.
    #[must_use]
    pub const fn provider_location_at_acceptance(&self) -> Option<GeoPoint> {
        self.provider_location_at_acceptance
    }

    /// Returns the estimated arrival minutes reported at acceptance.
    #[must_use]
    pub const fn estimated_arrival_minutes(&self) -> Option<u32> {
        self.estimated_arrival_minutes
    }

    /// Returns when the provider reported leaving for the job.
    #[must_use]
    pub const fn en_route_at(&self) -> Option<DateTime<Utc>> {
        self.en_route_at
    }

    /// Returns when the provider arrived on site.
    #[must_use]
    pub const fn arrived_at(&self) -> Option<DateTime<Utc>> {
        self.arrived_at
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

    /// Returns when the assignment was cancelled.
    #[must_use]
    pub const fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    /// Returns the deadline for the given SLA clock, if computed yet.
    #[must_use]
    pub const fn deadline(&self, kind: SlaDeadlineKind) -> Option<DateTime<Utc>> {
        match kind {
            SlaDeadlineKind::Response => Some(self.response_deadline),
            SlaDeadlineKind::Arrival => self.arrival_deadline,
            SlaDeadlineKind::Completion => self.completion_deadline,
        }
    }

    /// Returns the basis timestamp the given deadline was computed from.
    #[must_use]
    pub const fn deadline_basis(&self, kind: SlaDeadlineKind) -> Option<DateTime<Utc>> {
        match kind {
            SlaDeadlineKind::Response => Some(self.offered_at),
            SlaDeadlineKind::Arrival => self.responded_at,
            SlaDeadlineKind::Completion => self.started_at,
        }
    }

    /// Returns the met flag for the given SLA clock.
    ///
    /// `None` means the clock has not been evaluated yet; once set the
    /// flag never changes.
    #[must_use]
    pub const fn sla_met(&self, kind: SlaDeadlineKind) -> Option<bool> {
        match kind {
            SlaDeadlineKind::Response => self.sla_response_met,
            SlaDeadlineKind::Arrival => self.sla_arrival_met,
            SlaDeadlineKind::Completion => self.sla_completion_met,
        }
    }

    /// Marks an SLA clock evaluated, returning whether the flag was newly
    /// set.
    ///
    /// Evaluating an already-marked deadline is a no-op so breach handling
    /// never double-fires.
    pub(crate) const fn mark_sla(&mut self, kind: SlaDeadlineKind, met: bool) -> bool {
        let slot = match kind {
            SlaDeadlineKind::Response => &mut self.sla_response_met,
            SlaDeadlineKind::Arrival => &mut self.sla_arrival_met,
            SlaDeadlineKind::Completion => &mut self.sla_completion_met,
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(met);
        true
    }

    /// Records the provider's acceptance.
    ///
    /// Computes the arrival deadline from the acceptance instant and
    /// evaluates the response SLA clock.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidAssignmentTransition`] when the
    /// offer is not open, or [`JobDomainError::OfferExpired`] past the
    /// hard expiry.
    pub fn accept(
        &mut self,
        provider_location: GeoPoint,
        estimated_arrival_minutes: u32,
        sla: &SlaSnapshot,
        clock: &impl Clock,
    ) -> Result<(), JobDomainError> {
        self.guard_status(AssignmentStatus::Offered, AssignmentStatus::Accepted)?;
        let now = clock.utc();
        if now > self.offer_expires_at {
            return Err(JobDomainError::OfferExpired(self.id));
        }
        self.status = AssignmentStatus::Accepted;
        self.responded_at = Some(now);
        self.provider_location_at_acceptance = Some(provider_location);
        self.estimated_arrival_minutes = Some(estimated_arrival_minutes);
        self.arrival_deadline = Some(sla.arrival_deadline(now));
        let _ = self.mark_sla(SlaDeadlineKind::Response, now <= self.response_deadline);
        Ok(())
    }

    /// Records the provider's decline.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidAssignmentTransition`] when the
    /// offer is not open.
    pub fn decline(
        &mut self,
        reason: DeclineReason,
        clock: &impl Clock,
    ) -> Result<(), JobDomainError> {
        self.guard_status(AssignmentStatus::Offered, AssignmentStatus::Declined)?;
        self.status = AssignmentStatus::Declined;
        self.responded_at = Some(clock.utc());
        self.decline_reason = Some(reason);
        Ok(())
    }

    /// Expires an open offer past its hard expiry.
    ///
    /// The response SLA clock is marked unmet.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidAssignmentTransition`] when the
    /// offer is not open.
    pub fn expire(&mut self, clock: &impl Clock) -> Result<(), JobDomainError> {
        self.guard_status(AssignmentStatus::Offered, AssignmentStatus::Expired)?;
        self.status = AssignmentStatus::Expired;
        self.responded_at = Some(clock.utc());
        let _ = self.mark_sla(SlaDeadlineKind::Response, false);
        Ok(())
    }

    /// Cancels an open assignment.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidAssignmentTransition`] when the
    /// assignment already reached a terminal status.
    pub fn cancel(&mut self, clock: &impl Clock) -> Result<(), JobDomainError> {
        if !self.status.is_open() {
            return Err(JobDomainError::InvalidAssignmentTransition {
                assignment_id: self.id,
                from: self.status,
                to: AssignmentStatus::Cancelled,
            });
        }
        self.status = AssignmentStatus::Cancelled;
        self.cancelled_at = Some(clock.utc());
        Ok(())
    }

    /// Records the provider leaving for the job.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidAssignmentTransition`] when the
    /// assignment is not accepted, or
    /// [`JobDomainError::DuplicateProgressStamp`] when already recorded.
    pub fn mark_en_route(&mut self, clock: &impl Clock) -> Result<(), JobDomainError> {
        self.guard_accepted()?;
        if self.en_route_at.is_some() {
            return Err(JobDomainError::DuplicateProgressStamp {
                assignment_id: self.id,
                stamp: "en_route",
            });
        }
        self.en_route_at = Some(clock.utc());
        Ok(())
    }

    /// Records arrival on site and evaluates the arrival SLA clock.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::ProgressOutOfOrder`] when no en-route
    /// stamp exists, or [`JobDomainError::DuplicateProgressStamp`] when
    /// already recorded.
    pub fn mark_arrived(&mut self, clock: &impl Clock) -> Result<(), JobDomainError> {
        self.guard_accepted()?;
        if self.en_route_at.is_none() {
            return Err(JobDomainError::ProgressOutOfOrder {
                assignment_id: self.id,
                missing: "en_route",
            });
        }
        if self.arrived_at.is_some() {
            return Err(JobDomainError::DuplicateProgressStamp {
                assignment_id: self.id,
                stamp: "arrived",
            });
        }
        let now = clock.utc();
        self.arrived_at = Some(now);
        if let Some(deadline) = self.arrival_deadline {
            let _ = self.mark_sla(SlaDeadlineKind::Arrival, now <= deadline);
        }
        Ok(())
    }

    /// Records the start of work and computes the completion deadline.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::ProgressOutOfOrder`] when no arrival
    /// stamp exists, or [`JobDomainError::DuplicateProgressStamp`] when
    /// already recorded.
    pub fn mark_started(
        &mut self,
        sla: &SlaSnapshot,
        clock: &impl Clock,
    ) -> Result<(), JobDomainError> {
        self.guard_accepted()?;
        if self.arrived_at.is_none() {
            return Err(JobDomainError::ProgressOutOfOrder {
                assignment_id: self.id,
                missing: "arrived",
            });
        }
        if self.started_at.is_some() {
            return Err(JobDomainError::DuplicateProgressStamp {
                assignment_id: self.id,
                stamp: "started",
            });
        }
        let now = clock.utc();
        self.started_at = Some(now);
        self.completion_deadline = Some(sla.completion_deadline(now));
        Ok(())
    }

    /// Records completion and evaluates the completion SLA clock.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::ProgressOutOfOrder`] when no start stamp
    /// exists, or [`JobDomainError::InvalidAssignmentTransition`] when the
    /// assignment is not accepted.
    pub fn complete(&mut self, clock: &impl Clock) -> Result<(), JobDomainError> {
        self.guard_accepted()?;
        if self.started_at.is_none() {
            return Err(JobDomainError::ProgressOutOfOrder {
                assignment_id: self.id,
                missing: "started",
            });
        }
        let now = clock.utc();
        self.status = AssignmentStatus::Completed;
        self.completed_at = Some(now);
        if let Some(deadline) = self.completion_deadline {
            let _ = self.mark_sla(SlaDeadlineKind::Completion, now <= deadline);
        }
        Ok(())
    }

    const fn guard_status(
        &self,
        expected: AssignmentStatus,
        to: AssignmentStatus,
    ) -> Result<(), JobDomainError> {
        if !matches!(
            (self.status, expected),
            (AssignmentStatus::Offered, AssignmentStatus::Offered)
                | (AssignmentStatus::Accepted, AssignmentStatus::Accepted)
        ) {
            return Err(JobDomainError::InvalidAssignmentTransition {
                assignment_id: self.id,
                from: self.status,
                to,
            });
        }
        Ok(())
    }

    const fn guard_accepted(&self) -> Result<(), JobDomainError> {
        self.guard_status(AssignmentStatus::Accepted, AssignmentStatus::Accepted)
    }
}
