//! Frozen SLA snapshot and emergency consent records.

use crate::catalog::SlaProfile;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Service-level commitments frozen into a job at confirmation time.
///
/// The snapshot is copied verbatim from the applicable catalog profile and
/// is never re-read from the profile afterwards; later catalog changes do
/// not affect confirmed jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaSnapshot {
    response_minutes: u32,
    arrival_minutes: u32,
    completion_minutes: u32,
    terms: serde_json::Value,
}

impl SlaSnapshot {
    /// Copies a catalog profile into a frozen snapshot.
    #[must_use]
    pub fn from_profile(profile: &SlaProfile) -> Self {
        Self {
            response_minutes: profile.response_minutes(),
            arrival_minutes: profile.arrival_minutes(),
            completion_minutes: profile.completion_minutes(),
            terms: profile.terms().clone(),
        }
    }

    /// Minutes allowed for a provider to respond to an offer.
    #[must_use]
    pub const fn response_minutes(&self) -> u32 {
        self.response_minutes
    }

    /// Minutes allowed between acceptance and arrival on site.
    #[must_use]
    pub const fn arrival_minutes(&self) -> u32 {
        self.arrival_minutes
    }

    /// Minutes allowed between work start and completion.
    #[must_use]
    pub const fn completion_minutes(&self) -> u32 {
        self.completion_minutes
    }

    /// Opaque frozen terms copied from the profile.
    #[must_use]
    pub const fn terms(&self) -> &serde_json::Value {
        &self.terms
    }

    /// Response deadline for an offer made at `offered_at`.
    #[must_use]
    pub fn response_deadline(&self, offered_at: DateTime<Utc>) -> DateTime<Utc> {
        offered_at + Duration::minutes(i64::from(self.response_minutes))
    }

    /// Arrival deadline for an assignment accepted at `accepted_at`.
    #[must_use]
    pub fn arrival_deadline(&self, accepted_at: DateTime<Utc>) -> DateTime<Utc> {
        accepted_at + Duration::minutes(i64::from(self.arrival_minutes))
    }

    /// Completion deadline for work started at `started_at`.
    #[must_use]
    pub fn completion_deadline(&self, started_at: DateTime<Utc>) -> DateTime<Utc> {
        started_at + Duration::minutes(i64::from(self.completion_minutes))
    }
}

/// Recorded legal consent for emergency call-out terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyConsent {
    version: String,
    accepted_at: DateTime<Utc>,
}

impl EmergencyConsent {
    /// Records consent to a specific terms version.
    #[must_use]
    pub fn new(version: impl Into<String>, accepted_at: DateTime<Utc>) -> Self {
        Self {
            version: version.into(),
            accepted_at,
        }
    }

    /// Returns the consented terms version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns when consent was recorded.
    #[must_use]
    pub const fn accepted_at(&self) -> DateTime<Utc> {
        self.accepted_at
    }
}
