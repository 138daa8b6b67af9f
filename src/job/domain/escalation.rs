//! Escalation audit records for abnormal job conditions.

use super::error::JobDomainError;
use super::ids::{EscalationId, JobId};
use crate::catalog::ProviderLevel;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Category of abnormal condition that raised the escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationType {
    /// An SLA deadline was breached.
    SlaBreach,
    /// Dispatch exhausted all eligible providers.
    NoProviderAvailable,
    /// A safety concern was reported.
    SafetyConcern,
    /// Automated keyword detection flagged the job.
    KeywordDetection,
    /// A human manually flagged the job.
    ManualFlag,
    /// Any other system-raised condition.
    SystemAuto,
}

impl EscalationType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SlaBreach => "sla_breach",
            Self::NoProviderAvailable => "no_provider_available",
            Self::SafetyConcern => "safety_concern",
            Self::KeywordDetection => "keyword_detection",
            Self::ManualFlag => "manual_flag",
            Self::SystemAuto => "system_auto",
        }
    }
}

/// Audit/action record of an abnormal condition on a job.
///
/// Escalations are never deleted; they are mutated only to mark
/// resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escalation {
    id: EscalationId,
    job_id: JobId,
    kind: EscalationType,
    trigger: String,
    from_level: Option<ProviderLevel>,
    to_level: Option<ProviderLevel>,
    resolved: bool,
    resolved_by: Option<String>,
    resolution_notes: Option<String>,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl Escalation {
    /// Creates an unresolved escalation.
    #[must_use]
    pub fn new(
        job_id: JobId,
        kind: EscalationType,
        trigger: impl Into<String>,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: EscalationId::new(),
            job_id,
            kind,
            trigger: trigger.into(),
            from_level: None,
            to_level: None,
            resolved: false,
            resolved_by: None,
            resolution_notes: None,
            created_at: clock.utc(),
            resolved_at: None,
        }
    }

    /// Records a provider-level change carried by this escalation.
    #[must_use]
    pub const fn with_level_change(mut self, from: ProviderLevel, to: ProviderLevel) -> Self {
        self.from_level = Some(from);
        self.to_level = Some(to);
        self
    }

    /// Returns the escalation identifier.
    #[must_use]
    pub const fn id(&self) -> EscalationId {
        self.id
    }

    /// Returns the job this escalation belongs to.
    #[must_use]
    pub const fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Returns the escalation category.
    #[must_use]
    pub const fn kind(&self) -> EscalationType {
        self.kind
    }

    /// Returns the trigger description.
    #[must_use]
    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    /// Returns the recorded provider-level change, if any.
    #[must_use]
    pub const fn level_change(&self) -> Option<(ProviderLevel, ProviderLevel)> {
        match (self.from_level, self.to_level) {
            (Some(from), Some(to)) => Some((from, to)),
            _ => None,
        }
    }

    /// Returns whether the escalation has been resolved.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Returns who resolved the escalation.
    #[must_use]
    pub fn resolved_by(&self) -> Option<&str> {
        self.resolved_by.as_deref()
    }

    /// Returns the resolution notes.
    #[must_use]
    pub fn resolution_notes(&self) -> Option<&str> {
        self.resolution_notes.as_deref()
    }

    /// Returns when the escalation was raised.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the escalation was resolved.
    #[must_use]
    pub const fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    /// Marks the escalation resolved.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::EscalationAlreadyResolved`] on a second
    /// resolution attempt.
    pub fn resolve(
        &mut self,
        resolver: impl Into<String>,
        notes: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), JobDomainError> {
        if self.resolved {
            return Err(JobDomainError::EscalationAlreadyResolved(self.id));
        }
        self.resolved = true;
        self.resolved_by = Some(resolver.into());
        self.resolution_notes = Some(notes.into());
        self.resolved_at = Some(clock.utc());
        Ok(())
    }
}
