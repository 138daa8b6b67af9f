//! Job lifecycle state and the legal transition table.

use super::error::ParseJobStatusError;
use serde::{Deserialize, Serialize};

/// Job lifecycle state.
///
/// States from [`JobStatus::Matched`] through [`JobStatus::Completed`] are
/// a derived projection of the single active assignment's progress; they
/// are never set independently of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Request captured, pricing not yet accepted.
    Draft,
    /// Pricing and SLA accepted; awaiting a provider match.
    PendingMatch,
    /// An offer is out to a provider.
    Matched,
    /// A provider accepted the offer.
    ProviderAccepted,
    /// The provider is travelling to the job.
    ProviderEnRoute,
    /// Work has started on site.
    InProgress,
    /// Work finished and payment captured.
    Completed,
    /// Cancelled by the customer.
    CancelledByCustomer,
    /// Cancelled by the assigned provider.
    CancelledByProvider,
    /// Cancelled automatically by the platform.
    CancelledBySystem,
    /// The customer disputed a completed job.
    Disputed,
    /// The dispute ended in a refund.
    Refunded,
}

impl JobStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingMatch => "pending_match",
            Self::Matched => "matched",
            Self::ProviderAccepted => "provider_accepted",
            Self::ProviderEnRoute => "provider_en_route",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::CancelledByCustomer => "cancelled_by_customer",
            Self::CancelledByProvider => "cancelled_by_provider",
            Self::CancelledBySystem => "cancelled_by_system",
            Self::Disputed => "disputed",
            Self::Refunded => "refunded",
        }
    }

    /// Returns whether no further transition is legal from this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::CancelledByCustomer
                | Self::CancelledByProvider
                | Self::CancelledBySystem
                | Self::Refunded
        )
    }

    /// Returns whether this is one of the cancelled states.
    #[must_use]
    pub const fn is_cancelled(self) -> bool {
        matches!(
            self,
            Self::CancelledByCustomer | Self::CancelledByProvider | Self::CancelledBySystem
        )
    }

    /// Returns whether a cancellation may still be requested.
    ///
    /// Cancellation is always legal while the job is neither completed nor
    /// in the post-completion dispute path.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        !matches!(self, Self::Completed | Self::Disputed | Self::Refunded) && !self.is_terminal()
    }

    /// Returns whether `to` is a legal next state.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        if to.is_cancelled() {
            return self.is_cancellable();
        }
        matches!(
            (self, to),
            (Self::Draft, Self::PendingMatch)
                | (Self::PendingMatch, Self::Matched)
                | (Self::Matched, Self::ProviderAccepted)
                // Offer declined or expired; the job goes back for
                // re-dispatch.
                | (Self::Matched, Self::PendingMatch)
                | (Self::ProviderAccepted, Self::ProviderEnRoute)
                | (Self::ProviderEnRoute, Self::InProgress)
                | (Self::InProgress, Self::Completed)
                | (Self::Completed, Self::Disputed)
                | (Self::Disputed, Self::Refunded)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for JobStatus {
    type Error = ParseJobStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "draft" => Ok(Self::Draft),
            "pending_match" => Ok(Self::PendingMatch),
            "matched" => Ok(Self::Matched),
            "provider_accepted" => Ok(Self::ProviderAccepted),
            "provider_en_route" => Ok(Self::ProviderEnRoute),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled_by_customer" => Ok(Self::CancelledByCustomer),
            "cancelled_by_provider" => Ok(Self::CancelledByProvider),
            "cancelled_by_system" => Ok(Self::CancelledBySystem),
            "disputed" => Ok(Self::Disputed),
            "refunded" => Ok(Self::Refunded),
            _ => Err(ParseJobStatusError(value.to_owned())),
        }
    }
}
