//! Notification collaborator port.
//!
//! The core emits lifecycle events; delivery guarantees belong to the
//! collaborator, so dispatching is fire-and-forget.

use crate::job::domain::{CancelledBy, JobId, ProviderId, SlaDeadlineKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Lifecycle event emitted to the notification dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A provider was matched to the job.
    Matched {
        /// Job that was matched.
        job_id: JobId,
        /// Provider holding the offer.
        provider_id: ProviderId,
    },
    /// The provider accepted the offer.
    Accepted {
        /// Job that was accepted.
        job_id: JobId,
        /// Accepting provider.
        provider_id: ProviderId,
    },
    /// The provider is travelling to the job.
    EnRoute {
        /// Job in progress.
        job_id: JobId,
    },
    /// The provider arrived on site.
    Arrived {
        /// Job in progress.
        job_id: JobId,
    },
    /// Work completed and payment captured.
    Completed {
        /// Completed job.
        job_id: JobId,
    },
    /// The job was cancelled.
    Cancelled {
        /// Cancelled job.
        job_id: JobId,
        /// Who cancelled.
        by: CancelledBy,
    },
    /// An SLA deadline was breached.
    SlaBreached {
        /// Affected job.
        job_id: JobId,
        /// Which of the three clocks breached.
        deadline: SlaDeadlineKind,
    },
    /// Dispatch exhausted all eligible providers.
    NoProviderAvailable {
        /// Affected job.
        job_id: JobId,
    },
}

/// Notification dispatcher contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Emits one lifecycle event.
    ///
    /// Failures are the collaborator's concern; the engine never blocks a
    /// transition on delivery.
    async fn dispatch(&self, event: LifecycleEvent);
}
