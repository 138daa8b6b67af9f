//! Error types for pricing and fee calculation.

use super::money::MoneyError;
use thiserror::Error;

/// Errors returned by quoting, finalization, and fee calculation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PricingError {
    /// An immutable snapshot field was written a second time.
    ///
    /// This always indicates a caller bug, never a retryable condition.
    #[error("pricing snapshot is frozen and cannot be mutated")]
    SnapshotFrozen,

    /// The snapshot has not been finalized yet.
    #[error("pricing snapshot has no final price")]
    NotFinalized,

    /// The fee schedule is not monotonically non-decreasing across phases.
    #[error("cancellation fee schedule must be non-decreasing: accepted {accepted} > en-route {en_route}")]
    FeeScheduleNotMonotonic {
        /// Fee configured for the accepted phase, in minor units.
        accepted: i64,
        /// Fee configured for the en-route phase, in minor units.
        en_route: i64,
    },

    /// Monetary arithmetic failed.
    #[error(transparent)]
    Money(#[from] MoneyError),
}
