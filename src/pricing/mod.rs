//! Pricing and fee calculation.
//!
//! Everything in this module is a pure function over snapshots: quoting
//! derives a frozen [`PricingSnapshot`] from catalog data, commission is
//! computed once at finalization with floor-to-minor-unit rounding, and
//! cancellation fees come from a data-driven [`FeeSchedule`] rather than
//! hard-coded business logic. Callers persist the results.

mod error;
mod fees;
mod money;
mod quote;

pub use error::PricingError;
pub use fees::{
    CancellationPhase, CancellationReason, FeeSchedule, FeeScheduleConfig, cancellation_fee,
};
pub use money::{BasisPoints, CommissionRate, Currency, Money, MoneyError};
pub use quote::{PricingSnapshot, quote};
