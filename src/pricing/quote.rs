//! Quote derivation and the frozen pricing snapshot.

use super::error::PricingError;
use super::money::{CommissionRate, Currency, Money};
use crate::catalog::ServiceTask;
use serde::{Deserialize, Serialize};

/// Frozen pricing terms for one job.
///
/// The quoted price and commission rate are set once at creation and are
/// never mutated afterwards, even if the underlying catalog changes.
/// Finalization derives the commission split exactly once; a second
/// attempt fails with [`PricingError::SnapshotFrozen`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSnapshot {
    quoted_price: Money,
    commission_rate: CommissionRate,
    final_price: Option<Money>,
    commission: Option<Money>,
    provider_payout: Option<Money>,
    refunded: bool,
}

impl PricingSnapshot {
    /// Creates a snapshot from a quoted price and commission rate.
    #[must_use]
    pub const fn new(quoted_price: Money, commission_rate: CommissionRate) -> Self {
        Self {
            quoted_price,
            commission_rate,
            final_price: None,
            commission: None,
            provider_payout: None,
            refunded: false,
        }
    }

    /// Returns the quoted price.
    #[must_use]
    pub const fn quoted_price(&self) -> Money {
        self.quoted_price
    }

    /// Returns the frozen commission rate.
    #[must_use]
    pub const fn commission_rate(&self) -> CommissionRate {
        self.commission_rate
    }

    /// Returns the currency of the quote.
    #[must_use]
    pub const fn currency(&self) -> Currency {
        self.quoted_price.currency()
    }

    /// Returns the final price, if finalized.
    #[must_use]
    pub const fn final_price(&self) -> Option<Money> {
        self.final_price
    }

    /// Returns the platform commission, if finalized.
    #[must_use]
    pub const fn commission(&self) -> Option<Money> {
        self.commission
    }

    /// Returns the provider payout, if finalized.
    #[must_use]
    pub const fn provider_payout(&self) -> Option<Money> {
        self.provider_payout
    }

    /// Returns whether the commission/payout bookkeeping was reversed by a
    /// refund.
    #[must_use]
    pub const fn is_refunded(&self) -> bool {
        self.refunded
    }

    /// Finalizes the snapshot with the actual charged price.
    ///
    /// Commission is `rate × final_price` floored to the minor unit;
    /// provider payout is the remainder.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::SnapshotFrozen`] when already finalized, or
    /// a [`PricingError::Money`] arithmetic failure.
    pub fn finalize(&mut self, final_price: Money) -> Result<(), PricingError> {
        if self.final_price.is_some() {
            return Err(PricingError::SnapshotFrozen);
        }
        let commission = final_price.scale_bps(self.commission_rate.as_bps())?;
        let payout = final_price.checked_sub(commission)?;
        self.final_price = Some(final_price);
        self.commission = Some(commission);
        self.provider_payout = Some(payout);
        Ok(())
    }

    /// Reverses the commission/payout bookkeeping after a refund.
    ///
    /// History is preserved: the finalized amounts remain readable and only
    /// the refunded flag is raised.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::NotFinalized`] when no final price exists
    /// yet, or [`PricingError::SnapshotFrozen`] when already refunded.
    pub const fn mark_refunded(&mut self) -> Result<(), PricingError> {
        if self.final_price.is_none() {
            return Err(PricingError::NotFinalized);
        }
        if self.refunded {
            return Err(PricingError::SnapshotFrozen);
        }
        self.refunded = true;
        Ok(())
    }
}

/// Derives the quoted price for a task.
///
/// Standard quotes use the catalog base price. Emergency quotes apply the
/// task's emergency multiplier and are floored at the task's minimum
/// emergency charge.
///
/// # Errors
///
/// Returns [`PricingError::Money`] when the multiplied amount overflows.
pub fn quote(
    task: &ServiceTask,
    is_emergency: bool,
    commission_rate: CommissionRate,
) -> Result<PricingSnapshot, PricingError> {
    let quoted = if is_emergency {
        let multiplied = task.base_price().scale_bps(task.emergency_multiplier())?;
        multiplied.max(task.emergency_minimum())
    } else {
        task.base_price()
    };
    Ok(PricingSnapshot::new(quoted, commission_rate))
}
