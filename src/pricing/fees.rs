//! Data-driven cancellation fee policy.

use super::error::PricingError;
use super::money::Money;
use serde::{Deserialize, Serialize};

/// How far the job had progressed when it was cancelled.
///
/// The ordering matters: fees are monotonically non-decreasing as the
/// phase advances.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CancellationPhase {
    /// No provider had responded yet (pending match or open offer).
    BeforeAcceptance,
    /// A provider had accepted but was not yet travelling.
    Accepted,
    /// The provider was en route or already on site.
    EnRoute,
}

/// Reason category recorded with a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    /// The customer changed their mind.
    CustomerChangedMind,
    /// The provider became unavailable.
    ProviderUnavailable,
    /// A safety concern was raised on site.
    SafetyConcern,
    /// The platform cancelled after a service-level breach.
    SlaBreach,
    /// No provider could be found for the job.
    NoProviderAvailable,
    /// Any other recorded reason.
    Other,
}

/// Raw deserialized fee schedule, prior to validation.
#[derive(Debug, Clone, Deserialize)]
pub struct FeeScheduleConfig {
    /// Flat fee once an assignment is accepted but not yet en route.
    pub accepted_fee: Money,
    /// Fee once the provider is en route or arrived; covers travel.
    pub en_route_fee: Money,
}

/// Validated cancellation fee schedule.
///
/// The schedule is configuration, not code: deployments load it as data
/// so the fee table can change without a deploy. Cancellations before any
/// provider response are always free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FeeScheduleConfig")]
pub struct FeeSchedule {
    accepted_fee: Money,
    en_route_fee: Money,
}

impl FeeSchedule {
    /// Creates a validated schedule.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::FeeScheduleNotMonotonic`] when the accepted
    /// fee exceeds the en-route fee, or [`PricingError::Money`] when the
    /// two fees disagree on currency.
    pub fn new(accepted_fee: Money, en_route_fee: Money) -> Result<Self, PricingError> {
        // Currency check rides on checked_sub.
        en_route_fee
            .checked_sub(accepted_fee)
            .map_err(|err| match err {
                super::money::MoneyError::Negative => PricingError::FeeScheduleNotMonotonic {
                    accepted: accepted_fee.minor_units(),
                    en_route: en_route_fee.minor_units(),
                },
                other => PricingError::Money(other),
            })?;
        Ok(Self {
            accepted_fee,
            en_route_fee,
        })
    }

    /// Returns the fee for the accepted-but-not-travelling phase.
    #[must_use]
    pub const fn accepted_fee(&self) -> Money {
        self.accepted_fee
    }

    /// Returns the fee for the en-route/arrived phase.
    #[must_use]
    pub const fn en_route_fee(&self) -> Money {
        self.en_route_fee
    }
}

impl TryFrom<FeeScheduleConfig> for FeeSchedule {
    type Error = PricingError;

    fn try_from(config: FeeScheduleConfig) -> Result<Self, Self::Error> {
        Self::new(config.accepted_fee, config.en_route_fee)
    }
}

/// Computes the cancellation fee for a job phase.
///
/// The fee is always capped strictly below the quoted price; a zero quote
/// yields a zero fee.
///
/// # Errors
///
/// Returns [`PricingError::Money`] when the schedule currency does not
/// match the quote currency.
pub fn cancellation_fee(
    schedule: &FeeSchedule,
    phase: CancellationPhase,
    quoted_price: Money,
) -> Result<Money, PricingError> {
    let fee = match phase {
        CancellationPhase::BeforeAcceptance => Money::zero(quoted_price.currency()),
        CancellationPhase::Accepted => schedule.accepted_fee,
        CancellationPhase::EnRoute => schedule.en_route_fee,
    };
    if fee.is_zero() {
        return Ok(Money::zero(quoted_price.currency()));
    }
    // Currency mismatch surfaces here before any cap arithmetic.
    match quoted_price.checked_sub(fee) {
        Ok(remaining) if remaining.is_zero() => cap_below(quoted_price),
        Ok(_) => Ok(fee),
        Err(super::money::MoneyError::Negative) => cap_below(quoted_price),
        Err(other) => Err(PricingError::Money(other)),
    }
}

/// Returns the largest fee strictly below the quoted price.
fn cap_below(quoted_price: Money) -> Result<Money, PricingError> {
    if quoted_price.is_zero() {
        return Ok(Money::zero(quoted_price.currency()));
    }
    let one_minor = Money::from_minor(1, quoted_price.currency())?;
    Ok(quoted_price.checked_sub(one_minor)?)
}
