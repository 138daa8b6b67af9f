//! Integer minor-unit money and basis-point rates.
//!
//! All monetary arithmetic is checked integer arithmetic over minor units
//! (cents); floating point never touches money.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors returned by monetary arithmetic.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum MoneyError {
    /// Two amounts in different currencies were combined.
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch {
        /// Currency of the left operand.
        left: Currency,
        /// Currency of the right operand.
        right: Currency,
    },

    /// The operation would overflow the minor-unit range.
    #[error("monetary amount overflow")]
    Overflow,

    /// The operation would produce a negative amount.
    #[error("monetary amount would be negative")]
    Negative,

    /// The commission rate exceeds 100%.
    #[error("commission rate {0} bps exceeds 10000")]
    RateAboveFull(u32),
}

/// ISO 4217 currency code supported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// United States dollar.
    Usd,
    /// Euro.
    Eur,
    /// Pound sterling.
    Gbp,
}

impl Currency {
    /// Returns the ISO currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A non-negative monetary amount in minor units of one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    minor: i64,
    currency: Currency,
}

impl Money {
    /// Creates an amount from minor units.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] for negative input.
    pub const fn from_minor(minor: i64, currency: Currency) -> Result<Self, MoneyError> {
        if minor < 0 {
            return Err(MoneyError::Negative);
        }
        Ok(Self { minor, currency })
    }

    /// Returns the zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self { minor: 0, currency }
    }

    /// Returns the amount in minor units.
    #[must_use]
    pub const fn minor_units(self) -> i64 {
        self.minor
    }

    /// Returns the currency.
    #[must_use]
    pub const fn currency(self) -> Currency {
        self.currency
    }

    /// Returns whether the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.minor == 0
    }

    /// Adds two amounts of the same currency.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] or [`MoneyError::Overflow`].
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        self.require_same_currency(other)?;
        let minor = self.minor.checked_add(other.minor).ok_or(MoneyError::Overflow)?;
        Ok(Self { minor, currency: self.currency })
    }

    /// Subtracts `other` from `self`.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] or [`MoneyError::Negative`]
    /// when the result would drop below zero.
    pub fn checked_sub(self, other: Self) -> Result<Self, MoneyError> {
        self.require_same_currency(other)?;
        let minor = self.minor.checked_sub(other.minor).ok_or(MoneyError::Negative)?;
        Self::from_minor(minor, self.currency)
    }

    /// Scales the amount by a basis-point rate, flooring to the minor
    /// unit.
    ///
    /// Flooring is the platform's documented rounding rule: the platform
    /// never gains more than one minor unit by rounding.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] when the scaled amount no longer
    /// fits in the minor-unit range.
    pub fn scale_bps(self, rate: BasisPoints) -> Result<Self, MoneyError> {
        let wide = i128::from(self.minor)
            .checked_mul(i128::from(rate.value()))
            .ok_or(MoneyError::Overflow)?;
        let floored = wide.div_euclid(i128::from(BasisPoints::UNIT.value()));
        let minor = i64::try_from(floored).map_err(|_| MoneyError::Overflow)?;
        Self::from_minor(minor, self.currency)
    }

    const fn require_same_currency(self, other: Self) -> Result<(), MoneyError> {
        if !matches!(
            (self.currency, other.currency),
            (Currency::Usd, Currency::Usd)
                | (Currency::Eur, Currency::Eur)
                | (Currency::Gbp, Currency::Gbp)
        ) {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let major = self.minor.div_euclid(100);
        let cents = self.minor.rem_euclid(100);
        write!(f, "{major}.{cents:02} {}", self.currency)
    }
}

/// A rate expressed in basis points (1/100th of a percent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BasisPoints(u32);

impl BasisPoints {
    /// The 1.0x rate.
    pub const UNIT: Self = Self(10_000);

    /// Creates a basis-point rate.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw basis-point value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

/// A platform commission rate, bounded at 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct CommissionRate(BasisPoints);

impl CommissionRate {
    /// Creates a validated commission rate.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::RateAboveFull`] when the rate exceeds
    /// `10000` basis points.
    pub const fn new(bps: u32) -> Result<Self, MoneyError> {
        if bps > BasisPoints::UNIT.value() {
            return Err(MoneyError::RateAboveFull(bps));
        }
        Ok(Self(BasisPoints(bps)))
    }

    /// Returns the rate as basis points.
    #[must_use]
    pub const fn as_bps(self) -> BasisPoints {
        self.0
    }
}

impl TryFrom<u32> for CommissionRate {
    type Error = MoneyError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CommissionRate> for u32 {
    fn from(rate: CommissionRate) -> Self {
        rate.0.value()
    }
}

impl fmt::Display for CommissionRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bps", self.0.value())
    }
}
