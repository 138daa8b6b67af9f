//! Validated value types for the closed task catalog.

use crate::pricing::{BasisPoints, Money};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors returned while constructing catalog values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// The task code contains characters outside the closed-code alphabet.
    #[error("invalid task code '{0}', expected lowercase letters, digits, '-' or '_'")]
    InvalidTaskCode(String),

    /// The provider level is outside the supported 1..=4 scale.
    #[error("invalid provider level {0}, expected 1..=4")]
    InvalidLevel(u8),

    /// The region code is empty after trimming.
    #[error("region code must not be empty")]
    EmptyRegion,

    /// The emergency multiplier would discount the base price.
    #[error("emergency multiplier {0} bps is below 10000 (1.0x)")]
    MultiplierBelowUnit(u32),
}

/// Identifier of a predefined task in the closed catalog.
///
/// Jobs may only reference codes that exist in the catalog; free-text task
/// descriptions are rejected at the type level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskCode(String);

impl TaskCode {
    /// Creates a validated task code.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidTaskCode`] when the value is empty or
    /// contains characters outside `[a-z0-9_-]`.
    pub fn new(value: impl Into<String>) -> Result<Self, CatalogError> {
        let raw = value.into();
        let normalized = raw.trim();
        let is_valid = !normalized.is_empty()
            && normalized
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !is_valid {
            return Err(CatalogError::InvalidTaskCode(raw));
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Returns the code as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TaskCode {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TaskCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Provider qualification level on the closed 1..=4 scale.
///
/// Level 4 is the emergency tier; emergency jobs are only ever offered to
/// level-4 providers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProviderLevel(u8);

impl ProviderLevel {
    /// The highest level, required for emergency work.
    pub const EMERGENCY: Self = Self(4);

    /// Creates a validated provider level.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidLevel`] when the value is outside
    /// `1..=4`.
    pub const fn new(value: u8) -> Result<Self, CatalogError> {
        if value == 0 || value > 4 {
            return Err(CatalogError::InvalidLevel(value));
        }
        Ok(Self(value))
    }

    /// Returns the numeric level.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Returns whether this level qualifies for emergency work.
    #[must_use]
    pub const fn is_emergency_tier(self) -> bool {
        self.0 == Self::EMERGENCY.0
    }
}

impl fmt::Display for ProviderLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Normalized service region code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Region(String);

impl Region {
    /// Creates a validated region code.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::EmptyRegion`] when the value is empty after
    /// trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, CatalogError> {
        let raw = value.into();
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(CatalogError::EmptyRegion);
        }
        Ok(Self(normalized))
    }

    /// Returns the region code as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One predefined task in the closed catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTask {
    code: TaskCode,
    name: String,
    required_level: ProviderLevel,
    base_price: Money,
    duration_minutes: u32,
    emergency_multiplier: BasisPoints,
    emergency_minimum: Money,
}

impl ServiceTask {
    /// Creates a catalog task entry.
    ///
    /// The base price already reflects the task's required level; the
    /// emergency multiplier and minimum charge apply only to emergency
    /// quotes.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::MultiplierBelowUnit`] when the emergency
    /// multiplier is below `10000` basis points (1.0x).
    pub fn new(
        code: TaskCode,
        name: impl Into<String>,
        required_level: ProviderLevel,
        base_price: Money,
        duration_minutes: u32,
        emergency_multiplier: BasisPoints,
        emergency_minimum: Money,
    ) -> Result<Self, CatalogError> {
        if emergency_multiplier.value() < BasisPoints::UNIT.value() {
            return Err(CatalogError::MultiplierBelowUnit(
                emergency_multiplier.value(),
            ));
        }
        Ok(Self {
            code,
            name: name.into(),
            required_level,
            base_price,
            duration_minutes,
            emergency_multiplier,
            emergency_minimum,
        })
    }

    /// Returns the task code.
    #[must_use]
    pub const fn code(&self) -> &TaskCode {
        &self.code
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the minimum provider level allowed to take this task.
    #[must_use]
    pub const fn required_level(&self) -> ProviderLevel {
        self.required_level
    }

    /// Returns the standard (non-emergency) price.
    #[must_use]
    pub const fn base_price(&self) -> Money {
        self.base_price
    }

    /// Returns the nominal job duration in minutes.
    #[must_use]
    pub const fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    /// Returns the emergency price multiplier in basis points.
    #[must_use]
    pub const fn emergency_multiplier(&self) -> BasisPoints {
        self.emergency_multiplier
    }

    /// Returns the minimum charge for an emergency call-out.
    #[must_use]
    pub const fn emergency_minimum(&self) -> Money {
        self.emergency_minimum
    }
}

/// Service-level commitments for one task/level/region combination.
///
/// Profiles are reference data; at job confirmation the applicable profile
/// is copied verbatim into the job's SLA snapshot and never re-read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaProfile {
    response_minutes: u32,
    arrival_minutes: u32,
    completion_minutes: u32,
    terms: serde_json::Value,
}

impl SlaProfile {
    /// Creates an SLA profile.
    #[must_use]
    pub const fn new(
        response_minutes: u32,
        arrival_minutes: u32,
        completion_minutes: u32,
        terms: serde_json::Value,
    ) -> Self {
        Self {
            response_minutes,
            arrival_minutes,
            completion_minutes,
            terms,
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

    /// Opaque frozen terms attached to the profile.
    #[must_use]
    pub const fn terms(&self) -> &serde_json::Value {
        &self.terms
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::expect_used, reason = "test code uses expect for assertion clarity")]

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("drain_cleaning")]
    #[case("boiler-repair-2")]
    fn task_codes_accept_the_closed_alphabet(#[case] raw: &str) {
        assert_eq!(TaskCode::new(raw).expect("valid code").as_str(), raw);
    }

    #[rstest]
    #[case("")]
    #[case("Drain Cleaning")]
    #[case("drain.cleaning")]
    fn task_codes_reject_free_text(#[case] raw: &str) {
        assert!(matches!(
            TaskCode::new(raw),
            Err(CatalogError::InvalidTaskCode(_))
        ));
    }

    #[rstest]
    fn provider_levels_are_bounded() {
        assert!(ProviderLevel::new(0).is_err());
        assert!(ProviderLevel::new(5).is_err());
        assert!(ProviderLevel::new(4).expect("valid level").is_emergency_tier());
        assert!(!ProviderLevel::new(3).expect("valid level").is_emergency_tier());
    }

    #[rstest]
    fn regions_normalize_case_and_whitespace() {
        let region = Region::new("  Springfield ").expect("valid region");
        assert_eq!(region.as_str(), "springfield");
        assert!(matches!(Region::new("   "), Err(CatalogError::EmptyRegion)));
    }

    #[rstest]
    fn emergency_multipliers_may_not_discount() {
        use crate::pricing::{BasisPoints, Currency, Money};
        let price = Money::from_minor(15_000, Currency::Usd).expect("valid amount");
        let result = ServiceTask::new(
            TaskCode::new("drain_cleaning").expect("valid code"),
            "Drain cleaning",
            ProviderLevel::new(2).expect("valid level"),
            price,
            60,
            BasisPoints::new(9_999),
            price,
        );
        assert!(matches!(result, Err(CatalogError::MultiplierBelowUnit(9_999))));
    }
}
