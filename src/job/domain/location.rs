//! Geographic point and structured address types.

use super::error::JobDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A geographic point in microdegrees.
///
/// Coordinates are stored as integers (degrees × 10⁶) so domain types
/// stay `Eq`/`Hash` and monetary-grade lint rules hold; distance math in
/// the dispatcher converts as needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeoPoint {
    lat_e6: i32,
    lng_e6: i32,
}

impl GeoPoint {
    /// Creates a validated point from microdegrees.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidCoordinates`] when latitude is
    /// outside ±90° or longitude outside ±180°.
    pub const fn from_micro(lat_e6: i32, lng_e6: i32) -> Result<Self, JobDomainError> {
        if lat_e6 < -90_000_000
            || lat_e6 > 90_000_000
            || lng_e6 < -180_000_000
            || lng_e6 > 180_000_000
        {
            return Err(JobDomainError::InvalidCoordinates { lat_e6, lng_e6 });
        }
        Ok(Self { lat_e6, lng_e6 })
    }

    /// Returns the latitude in microdegrees.
    #[must_use]
    pub const fn lat_e6(self) -> i32 {
        self.lat_e6
    }

    /// Returns the longitude in microdegrees.
    #[must_use]
    pub const fn lng_e6(self) -> i32 {
        self.lng_e6
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}e-6, {}e-6)", self.lat_e6, self.lng_e6)
    }
}

/// Structured postal address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    line1: String,
    line2: Option<String>,
    city: String,
    postcode: String,
    country: String,
}

impl Address {
    /// Creates a validated address.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::EmptyAddressField`] when a required field
    /// is empty after trimming.
    pub fn new(
        line1: impl Into<String>,
        line2: Option<String>,
        city: impl Into<String>,
        postcode: impl Into<String>,
        country: impl Into<String>,
    ) -> Result<Self, JobDomainError> {
        let line1 = required(line1.into(), "line1")?;
        let city = required(city.into(), "city")?;
        let postcode = required(postcode.into(), "postcode")?;
        let country = required(country.into(), "country")?;
        Ok(Self {
            line1,
            line2: line2.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty()),
            city,
            postcode,
            country,
        })
    }

    /// Returns the first address line.
    #[must_use]
    pub fn line1(&self) -> &str {
        &self.line1
    }

    /// Returns the optional second address line.
    #[must_use]
    pub fn line2(&self) -> Option<&str> {
        self.line2.as_deref()
    }

    /// Returns the city.
    #[must_use]
    pub fn city(&self) -> &str {
        &self.city
    }

    /// Returns the postal code.
    #[must_use]
    pub fn postcode(&self) -> &str {
        &self.postcode
    }

    /// Returns the country.
    #[must_use]
    pub fn country(&self) -> &str {
        &self.country
    }
}

fn required(value: String, field: &'static str) -> Result<String, JobDomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(JobDomainError::EmptyAddressField(field));
    }
    Ok(trimmed.to_owned())
}

/// Where the work happens: coordinates plus a structured address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLocation {
    point: GeoPoint,
    address: Address,
}

impl ServiceLocation {
    /// Creates a service location.
    #[must_use]
    pub const fn new(point: GeoPoint, address: Address) -> Self {
        Self { point, address }
    }

    /// Returns the geographic point.
    #[must_use]
    pub const fn point(&self) -> GeoPoint {
        self.point
    }

    /// Returns the structured address.
    #[must_use]
    pub const fn address(&self) -> &Address {
        &self.address
    }
}
