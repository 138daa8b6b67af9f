//! Deterministic candidate ranking.
//!
//! Scores are integers so sorting is a total order and repeated runs over
//! the same inputs always produce the same offer sequence. Ties break on
//! estimated arrival and then on provider identifier.

use super::config::RankingWeights;
use super::provider::ProviderSnapshot;
use crate::job::domain::{GeoPoint, MatchScore};

/// Assumed average travel speed, in metres per minute (30 km/h).
const TRAVEL_METERS_PER_MINUTE: u32 = 500;

/// A candidate with its derived ranking inputs.
#[derive(Debug, Clone)]
pub struct RankedProvider {
    /// The candidate as read from the directory.
    pub snapshot: ProviderSnapshot,
    /// Straight-line distance from the job, in metres.
    pub distance_meters: u32,
    /// Estimated travel time at the assumed average speed.
    pub eta_minutes: u32,
    /// Composite ranking score, higher is better.
    pub score: MatchScore,
}

/// Approximate straight-line distance between two points, in metres.
///
/// An equirectangular approximation is plenty at dispatch radii (tens of
/// kilometres); the result is clamped into `u32`.
#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "geodesic approximation converts through f64 and clamps back to integer metres"
)]
#[must_use]
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> u32 {
    const METERS_PER_DEGREE: f64 = 111_320.0;
    const MICRO: f64 = 1e-6;
    let lat_a = f64::from(a.lat_e6()) * MICRO;
    let lat_b = f64::from(b.lat_e6()) * MICRO;
    let lng_a = f64::from(a.lng_e6()) * MICRO;
    let lng_b = f64::from(b.lng_e6()) * MICRO;
    let mean_lat = ((lat_a + lat_b) / 2.0).to_radians();
    let dx = (lng_b - lng_a) * METERS_PER_DEGREE * mean_lat.cos();
    let dy = (lat_b - lat_a) * METERS_PER_DEGREE;
    let distance = dx.hypot(dy);
    if distance >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        distance as u32
    }
}

/// Estimated travel time for a distance, rounded up to whole minutes.
#[must_use]
pub const fn estimate_arrival_minutes(distance_meters: u32) -> u32 {
    distance_meters.div_ceil(TRAVEL_METERS_PER_MINUTE)
}

/// Computes the composite score for one candidate.
///
/// Rating and historical acceptance push a candidate up, distance pushes
/// it down; the weights come from dispatch configuration.
#[must_use]
pub fn score(
    provider: &ProviderSnapshot,
    distance_meters: u32,
    weights: &RankingWeights,
) -> MatchScore {
    let rating = i64::from(provider.rating_milli).saturating_mul(weights.rating);
    let acceptance =
        i64::from(provider.acceptance_rate.value()).saturating_mul(weights.acceptance);
    let distance_penalty = i64::from(distance_meters).saturating_mul(weights.distance);
    MatchScore::new(
        rating
            .saturating_add(acceptance)
            .saturating_sub(distance_penalty),
    )
}

/// Ranks candidates best-first.
///
/// Sorting is total: score descending, then estimated arrival ascending,
/// then provider identifier ascending.
#[must_use]
pub fn rank(
    candidates: Vec<ProviderSnapshot>,
    center: GeoPoint,
    weights: &RankingWeights,
) -> Vec<RankedProvider> {
    let mut ranked: Vec<RankedProvider> = candidates
        .into_iter()
        .map(|snapshot| {
            let distance = distance_meters(center, snapshot.location);
            RankedProvider {
                distance_meters: distance,
                eta_minutes: estimate_arrival_minutes(distance),
                score: score(&snapshot, distance, weights),
                snapshot,
            }
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.eta_minutes.cmp(&b.eta_minutes))
            .then_with(|| a.snapshot.id.cmp(&b.snapshot.id))
    });
    ranked
}
