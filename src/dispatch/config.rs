//! Dispatch configuration.

use chrono::Duration;
use serde::Deserialize;

use crate::job::domain::JobPriority;

/// Ranking weights applied to candidate scoring.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RankingWeights {
    /// Penalty per metre of straight-line distance.
    pub distance: i64,
    /// Boost per millistar of rating.
    pub rating: i64,
    /// Boost per basis point of historical acceptance rate.
    pub acceptance: i64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            distance: 1,
            rating: 4,
            acceptance: 1,
        }
    }
}

/// Tunable dispatch parameters, loaded as data at startup.
///
/// `max_reoffers` deliberately has no default: exhausting the re-offer
/// budget cancels a paying customer's job, so deployments must state the
/// number explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DispatchConfig {
    /// How long a standard or urgent offer stays open, in minutes.
    pub offer_window_minutes: u32,
    /// How long an emergency offer stays open, in minutes.
    pub emergency_offer_window_minutes: u32,
    /// Maximum re-offers after the first before the job is escalated as
    /// having no provider available.
    pub max_reoffers: u32,
    /// Budget for one candidate search against the directory.
    pub search_timeout_ms: u64,
    /// Search radius for standard jobs, in metres.
    #[serde(default = "default_standard_radius")]
    pub standard_radius_meters: u32,
    /// Search radius for urgent same-day jobs, in metres.
    #[serde(default = "default_urgent_radius")]
    pub urgent_radius_meters: u32,
    /// Search radius for emergency call-outs, in metres.
    #[serde(default = "default_emergency_radius")]
    pub emergency_radius_meters: u32,
    /// Candidate scoring weights.
    #[serde(default)]
    pub weights: RankingWeights,
}

const fn default_standard_radius() -> u32 {
    25_000
}

const fn default_urgent_radius() -> u32 {
    15_000
}

const fn default_emergency_radius() -> u32 {
    10_000
}

impl DispatchConfig {
    /// Returns the search radius for a priority tier.
    #[must_use]
    pub const fn radius_for(&self, priority: JobPriority) -> u32 {
        match priority {
            JobPriority::Standard => self.standard_radius_meters,
            JobPriority::Urgent => self.urgent_radius_meters,
            JobPriority::Emergency => self.emergency_radius_meters,
        }
    }

    /// Returns the offer window for a job.
    #[must_use]
    pub fn offer_window(&self, emergency: bool) -> Duration {
        let minutes = if emergency {
            self.emergency_offer_window_minutes
        } else {
            self.offer_window_minutes
        };
        Duration::minutes(i64::from(minutes))
    }
}
