//! Shared fixtures: a deterministic clock and canonical domain builders.

#![expect(clippy::expect_used, reason = "test code uses expect for assertion clarity")]

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use std::sync::{Arc, RwLock};

use crate::catalog::{InMemoryCatalog, ProviderLevel, SlaProfile, TaskCode};
use crate::job::domain::{
    Address, CustomerId, GeoPoint, Job, JobPriority, NewJob, PaymentRef, ServiceLocation,
    SlaSnapshot,
};
use crate::pricing::{
    CommissionRate, Currency, FeeSchedule, Money, PricingSnapshot, quote,
};

/// Test clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    /// Creates a clock pinned to the given instant.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(now)),
        }
    }

    /// Creates a clock pinned to the canonical test morning.
    pub fn start_of_day() -> Self {
        Self::at(t0())
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().expect("clock lock");
        *now += by;
    }

    /// Pins the clock to a new instant.
    pub fn set(&self, to: DateTime<Utc>) {
        let mut now = self.now.write().expect("clock lock");
        *now = to;
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.read().expect("clock lock")
    }
}

/// Canonical test instant: a Monday morning.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub fn usd(minor: i64) -> Money {
    Money::from_minor(minor, Currency::Usd).expect("valid amount")
}

pub fn task_code() -> TaskCode {
    TaskCode::new("drain_cleaning").expect("valid code")
}

pub fn service_location() -> ServiceLocation {
    let point = GeoPoint::from_micro(51_500_000, -100_000).expect("valid point");
    let address = Address::new("12 Ada Road", None, "Springfield", "SP1 2AB", "US")
        .expect("valid address");
    ServiceLocation::new(point, address)
}

pub fn new_job_request(priority: JobPriority) -> NewJob {
    NewJob {
        customer_id: CustomerId::new(),
        task_code: task_code(),
        priority,
        location: service_location(),
        window: None,
    }
}

/// A standard SLA profile: respond in 30, arrive in 120, finish in 240.
pub fn standard_profile() -> SlaProfile {
    SlaProfile::new(30, 120, 240, serde_json::json!({"terms_version": "v1"}))
}

/// The emergency SLA profile: respond in 10, arrive in 45, finish in 120.
pub fn emergency_profile() -> SlaProfile {
    SlaProfile::new(10, 45, 120, serde_json::json!({"terms_version": "v1"}))
}

pub fn standard_sla() -> SlaSnapshot {
    SlaSnapshot::from_profile(&standard_profile())
}

pub fn emergency_sla() -> SlaSnapshot {
    SlaSnapshot::from_profile(&emergency_profile())
}

pub fn commission_rate() -> CommissionRate {
    CommissionRate::new(1_500).expect("valid rate")
}

/// Fee schedule used across service tests: $25 after acceptance, $50 once
/// the provider is en route.
pub fn fee_schedule() -> FeeSchedule {
    FeeSchedule::new(usd(2_500), usd(5_000)).expect("valid schedule")
}

/// Catalog with the drain-cleaning task and profiles for both the
/// standard and emergency tiers.
pub fn seeded_catalog() -> InMemoryCatalog {
    let catalog = InMemoryCatalog::new();
    catalog
        .insert_task(drain_cleaning_task())
        .expect("insert task");
    let level = ProviderLevel::new(2).expect("valid level");
    catalog
        .insert_default_profile(task_code(), level, standard_profile())
        .expect("insert profile");
    catalog
        .insert_default_profile(task_code(), ProviderLevel::EMERGENCY, emergency_profile())
        .expect("insert profile");
    catalog
}

pub fn drain_cleaning_task() -> crate::catalog::ServiceTask {
    crate::catalog::ServiceTask::new(
        task_code(),
        "Drain cleaning",
        ProviderLevel::new(2).expect("valid level"),
        usd(15_000),
        60,
        crate::pricing::BasisPoints::new(15_000),
        usd(20_000),
    )
    .expect("valid task")
}

/// Builds a pricing snapshot the way confirmation would.
pub fn quoted_pricing(emergency: bool) -> PricingSnapshot {
    quote(&drain_cleaning_task(), emergency, commission_rate()).expect("quote")
}

/// Drives a draft to pending match with frozen snapshots.
pub fn confirmed_job(priority: JobPriority, clock: &ManualClock) -> Job {
    let mut job = Job::new_draft(new_job_request(priority), clock);
    let emergency = matches!(priority, JobPriority::Emergency);
    let sla = if emergency {
        emergency_sla()
    } else {
        standard_sla()
    };
    let consent = emergency.then(|| crate::job::domain::EmergencyConsent::new("v1", clock.utc()));
    job.confirm(
        quoted_pricing(emergency),
        sla,
        consent,
        PaymentRef::new("auth-test"),
        clock,
    )
    .expect("confirm");
    job
}
