//! Unit tests for the assignment offer protocol and its three SLA clocks.

#![expect(clippy::expect_used, reason = "test code uses expect for assertion clarity")]
#![expect(
    clippy::shadow_reuse,
    reason = "test code reuses variable names in sequential assertions"
)]

use super::support::{ManualClock, emergency_sla, standard_sla, t0};
use crate::job::domain::{
    Assignment, AssignmentStatus, DeclineReason, GeoPoint, JobDomainError, JobId, MatchScore,
    ProviderId, SlaDeadlineKind,
};
use chrono::Duration;
use eyre::{bail, ensure};
use mockable::Clock;
use rstest::{fixture, rstest};

#[fixture]
fn clock() -> ManualClock {
    ManualClock::start_of_day()
}

fn here() -> GeoPoint {
    GeoPoint::from_micro(51_500_000, -100_000).expect("valid point")
}

fn offer(clock: &ManualClock) -> Assignment {
    Assignment::offer(
        JobId::new(),
        ProviderId::new(),
        MatchScore::new(100),
        Duration::minutes(10),
        &standard_sla(),
        clock,
    )
}

#[rstest]
fn offer_computes_deadlines_from_the_frozen_snapshot(clock: ManualClock) {
    let assignment = offer(&clock);

    assert_eq!(assignment.status(), AssignmentStatus::Offered);
    assert_eq!(assignment.offered_at(), t0());
    assert_eq!(assignment.offer_expires_at(), t0() + Duration::minutes(10));
    assert_eq!(
        assignment.deadline(SlaDeadlineKind::Response),
        Some(t0() + Duration::minutes(30))
    );
    // Arrival and completion clocks do not exist until their basis events.
    assert_eq!(assignment.deadline(SlaDeadlineKind::Arrival), None);
    assert_eq!(assignment.deadline(SlaDeadlineKind::Completion), None);
}

#[rstest]
fn acceptance_within_the_window_meets_the_response_clock(clock: ManualClock) -> eyre::Result<()> {
    let mut assignment = offer(&clock);
    clock.advance(Duration::seconds(90));

    assignment.accept(here(), 15, &standard_sla(), &clock)?;

    ensure!(assignment.status() == AssignmentStatus::Accepted);
    ensure!(assignment.sla_met(SlaDeadlineKind::Response) == Some(true));
    ensure!(assignment.responded_at() == Some(t0() + Duration::seconds(90)));
    // The arrival clock starts at acceptance.
    ensure!(
        assignment.deadline(SlaDeadlineKind::Arrival)
            == Some(t0() + Duration::seconds(90) + Duration::minutes(120))
    );
    ensure!(assignment.estimated_arrival_minutes() == Some(15));
    ensure!(assignment.provider_location_at_acceptance() == Some(here()));
    Ok(())
}

#[rstest]
fn acceptance_past_the_hard_expiry_is_rejected(clock: ManualClock) -> eyre::Result<()> {
    let mut assignment = offer(&clock);
    clock.advance(Duration::minutes(11));

    let result = assignment.accept(here(), 15, &standard_sla(), &clock);

    if result != Err(JobDomainError::OfferExpired(assignment.id())) {
        bail!("expected OfferExpired, got {result:?}");
    }
    ensure!(assignment.status() == AssignmentStatus::Offered);
    ensure!(assignment.sla_met(SlaDeadlineKind::Response).is_none());
    Ok(())
}

#[rstest]
fn decline_records_the_reason_and_closes_the_offer(clock: ManualClock) -> eyre::Result<()> {
    let mut assignment = offer(&clock);

    assignment.decline(DeclineReason::WrongSkills, &clock)?;

    ensure!(assignment.status() == AssignmentStatus::Declined);
    ensure!(assignment.decline_reason() == Some(DeclineReason::WrongSkills));
    ensure!(!assignment.status().is_open());

    // The offer cannot be accepted afterwards.
    let result = assignment.accept(here(), 15, &standard_sla(), &clock);
    ensure!(result.is_err());
    Ok(())
}

#[rstest]
fn expiry_marks_the_response_clock_unmet(clock: ManualClock) -> eyre::Result<()> {
    let mut assignment = offer(&clock);
    clock.advance(Duration::minutes(10));

    assignment.expire(&clock)?;

    ensure!(assignment.status() == AssignmentStatus::Expired);
    ensure!(assignment.sla_met(SlaDeadlineKind::Response) == Some(false));
    Ok(())
}

#[rstest]
fn sla_flags_are_set_once(clock: ManualClock) -> eyre::Result<()> {
    let mut assignment = offer(&clock);
    clock.advance(Duration::minutes(10));
    assignment.expire(&clock)?;

    // A second evaluation cannot flip the recorded outcome.
    ensure!(!assignment.mark_sla(SlaDeadlineKind::Response, true));
    ensure!(assignment.sla_met(SlaDeadlineKind::Response) == Some(false));
    Ok(())
}

#[rstest]
fn progress_stamps_enforce_order_and_uniqueness(clock: ManualClock) -> eyre::Result<()> {
    let sla = standard_sla();
    let mut assignment = offer(&clock);
    assignment.accept(here(), 15, &sla, &clock)?;

    let result = assignment.mark_arrived(&clock);
    if result
        != Err(JobDomainError::ProgressOutOfOrder {
            assignment_id: assignment.id(),
            missing: "en_route",
        })
    {
        bail!("expected ProgressOutOfOrder, got {result:?}");
    }

    assignment.mark_en_route(&clock)?;
    let result = assignment.mark_en_route(&clock);
    if result
        != Err(JobDomainError::DuplicateProgressStamp {
            assignment_id: assignment.id(),
            stamp: "en_route",
        })
    {
        bail!("expected DuplicateProgressStamp, got {result:?}");
    }

    ensure!(assignment.mark_started(&sla, &clock).is_err());
    assignment.mark_arrived(&clock)?;
    ensure!(assignment.complete(&clock).is_err());
    assignment.mark_started(&sla, &clock)?;
    assignment.complete(&clock)?;
    ensure!(assignment.status() == AssignmentStatus::Completed);
    Ok(())
}

#[rstest]
fn timely_arrival_and_completion_meet_their_clocks(clock: ManualClock) -> eyre::Result<()> {
    let sla = emergency_sla();
    let mut assignment = Assignment::offer(
        JobId::new(),
        ProviderId::new(),
        MatchScore::new(100),
        Duration::minutes(5),
        &sla,
        &clock,
    );
    assignment.accept(here(), 15, &sla, &clock)?;
    assignment.mark_en_route(&clock)?;
    clock.advance(Duration::minutes(30));
    assignment.mark_arrived(&clock)?;
    ensure!(assignment.sla_met(SlaDeadlineKind::Arrival) == Some(true));

    assignment.mark_started(&sla, &clock)?;
    ensure!(
        assignment.deadline(SlaDeadlineKind::Completion)
            == Some(clock.utc() + Duration::minutes(120))
    );
    clock.advance(Duration::minutes(90));
    assignment.complete(&clock)?;
    ensure!(assignment.sla_met(SlaDeadlineKind::Completion) == Some(true));
    Ok(())
}

#[rstest]
fn late_arrival_and_completion_record_the_breach(clock: ManualClock) -> eyre::Result<()> {
    let sla = emergency_sla();
    let mut assignment = Assignment::offer(
        JobId::new(),
        ProviderId::new(),
        MatchScore::new(100),
        Duration::minutes(5),
        &sla,
        &clock,
    );
    assignment.accept(here(), 15, &sla, &clock)?;
    assignment.mark_en_route(&clock)?;
    clock.advance(Duration::minutes(46));
    assignment.mark_arrived(&clock)?;
    ensure!(assignment.sla_met(SlaDeadlineKind::Arrival) == Some(false));

    assignment.mark_started(&sla, &clock)?;
    clock.advance(Duration::minutes(121));
    assignment.complete(&clock)?;
    ensure!(assignment.sla_met(SlaDeadlineKind::Completion) == Some(false));
    Ok(())
}

#[rstest]
fn cancel_is_only_legal_while_open(clock: ManualClock) -> eyre::Result<()> {
    let mut open = offer(&clock);
    open.cancel(&clock)?;
    ensure!(open.status() == AssignmentStatus::Cancelled);

    let mut declined = offer(&clock);
    declined.decline(DeclineReason::Other, &clock)?;
    ensure!(declined.cancel(&clock).is_err());
    Ok(())
}
