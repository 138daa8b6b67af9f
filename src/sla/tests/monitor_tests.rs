//! Sweep tests: breach detection, grace handling, idempotence, and the
//! job-level response clock.

#![expect(clippy::expect_used, reason = "test code uses expect for assertion clarity")]
#![expect(
    clippy::shadow_reuse,
    reason = "test code reuses variable names across successive sweeps"
)]

use std::sync::Arc;

use crate::job::adapters::memory::{InMemoryJobRepository, RecordingDispatcher};
use crate::job::domain::{
    Assignment, AssignmentStatus, CancelledBy, EscalationType, Job, JobPriority, JobStatus,
    MatchScore, ProviderId, SlaDeadlineKind,
};
use crate::job::ports::notification::LifecycleEvent;
use crate::job::ports::repository::{JobChange, JobRepository};
use crate::job::tests::support::{ManualClock, confirmed_job, t0};
use crate::sla::{SlaMonitor, SlaMonitorConfig};
use chrono::Duration;
use eyre::{bail, ensure};
use rstest::{fixture, rstest};

type TestMonitor = SlaMonitor<InMemoryJobRepository, RecordingDispatcher, ManualClock>;

struct Harness {
    monitor: TestMonitor,
    repository: Arc<InMemoryJobRepository>,
    notifier: Arc<RecordingDispatcher>,
    clock: Arc<ManualClock>,
}

#[fixture]
fn harness() -> Harness {
    let repository = Arc::new(InMemoryJobRepository::new());
    let notifier = Arc::new(RecordingDispatcher::new());
    let clock = Arc::new(ManualClock::start_of_day());
    let monitor = SlaMonitor::new(
        Arc::clone(&repository),
        Arc::clone(&notifier),
        Arc::clone(&clock),
        SlaMonitorConfig {
            arrival_grace_minutes: 15,
        },
    );
    Harness {
        monitor,
        repository,
        notifier,
        clock,
    }
}

/// Stores a confirmed job with an open offer.
async fn seed_offered(harness: &Harness, priority: JobPriority) -> eyre::Result<(Job, Assignment)> {
    let mut job = confirmed_job(priority, &harness.clock);
    harness.repository.create(&job).await?;
    let sla = job.sla().cloned().expect("confirmed job has sla");
    let assignment = Assignment::offer(
        job.id(),
        ProviderId::new(),
        MatchScore::new(100),
        Duration::minutes(5),
        &sla,
        &*harness.clock,
    );
    job.transition_to(JobStatus::Matched, &*harness.clock)?;
    let job = harness
        .repository
        .commit(JobChange::with_assignment(job, assignment.clone()))
        .await?;
    Ok((job, assignment))
}

/// Stores a confirmed job with an accepted assignment.
async fn seed_accepted(harness: &Harness, priority: JobPriority) -> eyre::Result<(Job, Assignment)> {
    let (mut job, mut assignment) = seed_offered(harness, priority).await?;
    let sla = job.sla().cloned().expect("sla");
    assignment.accept(job.location().point(), 15, &sla, &*harness.clock)?;
    job.apply_assignment(&assignment, &*harness.clock)?;
    let job = harness
        .repository
        .commit(JobChange::with_assignment(job, assignment.clone()))
        .await?;
    Ok((job, assignment))
}

async fn assert_breach_handled(
    harness: &Harness,
    job: &Job,
    deadline: SlaDeadlineKind,
) -> eyre::Result<()> {
    let stored = harness
        .repository
        .find_by_id(job.id())
        .await?
        .expect("job stored");
    ensure!(stored.status() == JobStatus::CancelledBySystem);
    let record = stored.cancellation().expect("cancellation record");
    ensure!(record.by == CancelledBy::System);
    ensure!(record.fee.is_zero());
    let escalations = harness.repository.escalations_for_job(job.id()).await?;
    ensure!(
        escalations
            .iter()
            .any(|escalation| escalation.kind() == EscalationType::SlaBreach)
    );
    let events = harness.notifier.events();
    ensure!(events.contains(&LifecycleEvent::SlaBreached {
        job_id: job.id(),
        deadline,
    }));
    ensure!(events.contains(&LifecycleEvent::Cancelled {
        job_id: job.id(),
        by: CancelledBy::System,
    }));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unanswered_emergency_offer_breaches_the_response_clock(
    harness: Harness,
) -> eyre::Result<()> {
    let (job, assignment) = seed_offered(&harness, JobPriority::Emergency).await?;
    // Emergency response window is 10 minutes.
    harness.clock.advance(Duration::minutes(11));

    let report = harness.monitor.sweep().await?;

    ensure!(report.examined == 1);
    ensure!(report.breaches == vec![(job.id(), SlaDeadlineKind::Response)]);
    ensure!(report.cancelled == vec![job.id()]);
    let stored = harness
        .repository
        .find_assignment(assignment.id())
        .await?
        .expect("assignment stored");
    ensure!(stored.status() == AssignmentStatus::Expired);
    ensure!(stored.sla_met(SlaDeadlineKind::Response) == Some(false));
    assert_breach_handled(&harness, &job, SlaDeadlineKind::Response).await?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn timely_acceptance_is_left_alone(harness: Harness) -> eyre::Result<()> {
    let (_, _) = seed_accepted(&harness, JobPriority::Emergency).await?;
    harness.clock.advance(Duration::minutes(15));

    let report = harness.monitor.sweep().await?;

    ensure!(report.examined == 1);
    ensure!(report.breaches.is_empty());
    ensure!(report.cancelled.is_empty());
    ensure!(harness.notifier.events().is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn arrival_breach_waits_out_the_grace_period(harness: Harness) -> eyre::Result<()> {
    let (job, assignment) = seed_accepted(&harness, JobPriority::Standard).await?;
    // Standard arrival window is 120 minutes from acceptance; the monitor
    // adds 15 minutes of grace on top.
    harness.clock.advance(Duration::minutes(125));
    let report = harness.monitor.sweep().await?;
    ensure!(report.breaches.is_empty());

    harness.clock.advance(Duration::minutes(11));
    let report = harness.monitor.sweep().await?;

    ensure!(report.breaches == vec![(job.id(), SlaDeadlineKind::Arrival)]);
    ensure!(report.cancelled == vec![job.id()]);
    let stored = harness
        .repository
        .find_assignment(assignment.id())
        .await?
        .expect("assignment stored");
    // The open assignment is closed alongside the job.
    ensure!(stored.status() == AssignmentStatus::Cancelled);
    ensure!(stored.sla_met(SlaDeadlineKind::Arrival) == Some(false));
    assert_breach_handled(&harness, &job, SlaDeadlineKind::Arrival).await?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn an_en_route_provider_is_not_cancelled_for_a_late_arrival(
    harness: Harness,
) -> eyre::Result<()> {
    let (mut job, mut assignment) = seed_accepted(&harness, JobPriority::Standard).await?;
    assignment.mark_en_route(&*harness.clock)?;
    job.apply_assignment(&assignment, &*harness.clock)?;
    let job = harness
        .repository
        .commit(JobChange::with_assignment(job, assignment.clone()))
        .await?;
    // Well past the 120-minute arrival window plus the 15-minute grace.
    harness.clock.advance(Duration::minutes(140));

    let report = harness.monitor.sweep().await?;

    ensure!(report.breaches == vec![(job.id(), SlaDeadlineKind::Arrival)]);
    ensure!(report.cancelled.is_empty());
    let stored = harness
        .repository
        .find_by_id(job.id())
        .await?
        .expect("job stored");
    // The provider signalled en-route, so the job rides out the breach.
    ensure!(stored.status() == JobStatus::ProviderEnRoute);
    let open = harness
        .repository
        .find_assignment(assignment.id())
        .await?
        .expect("assignment stored");
    ensure!(open.status() == AssignmentStatus::Accepted);
    ensure!(open.sla_met(SlaDeadlineKind::Arrival) == Some(false));
    let escalations = harness.repository.escalations_for_job(job.id()).await?;
    ensure!(
        escalations
            .iter()
            .any(|escalation| escalation.kind() == EscalationType::SlaBreach)
    );
    let events = harness.notifier.events();
    ensure!(events.contains(&LifecycleEvent::SlaBreached {
        job_id: job.id(),
        deadline: SlaDeadlineKind::Arrival,
    }));
    ensure!(
        !events
            .iter()
            .any(|event| matches!(event, LifecycleEvent::Cancelled { .. }))
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completion_overrun_escalates_without_cancelling(harness: Harness) -> eyre::Result<()> {
    let (job, mut assignment) = seed_accepted(&harness, JobPriority::Standard).await?;
    let mut job = harness
        .repository
        .find_by_id(job.id())
        .await?
        .expect("job stored");
    let sla = job.sla().cloned().expect("sla");
    assignment.mark_en_route(&*harness.clock)?;
    harness.clock.advance(Duration::minutes(30));
    assignment.mark_arrived(&*harness.clock)?;
    assignment.mark_started(&sla, &*harness.clock)?;
    job.apply_assignment(&assignment, &*harness.clock)?;
    let job = harness
        .repository
        .commit(JobChange::with_assignment(job, assignment.clone()))
        .await?;
    // Standard completion window is 240 minutes from start of work.
    harness.clock.advance(Duration::minutes(241));

    let report = harness.monitor.sweep().await?;

    ensure!(report.breaches == vec![(job.id(), SlaDeadlineKind::Completion)]);
    ensure!(report.cancelled.is_empty());
    let stored = harness
        .repository
        .find_by_id(job.id())
        .await?
        .expect("job stored");
    // The provider is allowed to finish; the breach is recorded for review.
    ensure!(stored.status() == JobStatus::InProgress);
    let escalations = harness.repository.escalations_for_job(job.id()).await?;
    ensure!(
        escalations
            .iter()
            .any(|escalation| escalation.kind() == EscalationType::SlaBreach)
    );
    let events = harness.notifier.events();
    ensure!(events.contains(&LifecycleEvent::SlaBreached {
        job_id: job.id(),
        deadline: SlaDeadlineKind::Completion,
    }));
    ensure!(
        !events
            .iter()
            .any(|event| matches!(event, LifecycleEvent::Cancelled { .. }))
    );

    // A second sweep sees the set-once flag and fires nothing new.
    let report = harness.monitor.sweep().await?;
    ensure!(report.breaches.is_empty());
    let escalations = harness.repository.escalations_for_job(job.id()).await?;
    ensure!(escalations.len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancelled_jobs_drop_out_of_later_sweeps(harness: Harness) -> eyre::Result<()> {
    let (job, _) = seed_offered(&harness, JobPriority::Emergency).await?;
    harness.clock.advance(Duration::minutes(11));
    let report = harness.monitor.sweep().await?;
    ensure!(report.breaches.len() == 1);

    let report = harness.monitor.sweep().await?;

    ensure!(report.examined == 0);
    ensure!(report.breaches.is_empty());
    let escalations = harness.repository.escalations_for_job(job.id()).await?;
    ensure!(escalations.len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn confirmed_job_nobody_accepted_is_cancelled_at_the_response_deadline(
    harness: Harness,
) -> eyre::Result<()> {
    let job = confirmed_job(JobPriority::Standard, &harness.clock);
    harness.repository.create(&job).await?;
    // Standard response window is 30 minutes from confirmation.
    harness.clock.advance(Duration::minutes(29));
    let report = harness.monitor.sweep().await?;
    ensure!(report.breaches.is_empty());

    harness.clock.advance(Duration::minutes(2));
    let report = harness.monitor.sweep().await?;

    ensure!(report.breaches == vec![(job.id(), SlaDeadlineKind::Response)]);
    ensure!(report.cancelled == vec![job.id()]);
    assert_breach_handled(&harness, &job, SlaDeadlineKind::Response).await?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn draft_jobs_are_never_swept(harness: Harness) -> eyre::Result<()> {
    let draft = Job::new_draft(
        crate::job::tests::support::new_job_request(JobPriority::Standard),
        &*harness.clock,
    );
    harness.repository.create(&draft).await?;
    harness.clock.advance(Duration::hours(12));

    let report = harness.monitor.sweep().await?;

    ensure!(report.examined == 1);
    ensure!(report.breaches.is_empty());
    let stored = harness
        .repository
        .find_by_id(draft.id())
        .await?
        .expect("draft stored");
    ensure!(stored.status() == JobStatus::Draft);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sweep_with_a_rewound_clock_takes_no_action(harness: Harness) -> eyre::Result<()> {
    let (job, _) = seed_offered(&harness, JobPriority::Emergency).await?;
    // A sweeper whose clock reads earlier than the offer must not fire,
    // even though its arithmetic would otherwise look overdue.
    harness.clock.set(t0() - Duration::hours(2));

    let report = harness.monitor.sweep().await?;

    if !report.breaches.is_empty() {
        bail!("expected no breaches, got {:?}", report.breaches);
    }
    let stored = harness
        .repository
        .find_by_id(job.id())
        .await?
        .expect("job stored");
    ensure!(stored.status() == JobStatus::Matched);
    Ok(())
}
