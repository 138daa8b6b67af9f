//! Service orchestration tests for the customer-facing job lifecycle.

#![expect(clippy::expect_used, reason = "test code uses expect for assertion clarity")]
#![expect(
    clippy::shadow_reuse,
    reason = "test code rebinds the job as it advances through phases"
)]

use std::sync::Arc;

use super::support::{
    ManualClock, commission_rate, fee_schedule, new_job_request, seeded_catalog, task_code, usd,
};
use crate::catalog::{InMemoryCatalog, ProviderLevel, ServiceTask, TaskCode};
use crate::job::adapters::memory::{
    InMemoryJobRepository, PaymentCall, RecordingDispatcher, RecordingPaymentGateway,
};
use crate::job::domain::{
    Assignment, CancelledBy, EmergencyConsent, Job, JobDomainError, JobId, JobPriority, JobStatus,
    MatchScore, NoteTag, ProviderId,
};
use crate::job::ports::notification::LifecycleEvent;
use crate::job::ports::payment::{MockPaymentGateway, PaymentError};
use crate::job::ports::repository::{JobChange, JobRepository, JobRepositoryError};
use crate::job::services::{JobLifecycleError, JobLifecycleService};
use crate::pricing::{BasisPoints, CancellationReason};
use chrono::Duration;
use eyre::{bail, ensure};
use mockable::Clock;
use rstest::{fixture, rstest};

type TestService = JobLifecycleService<
    InMemoryJobRepository,
    InMemoryCatalog,
    RecordingPaymentGateway,
    RecordingDispatcher,
    ManualClock,
>;

struct Harness {
    service: TestService,
    repository: Arc<InMemoryJobRepository>,
    catalog: Arc<InMemoryCatalog>,
    payments: Arc<RecordingPaymentGateway>,
    notifier: Arc<RecordingDispatcher>,
    clock: Arc<ManualClock>,
}

#[fixture]
fn harness() -> Harness {
    let repository = Arc::new(InMemoryJobRepository::new());
    let catalog = Arc::new(seeded_catalog());
    let payments = Arc::new(RecordingPaymentGateway::new());
    let notifier = Arc::new(RecordingDispatcher::new());
    let clock = Arc::new(ManualClock::start_of_day());
    let service = JobLifecycleService::new(
        Arc::clone(&repository),
        Arc::clone(&catalog),
        Arc::clone(&payments),
        Arc::clone(&notifier),
        Arc::clone(&clock),
        fee_schedule(),
        commission_rate(),
    );
    Harness {
        service,
        repository,
        catalog,
        payments,
        notifier,
        clock,
    }
}

/// Seeds a confirmed job with an accepted assignment, bypassing dispatch.
async fn seed_accepted(harness: &Harness) -> eyre::Result<Job> {
    let draft = harness
        .service
        .create_draft(new_job_request(JobPriority::Standard))
        .await?;
    let mut job = harness.service.confirm(draft.id(), None).await?;
    let sla = job.sla().cloned().expect("confirmed job has sla");
    let mut assignment = Assignment::offer(
        job.id(),
        ProviderId::new(),
        MatchScore::new(100),
        Duration::minutes(10),
        &sla,
        &*harness.clock,
    );
    job.transition_to(JobStatus::Matched, &*harness.clock)?;
    let mut job = harness
        .repository
        .commit(JobChange::with_assignment(job, assignment.clone()))
        .await?;
    assignment.accept(job.location().point(), 15, &sla, &*harness.clock)?;
    job.apply_assignment(&assignment, &*harness.clock)?;
    let job = harness
        .repository
        .commit(JobChange::with_assignment(job, assignment))
        .await?;
    Ok(job)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_draft_rejects_codes_outside_the_catalog(harness: Harness) {
    let mut request = new_job_request(JobPriority::Standard);
    request.task_code = TaskCode::new("window_tinting").expect("valid code");

    let result = harness.service.create_draft(request).await;

    assert!(matches!(result, Err(JobLifecycleError::UnknownTask(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn confirm_freezes_quote_and_authorizes_payment(harness: Harness) -> eyre::Result<()> {
    let draft = harness
        .service
        .create_draft(new_job_request(JobPriority::Standard))
        .await?;
    let job = harness.service.confirm(draft.id(), None).await?;

    ensure!(job.status() == JobStatus::PendingMatch);
    let pricing = job.pricing().expect("pricing frozen");
    ensure!(pricing.quoted_price() == usd(15_000));
    let sla = job.sla().expect("sla frozen");
    ensure!(sla.response_minutes() == 30);
    ensure!(
        harness.payments.calls() == vec![PaymentCall::Authorize(job.id(), pricing.quoted_price())]
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn confirmed_jobs_keep_their_quote_when_the_catalog_reprices(
    harness: Harness,
) -> eyre::Result<()> {
    let draft = harness
        .service
        .create_draft(new_job_request(JobPriority::Standard))
        .await?;
    let job = harness.service.confirm(draft.id(), None).await?;

    let repriced = ServiceTask::new(
        task_code(),
        "Drain cleaning",
        ProviderLevel::new(2).expect("valid level"),
        usd(99_000),
        60,
        BasisPoints::new(15_000),
        usd(120_000),
    )
    .expect("valid task");
    harness.catalog.insert_task(repriced)?;

    let stored = harness
        .repository
        .find_by_id(job.id())
        .await?
        .expect("job stored");
    let pricing = stored.pricing().expect("pricing");
    ensure!(pricing.quoted_price() == usd(15_000));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn emergency_confirmation_applies_multiplier_and_needs_consent(
    harness: Harness,
) -> eyre::Result<()> {
    let draft = harness
        .service
        .create_draft(new_job_request(JobPriority::Emergency))
        .await?;

    let result = harness.service.confirm(draft.id(), None).await;
    if !matches!(
        result,
        Err(JobLifecycleError::Domain(JobDomainError::MissingConsent(_)))
    ) {
        bail!("expected MissingConsent, got {result:?}");
    }

    let consent = EmergencyConsent::new("v1", harness.clock.utc());
    let job = harness.service.confirm(draft.id(), Some(consent)).await?;
    let pricing = job.pricing().expect("pricing");
    // 150.00 x 1.5 = 225.00, above the 200.00 emergency minimum.
    ensure!(pricing.quoted_price() == usd(22_500));
    let sla = job.sla().expect("sla");
    ensure!(sla.response_minutes() == 10);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn declined_authorization_leaves_the_draft_untouched(harness: Harness) -> eyre::Result<()> {
    let draft = harness
        .service
        .create_draft(new_job_request(JobPriority::Standard))
        .await?;
    harness.payments.decline_authorizations();

    let result = harness.service.confirm(draft.id(), None).await;

    ensure!(matches!(result, Err(JobLifecycleError::Payment(_))));
    let stored = harness
        .repository
        .find_by_id(draft.id())
        .await?
        .expect("draft stored");
    ensure!(stored.status() == JobStatus::Draft);
    ensure!(stored.pricing().is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn progress_is_rejected_out_of_order(harness: Harness) -> eyre::Result<()> {
    let job = seed_accepted(&harness).await?;

    let result = harness.service.record_arrival(job.id()).await;

    ensure!(matches!(
        result,
        Err(JobLifecycleError::Domain(
            JobDomainError::ProgressOutOfOrder { .. }
        ))
    ));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completion_splits_commission_and_captures_payment(harness: Harness) -> eyre::Result<()> {
    let job = seed_accepted(&harness).await?;
    harness.service.record_en_route(job.id()).await?;
    harness.service.record_arrival(job.id()).await?;
    harness.service.record_started(job.id()).await?;

    let job = harness.service.complete(job.id()).await?;

    ensure!(job.status() == JobStatus::Completed);
    let pricing = job.pricing().expect("pricing");
    // 15% of 150.00: 22.50 commission, 127.50 payout.
    ensure!(pricing.final_price() == Some(usd(15_000)));
    ensure!(pricing.commission() == Some(usd(2_250)));
    ensure!(pricing.provider_payout() == Some(usd(12_750)));
    let payment = job.payment().expect("payment ref");
    ensure!(
        harness
            .payments
            .calls()
            .contains(&PaymentCall::Capture(payment.clone()))
    );
    ensure!(
        harness
            .notifier
            .events()
            .contains(&LifecycleEvent::Completed { job_id: job.id() })
    );
    Ok(())
}

#[rstest]
#[case::before_acceptance(false, false, 0, 15_000)]
#[case::accepted(true, false, 2_500, 12_500)]
#[case::en_route(true, true, 5_000, 10_000)]
#[tokio::test(flavor = "multi_thread")]
async fn cancellation_fees_follow_the_phase(
    harness: Harness,
    #[case] accept_first: bool,
    #[case] en_route_first: bool,
    #[case] expected_fee: i64,
    #[case] expected_refund: i64,
) -> eyre::Result<()> {
    let job_id = if accept_first {
        let job = seed_accepted(&harness).await?;
        if en_route_first {
            harness.service.record_en_route(job.id()).await?;
        }
        job.id()
    } else {
        let draft = harness
            .service
            .create_draft(new_job_request(JobPriority::Standard))
            .await?;
        harness.service.confirm(draft.id(), None).await?.id()
    };

    let job = harness
        .service
        .cancel(
            job_id,
            CancelledBy::Customer,
            CancellationReason::CustomerChangedMind,
        )
        .await?;

    ensure!(job.status() == JobStatus::CancelledByCustomer);
    let record = job.cancellation().expect("cancellation record");
    ensure!(record.fee == usd(expected_fee));
    let payment = job.payment().cloned().expect("payment ref");
    ensure!(
        harness
            .payments
            .calls()
            .contains(&PaymentCall::Refund(payment, usd(expected_refund)))
    );
    // Any open assignment closes in the same commit.
    ensure!(harness.repository.active_assignment(job_id).await?.is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dispute_then_refund_reverses_the_settlement(harness: Harness) -> eyre::Result<()> {
    let job = seed_accepted(&harness).await?;
    harness.service.record_en_route(job.id()).await?;
    harness.service.record_arrival(job.id()).await?;
    harness.service.record_started(job.id()).await?;
    harness.service.complete(job.id()).await?;

    harness.service.open_dispute(job.id()).await?;
    let job = harness.service.refund(job.id()).await?;

    ensure!(job.status() == JobStatus::Refunded);
    let pricing = job.pricing().expect("pricing");
    ensure!(pricing.is_refunded());
    let payment = job.payment().cloned().expect("payment ref");
    ensure!(
        harness
            .payments
            .calls()
            .contains(&PaymentCall::Refund(payment, usd(15_000)))
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn refund_without_dispute_is_rejected(harness: Harness) -> eyre::Result<()> {
    let draft = harness
        .service
        .create_draft(new_job_request(JobPriority::Standard))
        .await?;
    harness.service.confirm(draft.id(), None).await?;

    let result = harness.service.refund(draft.id()).await;

    ensure!(matches!(
        result,
        Err(JobLifecycleError::Domain(
            JobDomainError::InvalidTransition { .. }
        ))
    ));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn terminal_jobs_keep_serving_their_final_snapshot(harness: Harness) -> eyre::Result<()> {
    let draft = harness
        .service
        .create_draft(new_job_request(JobPriority::Standard))
        .await?;
    harness.service.confirm(draft.id(), None).await?;
    harness
        .service
        .cancel(
            draft.id(),
            CancelledBy::Customer,
            CancellationReason::CustomerChangedMind,
        )
        .await?;

    let stored = harness
        .repository
        .find_by_id(draft.id())
        .await?
        .expect("terminal job still readable");
    ensure!(stored.status() == JobStatus::CancelledByCustomer);
    ensure!(stored.cancellation().is_some());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stale_writers_lose_the_commit_race(harness: Harness) -> eyre::Result<()> {
    let draft = harness
        .service
        .create_draft(new_job_request(JobPriority::Standard))
        .await?;
    let confirmed = harness.service.confirm(draft.id(), None).await?;

    // Two writers load the same version; the slower commit must fail.
    let mut first = confirmed.clone();
    let mut second = confirmed;
    first.add_note(NoteTag::PetsOnPremises, &*harness.clock);
    second.add_note(NoteTag::ParkingDifficult, &*harness.clock);
    harness.repository.commit(JobChange::job_only(first)).await?;
    let result = harness.repository.commit(JobChange::job_only(second)).await;

    match result {
        Err(err) if err.is_stale() => Ok(()),
        other => bail!("expected stale-state conflict, got {other:?}"),
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_job_reports_not_found(harness: Harness) {
    let result = harness.service.confirm(JobId::new(), None).await;
    assert!(matches!(result, Err(JobLifecycleError::JobNotFound(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_capture_leaves_the_job_in_progress(harness: Harness) -> eyre::Result<()> {
    let seeded = seed_accepted(&harness).await?;
    harness.service.record_en_route(seeded.id()).await?;
    harness.service.record_arrival(seeded.id()).await?;
    harness.service.record_started(seeded.id()).await?;

    let mut payments = MockPaymentGateway::new();
    payments
        .expect_capture()
        .returning(|_| Err(PaymentError::Declined("card expired".to_owned())));
    let flaky = JobLifecycleService::new(
        Arc::clone(&harness.repository),
        Arc::clone(&harness.catalog),
        Arc::new(payments),
        Arc::clone(&harness.notifier),
        Arc::clone(&harness.clock),
        fee_schedule(),
        commission_rate(),
    );

    let result = flaky.complete(seeded.id()).await;

    ensure!(matches!(result, Err(JobLifecycleError::Payment(_))));
    let stored = harness
        .repository
        .find_by_id(seeded.id())
        .await?
        .expect("job stored");
    // Capture failed before the commit, so nothing was persisted.
    ensure!(stored.status() == JobStatus::InProgress);
    ensure!(stored.pricing().expect("pricing").final_price().is_none());
    ensure!(
        !harness
            .notifier
            .events()
            .iter()
            .any(|event| matches!(event, LifecycleEvent::Completed { .. }))
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn a_second_open_offer_for_the_same_job_is_rejected(harness: Harness) -> eyre::Result<()> {
    let job = seed_accepted(&harness).await?;
    let sla = job.sla().cloned().expect("sla frozen");
    let rival = Assignment::offer(
        job.id(),
        ProviderId::new(),
        MatchScore::new(90),
        Duration::minutes(10),
        &sla,
        &*harness.clock,
    );

    let result = harness
        .repository
        .commit(JobChange::with_assignment(job, rival))
        .await;

    ensure!(matches!(
        result,
        Err(JobRepositoryError::OpenAssignmentExists(_))
    ));
    Ok(())
}
