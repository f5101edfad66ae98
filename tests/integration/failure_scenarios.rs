//! Failure handling tests
//!
//! Transient source failures and sink failures must never terminate the
//! scheduler: failed cycles are skipped, failed emissions are counted.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use vigil::evaluator::Status;
use vigil::reporter::Reporter;
use vigil::scheduler::{Scheduler, SchedulerState};

use crate::helpers::*;

#[tokio::test]
async fn source_failure_skips_the_cycle_and_keeps_running() {
    // Tick 2 of 5 fails; ticks 1, 3, 4 and 5 must still be reported and the
    // scheduler must stay Running throughout.
    let source = Arc::new(ScriptedSource::new(&[
        Some(50.0),
        None,
        Some(85.0),
        Some(96.0),
        Some(85.0),
    ]));
    let sink = Arc::new(CollectingSink::new());
    let reporter = Arc::new(Reporter::new().with_sink(sink.clone()));

    let profile = create_test_profile("flaky-source", 25, 80.0);
    let mut scheduler = Scheduler::new(profile, source, reporter);

    scheduler.start().await.unwrap();
    assert!(
        wait_for_records(&sink, 4, Duration::from_secs(5)).await,
        "expected the 4 successful cycles to be reported"
    );
    assert_eq!(scheduler.state(), SchedulerState::Running);

    scheduler.stop();
    scheduler.drained().await;

    let statuses: Vec<Status> = sink.records().iter().map(|r| r.status).collect();
    assert_eq!(
        statuses[..4],
        [
            Status::Ok,
            Status::Warning,
            Status::Critical,
            Status::Warning
        ]
    );
}

#[tokio::test]
async fn failing_sink_is_counted_but_never_fatal() {
    let source = Arc::new(ScriptedSource::new(&[
        Some(50.0),
        Some(60.0),
        Some(70.0),
    ]));
    let collecting = Arc::new(CollectingSink::new());
    let reporter = Arc::new(
        Reporter::new()
            .with_sink(Arc::new(FailingSink))
            .with_sink(collecting.clone()),
    );

    let profile = create_test_profile("bad-sink", 25, 80.0);
    let mut scheduler = Scheduler::new(profile, source, reporter.clone());

    scheduler.start().await.unwrap();
    assert!(wait_for_records(&collecting, 3, Duration::from_secs(5)).await);
    assert_eq!(scheduler.state(), SchedulerState::Running);

    scheduler.stop();
    scheduler.drained().await;

    // The failing sink never stopped the healthy one
    assert!(collecting.count() >= 3);
    assert!(reporter.sink_failures() >= 3);
}

#[tokio::test]
async fn exhausted_source_keeps_the_scheduler_alive() {
    let source = Arc::new(ScriptedSource::new(&[Some(50.0)]));
    let sink = Arc::new(CollectingSink::new());
    let reporter = Arc::new(Reporter::new().with_sink(sink.clone()));

    let profile = create_test_profile("exhausted", 20, 80.0);
    let mut scheduler = Scheduler::new(profile, source, reporter);

    scheduler.start().await.unwrap();

    // Several intervals of failing samples: no new records, no shutdown
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(sink.count(), 1);
    assert_eq!(scheduler.state(), SchedulerState::Running);

    scheduler.stop();
    scheduler.drained().await;
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
}
