//! Concurrency tests
//!
//! Non-overlap and coalescing of cycles, independence of concurrent
//! schedulers, and cross-context cancellation.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use vigil::Sample;
use vigil::reporter::Reporter;
use vigil::scheduler::{Scheduler, SchedulerState};
use vigil::sources::{MetricsSource, SourceUnavailable};

use crate::helpers::*;

/// Source whose samples take longer than the scheduler interval, tracking
/// how many samples ever ran concurrently.
struct SlowSource {
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl SlowSource {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MetricsSource for SlowSource {
    async fn sample(&self) -> Result<Sample, SourceUnavailable> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Sample::new(BTreeMap::from([("cpu".to_string(), 50.0)])))
    }

    fn name(&self) -> &str {
        "slow"
    }
}

#[tokio::test]
async fn slow_cycles_never_overlap_and_ticks_coalesce() {
    // Cycles take ~4 intervals; overdue ticks must be skipped, not queued.
    let source = Arc::new(SlowSource::new(Duration::from_millis(80)));
    let sink = Arc::new(CollectingSink::new());
    let reporter = Arc::new(Reporter::new().with_sink(sink.clone()));

    let profile = create_test_profile("slow", 20, 80.0);
    let mut scheduler = Scheduler::new(profile, source.clone(), reporter);

    scheduler.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    scheduler.stop();
    scheduler.drained().await;

    assert_eq!(
        source.max_in_flight.load(Ordering::SeqCst),
        1,
        "at most one sample may be in flight"
    );

    // ~300ms of 80ms cycles: queued-up ticks would show far more calls
    let calls = source.calls.load(Ordering::SeqCst);
    assert!(calls <= 6, "expected coalesced ticks, got {calls} calls");
}

#[tokio::test]
async fn concurrent_schedulers_are_independent() {
    let first_source = Arc::new(ScriptedSource::new(&[Some(85.0), Some(86.0), Some(87.0)]));
    let first_sink = Arc::new(CollectingSink::new());
    let first_reporter = Arc::new(Reporter::new().with_sink(first_sink.clone()));
    let mut first = Scheduler::new(
        create_test_profile("first", 25, 80.0),
        first_source,
        first_reporter,
    );

    let second_source = Arc::new(SlowSource::new(Duration::from_millis(5)));
    let second_sink = Arc::new(CollectingSink::new());
    let second_reporter = Arc::new(Reporter::new().with_sink(second_sink.clone()));
    let mut second = Scheduler::new(
        create_test_profile("second", 25, 80.0),
        second_source,
        second_reporter,
    );

    first.start().await.unwrap();
    second.start().await.unwrap();

    assert!(wait_for_records(&first_sink, 2, Duration::from_secs(5)).await);

    // Stopping the first scheduler leaves the second running and sampling
    first.stop();
    first.drained().await;
    assert_eq!(first.state(), SchedulerState::Stopped);
    assert_eq!(second.state(), SchedulerState::Running);

    let before = second_sink.count();
    assert!(wait_for_records(&second_sink, before + 2, Duration::from_secs(5)).await);

    second.stop();
    second.drained().await;
}

#[tokio::test]
async fn stop_handle_cancels_from_a_parallel_task() {
    let source = Arc::new(SlowSource::new(Duration::from_millis(30)));
    let sink = Arc::new(CollectingSink::new());
    let reporter = Arc::new(Reporter::new().with_sink(sink.clone()));

    let profile = create_test_profile("cancelled", 20, 80.0);
    let mut scheduler = Scheduler::new(profile, source, reporter);

    scheduler.start().await.unwrap();

    let handle = scheduler.stop_handle();
    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop();
    });

    stopper.await.unwrap();
    scheduler.drained().await;

    assert_eq!(scheduler.state(), SchedulerState::Stopped);

    // No cycle may land after the drain completes
    let settled = sink.count();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(sink.count(), settled);
}
