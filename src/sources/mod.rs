//! Metrics source boundary
//!
//! A [`MetricsSource`] is a pluggable provider of instantaneous system
//! metrics. The scheduler only ever talks to this trait, so live OS
//! collection, synthetic data, and external collaborators (cloud APIs,
//! predictors) are interchangeable without touching scheduling logic.

pub mod synthetic;
pub mod system;

use std::fmt;

use async_trait::async_trait;

use crate::Sample;

pub use synthetic::SyntheticSource;
pub use system::SystemSource;

/// Well-known metric names shared by the built-in sources.
pub const METRIC_CPU: &str = "cpu";
pub const METRIC_MEMORY: &str = "memory";
pub const METRIC_DISK: &str = "disk";

/// Transient sampling failure.
///
/// The current cycle is skipped and logged; the caller retries on the next
/// tick. Never fatal to the scheduler.
#[derive(Debug)]
pub struct SourceUnavailable {
    reason: String,
}

impl SourceUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SourceUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "metrics source unavailable: {}", self.reason)
    }
}

impl std::error::Error for SourceUnavailable {}

/// Pluggable provider of [`Sample`]s.
///
/// ## Contract
///
/// - `sample` must be callable repeatedly and independently; each call
///   produces a fresh sample.
/// - Failures are transient: returning [`SourceUnavailable`] skips the
///   current cycle, nothing more.
/// - Implementations must be `Send + Sync`; a single source instance may be
///   shared by concurrent schedulers.
///
/// A source that hangs indefinitely stalls its scheduler's cycle; no internal
/// deadline is imposed here.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Collect one sample of instantaneous metrics.
    async fn sample(&self) -> Result<Sample, SourceUnavailable>;

    /// Short identifier for logging.
    fn name(&self) -> &str;
}
