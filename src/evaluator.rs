//! Alert evaluation
//!
//! Pure classification of samples against a profile's thresholds, plus the
//! stateful evaluator that turns classifications into a de-duplicated event
//! log: an event is recorded only when the status changes, so the log never
//! holds two consecutive entries with the same status.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::Sample;
use crate::config::Profile;

/// Derived health classification of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Warning,
    Critical,
}

impl Status {
    /// Classify a peak reading against a threshold.
    ///
    /// Strict greater-than only: equality with the threshold (or with
    /// `threshold + margin`) does not escalate.
    pub fn classify(peak: f64, threshold: f64, margin: f64) -> Status {
        if peak > threshold + margin {
            Status::Critical
        } else if peak > threshold {
            Status::Warning
        } else {
            Status::Ok
        }
    }
}

/// A recorded status transition.
///
/// Emitted only when the status differs from the previous cycle, including
/// the initial transition out of the implicit unknown state at startup
/// (`previous: None`).
#[derive(Debug, Clone, Serialize)]
pub struct AlertEvent {
    pub sample: Sample,
    pub status: Status,
    pub previous: Option<Status>,
}

/// Tracks the last known status and the ordered transition log.
///
/// Deterministic and side-effect free; one evaluator per scheduler.
#[derive(Debug, Default)]
pub struct AlertEvaluator {
    previous: Option<Status>,
    events: Vec<AlertEvent>,
}

impl AlertEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `sample` and record an [`AlertEvent`] if the status changed.
    pub fn evaluate(&mut self, sample: &Sample, profile: &Profile) -> (Status, Option<AlertEvent>) {
        let peak = sample.peak().unwrap_or(0.0);
        let status = Status::classify(peak, profile.alert_threshold, profile.critical_margin);

        trace!(
            "evaluated peak {peak} against threshold {} (+{}): {status:?}",
            profile.alert_threshold, profile.critical_margin
        );

        if self.previous == Some(status) {
            return (status, None);
        }

        let event = AlertEvent {
            sample: sample.clone(),
            status,
            previous: self.previous,
        };
        self.previous = Some(status);
        self.events.push(event.clone());

        (status, Some(event))
    }

    /// The last classified status, or `None` before the first evaluation.
    pub fn current(&self) -> Option<Status> {
        self.previous
    }

    /// The ordered transition log.
    pub fn events(&self) -> &[AlertEvent] {
        &self.events
    }
}
