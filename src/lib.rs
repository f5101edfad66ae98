pub mod config;
pub mod evaluator;
pub mod registry;
pub mod reporter;
pub mod scheduler;
pub mod sources;
pub mod util;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped set of metric readings, produced once per sampling cycle.
///
/// Readings map metric names (e.g. `cpu`, `memory`, `disk`, or custom gauges)
/// to percentage-like numeric values. A sample is never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub readings: BTreeMap<String, f64>,
}

impl Sample {
    pub fn new(readings: BTreeMap<String, f64>) -> Self {
        Self {
            timestamp: Utc::now(),
            readings,
        }
    }

    /// The highest reading in this sample, or `None` if it has no readings.
    ///
    /// NaN readings are skipped.
    pub fn peak(&self) -> Option<f64> {
        self.readings
            .values()
            .copied()
            .filter(|value| !value.is_nan())
            .fold(None, |peak, value| {
                Some(peak.map_or(value, |p: f64| p.max(value)))
            })
    }
}
