//! Synthetic metrics source producing bounded uniform random values.
//!
//! Stands in for real collection in demos and tests, and keeps the fabricated
//! metrics of the `experimental` profile behind the same seam as everything
//! else. Seedable for deterministic output.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::Sample;

use super::{METRIC_CPU, METRIC_DISK, METRIC_MEMORY, MetricsSource, SourceUnavailable};

/// Generates one uniform value per configured gauge on every sample.
pub struct SyntheticSource {
    gauges: BTreeMap<String, Range<f64>>,
    rng: Mutex<StdRng>,
}

impl SyntheticSource {
    /// A source with the default `cpu`/`memory`/`disk` gauges over `0..100`.
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// A deterministic source for tests and reproducible demos.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        let gauges = [METRIC_CPU, METRIC_MEMORY, METRIC_DISK]
            .into_iter()
            .map(|name| (name.to_string(), 0.0..100.0))
            .collect();

        Self {
            gauges,
            rng: Mutex::new(rng),
        }
    }

    /// Add a custom gauge sampled uniformly from `range`.
    pub fn with_gauge(mut self, name: impl Into<String>, range: Range<f64>) -> Self {
        self.gauges.insert(name.into(), range);
        self
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsSource for SyntheticSource {
    async fn sample(&self) -> Result<Sample, SourceUnavailable> {
        let mut rng = self.rng.lock().expect("synthetic source rng lock poisoned");

        let readings = self
            .gauges
            .iter()
            .map(|(name, range)| (name.clone(), rng.random_range(range.clone())))
            .collect();

        Ok(Sample::new(readings))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
