use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Capability flags a profile can enable.
///
/// Behavior differences between profiles are data, not control flow: the binary
/// inspects these flags to pick the metrics source and log verbosity, and the
/// scheduler never branches on profile identity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Raise log verbosity to DEBUG.
    DebugLogging,

    /// Raise log verbosity to TRACE.
    VerboseLogging,

    /// Sample from the synthetic (randomized) source instead of the OS.
    SyntheticSource,
}

/// Named bundle of monitoring configuration.
///
/// Immutable once registered; selected once per process lifetime by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,

    /// Sampling interval in milliseconds. Must be greater than zero.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Readings above this percentage classify the sample as WARNING.
    pub alert_threshold: f64,

    /// Readings above `alert_threshold + critical_margin` classify as CRITICAL.
    #[serde(default = "default_critical_margin")]
    pub critical_margin: f64,

    #[serde(default)]
    pub features: BTreeSet<Feature>,
}

impl Profile {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    /// Check the invariants a profile must satisfy before registration.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("profile name must not be empty".to_string());
        }
        if self.interval_ms == 0 {
            return Err("sampling interval must be greater than zero".to_string());
        }
        if !(0.0..=100.0).contains(&self.alert_threshold) {
            return Err(format!(
                "alert threshold must be within [0, 100], got {}",
                self.alert_threshold
            ));
        }
        if !self.critical_margin.is_finite() || self.critical_margin < 0.0 {
            return Err(format!(
                "critical margin must be a non-negative number, got {}",
                self.critical_margin
            ));
        }
        Ok(())
    }
}

fn default_interval_ms() -> u64 {
    60_000
}

fn default_critical_margin() -> f64 {
    15.0
}

/// The profiles every deployment starts with.
pub fn builtin_profiles() -> Vec<Profile> {
    vec![
        Profile {
            name: "production".to_string(),
            interval_ms: 60_000,
            alert_threshold: 80.0,
            critical_margin: default_critical_margin(),
            features: BTreeSet::new(),
        },
        Profile {
            name: "development".to_string(),
            interval_ms: 5_000,
            alert_threshold: 90.0,
            critical_margin: default_critical_margin(),
            features: BTreeSet::from([Feature::DebugLogging, Feature::VerboseLogging]),
        },
        Profile {
            name: "experimental".to_string(),
            interval_ms: 30_000,
            alert_threshold: 75.0,
            critical_margin: default_critical_margin(),
            features: BTreeSet::from([Feature::SyntheticSource]),
        },
    ]
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Additional profiles registered on top of the built-in set.
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config: &Config| trace!("loaded config: {config:?}"))
}
