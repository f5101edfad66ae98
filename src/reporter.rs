//! Reporting pipeline
//!
//! Renders a sample and its evaluation into a structured [`HealthRecord`] and
//! fans it out to the registered sinks. A failing sink never aborts the cycle
//! or the other sinks: failures are caught per sink, counted, and logged.
//!
//! Logs go to stderr (tracing); the built-in console sink writes one JSON
//! record per line to stdout.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{trace, warn};

use crate::Sample;
use crate::config::Profile;
use crate::evaluator::{AlertEvent, Status};

/// Result type alias for sink operations
pub type SinkResult = Result<(), SinkError>;

/// Errors a sink can raise while emitting a record
#[derive(Debug)]
pub enum SinkError {
    /// Writing to the sink's destination failed
    Io(std::io::Error),

    /// The record could not be serialized for this sink
    Serialization(String),

    /// The sink's downstream rejected the record
    Rejected(String),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Io(err) => write!(f, "sink I/O error: {err}"),
            SinkError::Serialization(msg) => write!(f, "record serialization error: {msg}"),
            SinkError::Rejected(msg) => write!(f, "sink rejected record: {msg}"),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Io(err)
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        SinkError::Serialization(err.to_string())
    }
}

/// The status transition carried by a record, when one occurred this cycle.
#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub from: Option<Status>,
    pub to: Status,
}

/// Structured record of one completed sampling cycle.
#[derive(Debug, Clone, Serialize)]
pub struct HealthRecord {
    pub profile: String,
    pub timestamp: DateTime<Utc>,
    pub readings: BTreeMap<String, f64>,
    pub status: Status,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<StatusChange>,
}

impl HealthRecord {
    pub fn render(
        profile: &Profile,
        sample: &Sample,
        status: Status,
        event: Option<&AlertEvent>,
    ) -> Self {
        Self {
            profile: profile.name.clone(),
            timestamp: sample.timestamp,
            readings: sample.readings.clone(),
            status,
            transition: event.map(|event| StatusChange {
                from: event.previous,
                to: event.status,
            }),
        }
    }
}

/// Pluggable consumer of reported records.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Short identifier for logging.
    fn name(&self) -> &str;

    /// Push one record downstream.
    async fn emit(&self, record: &HealthRecord) -> SinkResult;
}

/// Built-in sink: one JSON record per line on stdout.
pub struct ConsoleSink;

#[async_trait]
impl ReportSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    async fn emit(&self, record: &HealthRecord) -> SinkResult {
        let line = serde_json::to_string(record)?;

        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{line}")?;

        Ok(())
    }
}

/// Fans records out to the registered sinks.
///
/// Cheap to clone via `Arc`; shared between the scheduler worker and callers
/// that want to inspect the failure counter.
pub struct Reporter {
    sinks: Vec<Arc<dyn ReportSink>>,
    sink_failures: AtomicU64,
}

impl Reporter {
    pub fn new() -> Self {
        Self {
            sinks: Vec::new(),
            sink_failures: AtomicU64::new(0),
        }
    }

    /// A reporter with the built-in console sink registered.
    pub fn with_console() -> Self {
        Self::new().with_sink(Arc::new(ConsoleSink))
    }

    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Render the cycle into a record and emit it on every sink.
    ///
    /// Sink failures are isolated: each failure is logged at WARN and counted,
    /// and the remaining sinks still receive the record.
    pub async fn report(
        &self,
        profile: &Profile,
        sample: &Sample,
        status: Status,
        event: Option<&AlertEvent>,
    ) {
        let record = HealthRecord::render(profile, sample, status, event);

        for sink in &self.sinks {
            if let Err(e) = sink.emit(&record).await {
                self.sink_failures.fetch_add(1, Ordering::Relaxed);
                warn!("sink {} failed to emit record: {e}", sink.name());
            } else {
                trace!("sink {} emitted record", sink.name());
            }
        }
    }

    /// Total emission failures across all sinks since creation.
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}
