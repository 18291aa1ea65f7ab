//! Prometheus metrics for the ledger.
//!
//! Counters and histograms are recorded through the `metrics` facade; without
//! an installed recorder they are no-ops, so library code records
//! unconditionally.
//!
//! # Example
//!
//! ```rust,no_run
//! use campus_ledger_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Serve metrics on port 9090
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics server.
///
/// Installs the global recorder and exposes it over HTTP for scraping.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server bound to `addr` once started.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Install the recorder and spawn the HTTP exporter.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the exporter cannot be built or a global recorder
    /// is already installed.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .build()
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        let handle = recorder.handle();
        metrics::set_global_recorder(recorder)
            .map_err(|e| MetricsError::Install(e.to_string()))?;
        register_metrics();

        tokio::spawn(async move {
            if let Err(_e) = exporter.await {
                tracing::error!("Metrics exporter stopped");
            }
        });

        tracing::info!(
            addr = %self.addr,
            "Metrics server started - available at http://{}/metrics",
            self.addr
        );
        self.handle = Some(handle);
        Ok(())
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the server hasn't been started.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "ledger.registrations.total",
        "Registration attempts by outcome (accepted or the error kind)"
    );
    describe_counter!(
        "ledger.attendance.total",
        "Attendance marking attempts by outcome"
    );
    describe_counter!(
        "ledger.feedback.total",
        "Feedback submissions by outcome"
    );
    describe_counter!("ledger.events.created", "Events created");
    describe_counter!("ledger.events.cancelled", "Events cancelled");
    describe_histogram!(
        "ledger.operation.duration_seconds",
        "Time spent in a ledger operation, by operation"
    );
    describe_counter!(
        "ledger.retry.recovered",
        "Reads that succeeded after at least one retry"
    );
    describe_counter!(
        "ledger.retry.exhausted",
        "Reads that failed after exhausting retries"
    );
}

/// Outcome label for a ledger write: `accepted` or the error kind.
#[must_use]
pub fn outcome_label<T>(result: &campus_ledger_core::Result<T>) -> &'static str {
    match result {
        Ok(_) => "accepted",
        Err(err) => err.kind().as_str(),
    }
}

/// Ledger metrics recorder.
pub struct LedgerMetrics;

impl LedgerMetrics {
    /// Record a registration attempt.
    pub fn record_registration(outcome: &'static str) {
        counter!("ledger.registrations.total", "outcome" => outcome).increment(1);
    }

    /// Record an attendance attempt.
    pub fn record_attendance(outcome: &'static str) {
        counter!("ledger.attendance.total", "outcome" => outcome).increment(1);
    }

    /// Record a feedback submission.
    pub fn record_feedback(outcome: &'static str) {
        counter!("ledger.feedback.total", "outcome" => outcome).increment(1);
    }

    /// Record an event creation.
    pub fn record_event_created() {
        counter!("ledger.events.created").increment(1);
    }

    /// Record an event cancellation.
    pub fn record_event_cancelled() {
        counter!("ledger.events.cancelled").increment(1);
    }

    /// Record how long an operation took.
    pub fn record_duration(operation: &'static str, duration: Duration) {
        histogram!("ledger.operation.duration_seconds", "operation" => operation)
            .record(duration.as_secs_f64());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use campus_ledger_core::{EventId, LedgerError};

    #[test]
    fn test_metrics_server_creation() {
        let server = MetricsServer::new("127.0.0.1:0".parse().unwrap());
        assert!(server.handle().is_none());
        assert!(server.render().is_none());
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome_label(&Ok::<_, LedgerError>(())), "accepted");
        let full: campus_ledger_core::Result<()> = Err(LedgerError::CapacityExceeded {
            event_id: EventId::new(1),
            capacity: 2,
        });
        assert_eq!(outcome_label(&full), "capacity_exceeded");
    }

    #[test]
    fn test_ledger_metrics_render() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            LedgerMetrics::record_registration("accepted");
            LedgerMetrics::record_registration("capacity_exceeded");
            LedgerMetrics::record_event_created();
            LedgerMetrics::record_duration("register", Duration::from_millis(3));
        });

        let rendered = handle.render();
        assert!(rendered.contains("ledger_registrations_total"));
        assert!(rendered.contains("outcome=\"capacity_exceeded\""));
        assert!(rendered.contains("ledger_events_created"));
    }
}
