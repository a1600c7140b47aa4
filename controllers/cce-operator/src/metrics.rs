//! Prometheus metrics for the CCE operator.
//!
//! All metrics carry the `cce_operator_` prefix and are registered in one
//! [`Registry`] that the HTTP server exposes on `/metrics`.

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::time::Duration;

const METRICS_NAMESPACE: &str = "cce_operator";

/// Outcome label for a finished reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Success,
    Requeue,
    Error,
}

impl ReconcileOutcome {
    fn as_label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Requeue => "requeue",
            Self::Error => "error",
        }
    }
}

/// Operator metrics
#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Registry,
    /// Labels: `outcome` (`success`, `requeue`, `error`)
    reconciliations_total: CounterVec,
    reconcile_duration_seconds: HistogramVec,
    /// Labels: `operation` (e.g. `create_cluster`, `delete_vpc`)
    provider_calls_total: CounterVec,
    /// Labels: `resource` (e.g. `node_pool`, `nat_gateway`)
    teardown_steps_total: CounterVec,
}

impl Metrics {
    /// Create the metrics and register them in `registry`
    pub fn new(registry: Registry) -> Result<Self, prometheus::Error> {
        let reconciliations_total = CounterVec::new(
            Opts::new(
                format!("{METRICS_NAMESPACE}_reconciliations_total"),
                "Total number of ClusterConfig reconciliations by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(reconciliations_total.clone()))?;

        let reconcile_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                format!("{METRICS_NAMESPACE}_reconcile_duration_seconds"),
                "Duration of ClusterConfig reconciliations in seconds",
            )
            .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
            &["outcome"],
        )?;
        registry.register(Box::new(reconcile_duration_seconds.clone()))?;

        let provider_calls_total = CounterVec::new(
            Opts::new(
                format!("{METRICS_NAMESPACE}_provider_mutations_total"),
                "Total number of mutating cloud provider calls by operation",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(provider_calls_total.clone()))?;

        let teardown_steps_total = CounterVec::new(
            Opts::new(
                format!("{METRICS_NAMESPACE}_teardown_deletions_total"),
                "Total number of teardown deletions issued by resource kind",
            ),
            &["resource"],
        )?;
        registry.register(Box::new(teardown_steps_total.clone()))?;

        Ok(Self {
            registry,
            reconciliations_total,
            reconcile_duration_seconds,
            provider_calls_total,
            teardown_steps_total,
        })
    }

    /// Record a finished reconciliation
    pub fn record_reconcile(&self, outcome: ReconcileOutcome, duration: Duration) {
        let label = outcome.as_label();
        self.reconciliations_total.with_label_values(&[label]).inc();
        self.reconcile_duration_seconds
            .with_label_values(&[label])
            .observe(duration.as_secs_f64());
    }

    /// Record a mutating provider call
    pub fn record_provider_call(&self, operation: &str) {
        self.provider_calls_total.with_label_values(&[operation]).inc();
    }

    /// Record a teardown deletion
    pub fn record_teardown_step(&self, resource: &str) {
        self.teardown_steps_total.with_label_values(&[resource]).inc();
    }

    /// Encode all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
    }

    #[cfg(test)]
    pub fn provider_calls(&self, operation: &str) -> u64 {
        self.provider_calls_total.with_label_values(&[operation]).get() as u64
    }

    #[cfg(test)]
    pub fn reconciliations(&self, outcome: &str) -> u64 {
        self.reconciliations_total.with_label_values(&[outcome]).get() as u64
    }
}
