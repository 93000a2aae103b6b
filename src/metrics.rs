//! Metrics collection and export module

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub submissions_total: IntCounter,
    pub submissions_confirmed: IntCounter,
    pub submissions_likely_success: IntCounter,
    pub submissions_failed: IntCounter,
    pub submissions_duplicate: IntCounter,
    pub decode_failures: IntCounter,
    pub downgrades_total: IntCounter,

    // Recovery tier counters
    pub recovery_from_message: IntCounter,
    pub recovery_from_logs: IntCounter,
    pub recovery_from_history: IntCounter,
    pub recovery_synthesized: IntCounter,

    // Gauges
    pub submissions_in_flight: IntGauge,

    // Histograms
    pub submit_latency: Histogram,
    pub sign_latency: Histogram,
    pub broadcast_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let submissions_total = IntCounter::with_opts(Opts::new(
            "submissions_total",
            "Total number of transaction submissions attempted",
        ))?;

        let submissions_confirmed = IntCounter::with_opts(Opts::new(
            "submissions_confirmed",
            "Submissions confirmed on chain",
        ))?;

        let submissions_likely_success = IntCounter::with_opts(Opts::new(
            "submissions_likely_success",
            "Submissions resolved through already-processed recovery",
        ))?;

        let submissions_failed =
            IntCounter::with_opts(Opts::new("submissions_failed", "Submissions that failed"))?;

        let submissions_duplicate = IntCounter::with_opts(Opts::new(
            "submissions_duplicate",
            "Submissions rejected by the in-flight guard",
        ))?;

        let decode_failures = IntCounter::with_opts(Opts::new(
            "decode_failures",
            "Transaction blobs that failed both wire-format decodes",
        ))?;

        let downgrades_total = IntCounter::with_opts(Opts::new(
            "downgrades_total",
            "Versioned transactions downgraded to legacy for the wallet",
        ))?;

        // Recovery tier counters
        let recovery_from_message = IntCounter::with_opts(Opts::new(
            "recovery_from_message",
            "Signatures recovered from the error message",
        ))?;

        let recovery_from_logs = IntCounter::with_opts(Opts::new(
            "recovery_from_logs",
            "Signature candidates recovered from preflight logs",
        ))?;

        let recovery_from_history = IntCounter::with_opts(Opts::new(
            "recovery_from_history",
            "Signatures recovered from recent address history",
        ))?;

        let recovery_synthesized = IntCounter::with_opts(Opts::new(
            "recovery_synthesized",
            "Placeholder references synthesized when recovery found nothing",
        ))?;

        let submissions_in_flight = IntGauge::with_opts(Opts::new(
            "submissions_in_flight",
            "Submissions currently in progress",
        ))?;

        let submit_latency = Histogram::with_opts(
            HistogramOpts::new("submit_latency_seconds", "End-to-end submission latency")
                .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        )?;

        let sign_latency = Histogram::with_opts(
            HistogramOpts::new("sign_latency_seconds", "Wallet signing latency")
                .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 30.0]),
        )?;

        let broadcast_latency = Histogram::with_opts(
            HistogramOpts::new("broadcast_latency_seconds", "RPC broadcast latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(submissions_total.clone()))?;
        registry.register(Box::new(submissions_confirmed.clone()))?;
        registry.register(Box::new(submissions_likely_success.clone()))?;
        registry.register(Box::new(submissions_failed.clone()))?;
        registry.register(Box::new(submissions_duplicate.clone()))?;
        registry.register(Box::new(decode_failures.clone()))?;
        registry.register(Box::new(downgrades_total.clone()))?;
        registry.register(Box::new(recovery_from_message.clone()))?;
        registry.register(Box::new(recovery_from_logs.clone()))?;
        registry.register(Box::new(recovery_from_history.clone()))?;
        registry.register(Box::new(recovery_synthesized.clone()))?;
        registry.register(Box::new(submissions_in_flight.clone()))?;
        registry.register(Box::new(submit_latency.clone()))?;
        registry.register(Box::new(sign_latency.clone()))?;
        registry.register(Box::new(broadcast_latency.clone()))?;

        Ok(Self {
            registry,
            submissions_total,
            submissions_confirmed,
            submissions_likely_success,
            submissions_failed,
            submissions_duplicate,
            decode_failures,
            downgrades_total,
            recovery_from_message,
            recovery_from_logs,
            recovery_from_history,
            recovery_synthesized,
            submissions_in_flight,
            submit_latency,
            sign_latency,
            broadcast_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Count a recovery outcome by tier name.
    pub fn record_recovery(&self, tier: &str) {
        match tier {
            "error_message" => self.recovery_from_message.inc(),
            "logs" => self.recovery_from_logs.inc(),
            "recent_history" => self.recovery_from_history.inc(),
            "synthesized" => self.recovery_synthesized.inc(),
            _ => tracing::debug!("Unknown recovery tier: {}", tier),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        let duration = self.start.elapsed();
        histogram.observe(duration.as_secs_f64());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_cleanly() {
        let m = Metrics::new().unwrap();
        m.submissions_total.inc();
        m.record_recovery("synthesized");
        assert_eq!(m.submissions_total.get(), 1);
        assert_eq!(m.recovery_synthesized.get(), 1);
        assert!(!m.registry().gather().is_empty());
    }
}
