//! Prometheus metrics for the ensemble engine
//!
//! All metrics use the `ensemble_` prefix and live in a private registry.

use prometheus::{
    CounterVec, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct EnsembleMetrics {
    registry: Arc<Registry>,
    /// Decisions by method and action
    pub aggregations_total: CounterVec,
    /// Failed calls by error kind
    pub errors_total: CounterVec,
    /// Individual weight changes by method
    pub weight_updates_total: CounterVec,
    /// Wall time of full explanations
    pub explanation_duration_seconds: Histogram,
    /// Consensus of the latest decision (0-1)
    pub consensus_level: GenericGauge<AtomicF64>,
    /// Version of the installed meta-learner
    pub meta_learner_version: GenericGauge<AtomicF64>,
    /// Decisions held in history
    pub history_size: GenericGauge<AtomicF64>,
}

impl EnsembleMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let aggregations_total = CounterVec::new(
            Opts::new("ensemble_aggregations_total", "Total ensemble decisions"),
            &["method", "action"],
        )?;
        registry.register(Box::new(aggregations_total.clone()))?;

        let errors_total = CounterVec::new(
            Opts::new("ensemble_errors_total", "Total engine errors by kind"),
            &["kind"],
        )?;
        registry.register(Box::new(errors_total.clone()))?;

        let weight_updates_total = CounterVec::new(
            Opts::new(
                "ensemble_weight_updates_total",
                "Total adaptive weight changes",
            ),
            &["method"],
        )?;
        registry.register(Box::new(weight_updates_total.clone()))?;

        let explanation_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "ensemble_explanation_duration_seconds",
                "Explanation wall time in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;
        registry.register(Box::new(explanation_duration_seconds.clone()))?;

        let consensus_level = Gauge::with_opts(Opts::new(
            "ensemble_consensus_level",
            "Consensus of the latest decision (0-1)",
        ))?;
        registry.register(Box::new(consensus_level.clone()))?;

        let meta_learner_version = Gauge::with_opts(Opts::new(
            "ensemble_meta_learner_version",
            "Version of the installed meta-learner",
        ))?;
        registry.register(Box::new(meta_learner_version.clone()))?;

        let history_size = Gauge::with_opts(Opts::new(
            "ensemble_history_size",
            "Decisions held in history",
        ))?;
        registry.register(Box::new(history_size.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            aggregations_total,
            errors_total,
            weight_updates_total,
            explanation_duration_seconds,
            consensus_level,
            meta_learner_version,
            history_size,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn record_aggregation(&self, method: &str, action: &str, consensus: f64) {
        self.aggregations_total
            .with_label_values(&[method, action])
            .inc();
        self.consensus_level.set(consensus);
    }

    pub fn inc_errors(&self, kind: &str) {
        self.errors_total.with_label_values(&[kind]).inc();
    }

    pub fn inc_weight_updates(&self, method: &str, count: usize) {
        self.weight_updates_total
            .with_label_values(&[method])
            .inc_by(count as f64);
    }

    pub fn observe_explanation(&self, seconds: f64) {
        self.explanation_duration_seconds.observe(seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = EnsembleMetrics::new().expect("Failed to create metrics");
        metrics.inc_errors("invalid_input");
        assert!(metrics.render().contains("ensemble_errors_total"));
    }

    #[test]
    fn test_aggregation_counter_and_gauge() {
        let metrics = EnsembleMetrics::new().expect("Failed to create metrics");
        metrics.record_aggregation("bayesian", "BUY", 0.75);
        metrics.record_aggregation("bayesian", "BUY", 0.8);

        let output = metrics.render();
        assert!(output.contains("ensemble_aggregations_total{action=\"BUY\",method=\"bayesian\"} 2"));
        assert!(output.contains("ensemble_consensus_level 0.8"));
    }

    #[test]
    fn test_weight_updates_accumulate() {
        let metrics = EnsembleMetrics::new().expect("Failed to create metrics");
        metrics.inc_weight_updates("performance_weighted", 3);
        metrics.inc_weight_updates("performance_weighted", 2);

        assert_eq!(
            metrics
                .weight_updates_total
                .with_label_values(&["performance_weighted"])
                .get(),
            5.0
        );
    }
}
