//! Metrics facade (`MetricsSink`): a thin trait over the `metrics`/`metrics-exporter-prometheus`
//! crates so callers (evaluator, cache, orchestrator) don't depend on a concrete recorder.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Sink for the scalar/counter observations emitted throughout the query pipeline.
pub trait MetricsSink: Send + Sync {
    fn record_counter(&self, name: &'static str, value: u64);
    fn record_gauge(&self, name: &'static str, value: f64);
    fn record_histogram(&self, name: &'static str, value: f64);
}

/// Installs the global `metrics` recorder and exposes its Prometheus text-format renderer.
pub struct PrometheusMetricsSink {
    handle: PrometheusHandle,
}

impl PrometheusMetricsSink {
    /// Installs the process-wide recorder. Must be called at most once per process.
    pub fn install() -> Result<Self, metrics_exporter_prometheus::BuildError> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        Ok(Self { handle })
    }

    /// Renders all recorded metrics in Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl MetricsSink for PrometheusMetricsSink {
    fn record_counter(&self, name: &'static str, value: u64) {
        metrics::counter!(name).increment(value);
    }

    fn record_gauge(&self, name: &'static str, value: f64) {
        metrics::gauge!(name).set(value);
    }

    fn record_histogram(&self, name: &'static str, value: f64) {
        metrics::histogram!(name).record(value);
    }
}

/// Discards every observation; used in tests and whenever metrics are disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn record_counter(&self, _name: &'static str, _value: u64) {}
    fn record_gauge(&self, _name: &'static str, _value: f64) {}
    fn record_histogram(&self, _name: &'static str, _value: f64) {}
}
