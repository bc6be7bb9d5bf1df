//! Prometheus metrics (§6 `GET /metrics`), named after the original
//! service's `prometheus_client` instrumentation (`app.py`).

use prometheus::{
    Counter, CounterVec, Encoder, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};

pub struct Metrics {
    registry: Registry,
    requests_total: CounterVec,
    request_duration_seconds: HistogramVec,
    score_distribution: Histogram,
    alerts_total: Counter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("fraud_detector_requests_total", "Total requests"),
            &["endpoint"],
        )?;
        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("fraud_detector_request_duration_seconds", "Request latency"),
            &["endpoint"],
        )?;
        let score_distribution = Histogram::with_opts(HistogramOpts::new(
            "fraud_detector_score_distribution",
            "Fraud score distribution",
        ))?;
        let alerts_total = Counter::with_opts(Opts::new(
            "fraud_detector_alerts_total",
            "Total alerts generated",
        ))?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;
        registry.register(Box::new(score_distribution.clone()))?;
        registry.register(Box::new(alerts_total.clone()))?;

        Ok(Metrics { registry, requests_total, request_duration_seconds, score_distribution, alerts_total })
    }

    pub fn record_request(&self, endpoint: &str, duration_seconds: f64) {
        self.requests_total.with_label_values(&[endpoint]).inc();
        self.request_duration_seconds.with_label_values(&[endpoint]).observe(duration_seconds);
    }

    pub fn observe_score(&self, score: f64) {
        self.score_distribution.observe(score);
    }

    pub fn record_alert(&self) {
        self.alerts_total.inc();
    }

    /// Text exposition format consumed by a Prometheus scraper.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_registered_metric_names() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("/score", 0.01);
        metrics.observe_score(0.4);
        metrics.record_alert();

        let rendered = metrics.render().unwrap();
        assert!(rendered.contains("fraud_detector_requests_total"));
        assert!(rendered.contains("fraud_detector_request_duration_seconds"));
        assert!(rendered.contains("fraud_detector_score_distribution"));
        assert!(rendered.contains("fraud_detector_alerts_total"));
    }
}
