//! Prometheus Metrics Registry - Broker Traffic Observability
//!
//! Counts broker requests by endpoint and outcome, records request
//! latency, and tracks transaction pages pulled by the pager. Metrics
//! are rendered in text exposition format on demand.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Centralized Prometheus metrics for the bridge.
///
/// All metrics follow the naming convention `oanda_bridge_*`.
#[derive(Clone)]
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Broker requests by endpoint label and outcome.
    pub requests: IntCounterVec,
    /// Request latency histogram (milliseconds).
    pub request_latency_ms: HistogramVec,
    /// Retries issued after 429 / 5xx / network failures.
    pub retries: IntCounterVec,
    /// Transaction pages fetched.
    pub pages_fetched: IntCounter,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("oanda_bridge_requests_total", "Broker requests issued"),
            &["endpoint", "outcome"],
        )?;

        let request_latency_ms = HistogramVec::new(
            HistogramOpts::new(
                "oanda_bridge_request_latency_ms",
                "Broker request latency in milliseconds",
            )
            .buckets(vec![10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0]),
            &["endpoint"],
        )?;

        let retries = IntCounterVec::new(
            Opts::new("oanda_bridge_retries_total", "Broker request retries"),
            &["endpoint"],
        )?;

        let pages_fetched = IntCounter::new(
            "oanda_bridge_transaction_pages_total",
            "Transaction history pages fetched",
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(request_latency_ms.clone()))?;
        registry.register(Box::new(retries.clone()))?;
        registry.register(Box::new(pages_fetched.clone()))?;

        Ok(Self {
            registry,
            requests,
            request_latency_ms,
            retries,
            pages_fetched,
        })
    }

    /// Record one finished request.
    pub fn observe_request(&self, endpoint: &str, outcome: &str, latency_ms: f64) {
        self.requests.with_label_values(&[endpoint, outcome]).inc();
        self.request_latency_ms
            .with_label_values(&[endpoint])
            .observe(latency_ms);
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
