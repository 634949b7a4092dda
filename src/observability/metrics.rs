use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_created_total: IntCounter,
    pub claims_total: IntCounterVec,
    pub claim_latency_seconds: HistogramVec,
    pub pending_orders: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_created_total =
            IntCounter::new("orders_created_total", "Total orders created")
                .expect("valid orders_created_total metric");

        let claims_total = IntCounterVec::new(
            Opts::new("claims_total", "Total claim attempts by outcome"),
            &["outcome"],
        )
        .expect("valid claims_total metric");

        let claim_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "claim_latency_seconds",
                "Latency of claim processing in seconds",
            ),
            &["outcome"],
        )
        .expect("valid claim_latency_seconds metric");

        let pending_orders = IntGauge::new("pending_orders", "Current number of pending orders")
            .expect("valid pending_orders metric");

        registry
            .register(Box::new(orders_created_total.clone()))
            .expect("register orders_created_total");
        registry
            .register(Box::new(claims_total.clone()))
            .expect("register claims_total");
        registry
            .register(Box::new(claim_latency_seconds.clone()))
            .expect("register claim_latency_seconds");
        registry
            .register(Box::new(pending_orders.clone()))
            .expect("register pending_orders");

        Self {
            registry,
            orders_created_total,
            claims_total,
            claim_latency_seconds,
            pending_orders,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
