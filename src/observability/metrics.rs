use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub route_assignments_total: IntCounterVec,
    pub route_assignment_latency_seconds: HistogramVec,
    pub route_assignment_failures_total: IntCounterVec,
    pub orders_assigned_total: IntCounter,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let route_assignments_total = IntCounterVec::new(
            Opts::new("route_assignments_total", "Route create/update requests by outcome"),
            &["outcome"],
        )
        .expect("valid route_assignments_total metric");

        let route_assignment_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "route_assignment_latency_seconds",
                "Latency of route assignment in seconds",
            ),
            &["outcome"],
        )
        .expect("valid route_assignment_latency_seconds metric");

        let route_assignment_failures_total = IntCounterVec::new(
            Opts::new(
                "route_assignment_failures_total",
                "Route assignments that failed against storage, by step",
            ),
            &["step"],
        )
        .expect("valid route_assignment_failures_total metric");

        let orders_assigned_total =
            IntCounter::new("orders_assigned_total", "Orders placed on a route")
                .expect("valid orders_assigned_total metric");

        registry
            .register(Box::new(route_assignments_total.clone()))
            .expect("register route_assignments_total");
        registry
            .register(Box::new(route_assignment_latency_seconds.clone()))
            .expect("register route_assignment_latency_seconds");
        registry
            .register(Box::new(route_assignment_failures_total.clone()))
            .expect("register route_assignment_failures_total");
        registry
            .register(Box::new(orders_assigned_total.clone()))
            .expect("register orders_assigned_total");

        Self {
            registry,
            route_assignments_total,
            route_assignment_latency_seconds,
            route_assignment_failures_total,
            orders_assigned_total,
        }
    }

    pub fn observe_assignment(&self, outcome: &str, elapsed_seconds: f64) {
        self.route_assignment_latency_seconds
            .with_label_values(&[outcome])
            .observe(elapsed_seconds);
        self.route_assignments_total
            .with_label_values(&[outcome])
            .inc();
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
