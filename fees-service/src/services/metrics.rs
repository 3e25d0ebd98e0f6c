use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static WEBHOOK_EVENTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static PAYMENTS_RECORDED_TOTAL: OnceLock<IntCounter> = OnceLock::new();
pub static AMOUNT_RECONCILED_MINOR_TOTAL: OnceLock<IntCounter> = OnceLock::new();
pub static COUPON_VALIDATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Install the Prometheus recorder for `metrics` macros and register the
/// domain counters. Safe to call more than once; later calls are no-ops.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!(error = %e, "Prometheus recorder not installed"),
    }

    let registry = Registry::new();

    let webhook_events = IntCounterVec::new(
        Opts::new(
            "fees_webhook_events_total",
            "Authenticated webhook events by type and outcome",
        ),
        &["event_type", "outcome"],
    );
    let payments_recorded = IntCounter::new(
        "fees_payments_recorded_total",
        "Payment records created from provider charges",
    );
    let amount_reconciled = IntCounter::new(
        "fees_amount_reconciled_minor_total",
        "Amount credited to fees, in the smallest currency unit",
    );
    let coupon_validations = IntCounterVec::new(
        Opts::new(
            "fees_coupon_validations_total",
            "Coupon validation requests by verdict",
        ),
        &["verdict"],
    );

    let (Ok(webhook_events), Ok(payments_recorded), Ok(amount_reconciled), Ok(coupon_validations)) =
        (webhook_events, payments_recorded, amount_reconciled, coupon_validations)
    else {
        tracing::warn!("Failed to create domain metrics");
        return;
    };

    let registered = [
        registry.register(Box::new(webhook_events.clone())),
        registry.register(Box::new(payments_recorded.clone())),
        registry.register(Box::new(amount_reconciled.clone())),
        registry.register(Box::new(coupon_validations.clone())),
    ];
    if registered.iter().any(Result::is_err) {
        tracing::warn!("Failed to register domain metrics");
        return;
    }

    let _ = PROMETHEUS_REGISTRY.set(registry);
    let _ = WEBHOOK_EVENTS_TOTAL.set(webhook_events);
    let _ = PAYMENTS_RECORDED_TOTAL.set(payments_recorded);
    let _ = AMOUNT_RECONCILED_MINOR_TOTAL.set(amount_reconciled);
    let _ = COUPON_VALIDATIONS_TOTAL.set(coupon_validations);
}

pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).ok();
        if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

pub fn record_webhook_event(event_type: &str, outcome: &str) {
    if let Some(counter) = WEBHOOK_EVENTS_TOTAL.get() {
        counter.with_label_values(&[event_type, outcome]).inc();
    }
}

pub fn record_payment(amount_minor: i64) {
    if let Some(counter) = PAYMENTS_RECORDED_TOTAL.get() {
        counter.inc();
    }
    if let Some(counter) = AMOUNT_RECONCILED_MINOR_TOTAL.get() {
        counter.inc_by(amount_minor.max(0) as u64);
    }
}

pub fn record_coupon_validation(valid: bool) {
    if let Some(counter) = COUPON_VALIDATIONS_TOTAL.get() {
        counter
            .with_label_values(&[if valid { "valid" } else { "invalid" }])
            .inc();
    }
}
