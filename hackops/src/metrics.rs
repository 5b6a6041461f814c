//! Operational metrics for baggage handling.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `hackops_bags_checked_in_total{kind}` - Bags checked in (`grid` or `special`)
//! - `hackops_bags_checked_out_total` - Bags handed back
//! - `hackops_checkin_rejections_total{reason}` - Refused check-ins by reason
//! - `hackops_checkout_rejections_total{reason}` - Refused check-outs by reason
//! - `hackops_effects_executed_total{type}` - Reducer effects started
//! - `hackops_stats_requests_total{endpoint}` - Statistics computations (cache misses)

use crate::aggregates::BaggageError;
use crate::types::Bag;
use metrics::describe_counter;

/// Register metric descriptions.
///
/// Call once at startup, after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "hackops_bags_checked_in_total",
        "Bags checked in, by placement kind (grid, special)"
    );
    describe_counter!("hackops_bags_checked_out_total", "Bags checked out");
    describe_counter!(
        "hackops_checkin_rejections_total",
        "Check-ins refused, by reason"
    );
    describe_counter!(
        "hackops_checkout_rejections_total",
        "Check-outs refused, by reason"
    );
    describe_counter!(
        "hackops_effects_executed_total",
        "Reducer effects started, by effect type"
    );
    describe_counter!(
        "hackops_stats_requests_total",
        "Statistics recomputed from the record stores, by endpoint"
    );

    tracing::info!("Metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a stored check-in.
pub fn record_check_in(bag: &Bag) {
    let kind = if bag.is_special() { "special" } else { "grid" };
    metrics::counter!("hackops_bags_checked_in_total", "kind" => kind).increment(1);
}

/// Record a stored check-out.
pub fn record_check_out() {
    metrics::counter!("hackops_bags_checked_out_total").increment(1);
}

/// Record a refused check-in.
pub fn record_check_in_rejected(error: &BaggageError) {
    metrics::counter!("hackops_checkin_rejections_total", "reason" => error.reason()).increment(1);
}

/// Record a refused check-out.
pub fn record_check_out_rejected(error: &BaggageError) {
    metrics::counter!("hackops_checkout_rejections_total", "reason" => error.reason()).increment(1);
}

/// Record a statistics recomputation.
pub fn record_stats_computed(endpoint: &'static str) {
    metrics::counter!("hackops_stats_requests_total", "endpoint" => endpoint).increment(1);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::BagId;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn check_out_rejections_are_counted_by_reason() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_check_out_rejected(&BaggageError::AlreadyRemoved { bag_id: BagId::new(1) });
            record_check_out_rejected(&BaggageError::AlreadyRemoved { bag_id: BagId::new(2) });
            record_check_out_rejected(&BaggageError::bag_not_found(BagId::new(3)));
        });

        let rendered = handle.render();
        assert!(rendered.contains(r#"hackops_checkout_rejections_total{reason="already_removed"} 2"#));
        assert!(rendered.contains(r#"hackops_checkout_rejections_total{reason="not_found"} 1"#));
    }
}
