//! Prometheus counters for the matching core (SPEC_FULL.md §9). Carried
//! from the teacher's `metrics::mod` (`names`/`labels` constant modules,
//! `init_metrics()` installing a `PrometheusBuilder` recorder) but
//! trimmed to the four counters the expanded spec names — the
//! observability *surface* spec.md's Non-goals exclude is the
//! dashboards/alerting built on top of these, not the counters
//! themselves.

use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;

pub mod names {
    pub const ORDERS_PROCESSED_TOTAL: &str = "orders_processed_total";
    pub const TRADES_EXECUTED_TOTAL: &str = "trades_executed_total";
    pub const VERSION_CONFLICTS_TOTAL: &str = "version_conflicts_total";
    pub const DLQ_MESSAGES_TOTAL: &str = "dlq_messages_total";
}

pub mod labels {
    pub const SYMBOL: &str = "symbol";
    pub const SUBJECT: &str = "subject";
}

/// Installs the process-wide Prometheus recorder. Call once at startup.
pub fn init_metrics() -> PrometheusHandle {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

pub fn record_order_processed(symbol: &str) {
    counter!(names::ORDERS_PROCESSED_TOTAL, labels::SYMBOL => symbol.to_string()).increment(1);
}

pub fn record_trade_executed(symbol: &str) {
    counter!(names::TRADES_EXECUTED_TOTAL, labels::SYMBOL => symbol.to_string()).increment(1);
}

pub fn record_version_conflict(symbol: &str) {
    counter!(names::VERSION_CONFLICTS_TOTAL, labels::SYMBOL => symbol.to_string()).increment(1);
}

pub fn record_dlq_message(subject: &str) {
    counter!(names::DLQ_MESSAGES_TOTAL, labels::SUBJECT => subject.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_match_the_documented_set() {
        assert_eq!(names::ORDERS_PROCESSED_TOTAL, "orders_processed_total");
        assert_eq!(names::TRADES_EXECUTED_TOTAL, "trades_executed_total");
        assert_eq!(names::VERSION_CONFLICTS_TOTAL, "version_conflicts_total");
        assert_eq!(names::DLQ_MESSAGES_TOTAL, "dlq_messages_total");
    }
}
