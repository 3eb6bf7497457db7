//! Prometheus counters for the request lifecycle and ticket desk, exported at `/metrics`.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::error;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref REQUESTS_SUBMITTED: IntCounter = IntCounter::new(
        "equipment_requests_submitted_total",
        "Total number of equipment requests submitted"
    )
    .expect("metric can be created");
    pub static ref ITEM_TRANSITIONS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "equipment_item_transitions_total",
            "Line item status transitions applied, by target status"
        ),
        &["target"]
    )
    .expect("metric can be created");
    pub static ref INSUFFICIENT_STOCK_REJECTIONS: IntCounter = IntCounter::new(
        "equipment_insufficient_stock_total",
        "Accept attempts rejected for lack of stock"
    )
    .expect("metric can be created");
    pub static ref STOCK_ADJUSTMENTS: IntCounter = IntCounter::new(
        "shop_stock_adjustments_total",
        "Manual stock adjustments applied by managers"
    )
    .expect("metric can be created");
    pub static ref TICKET_CHANGES: IntCounterVec = IntCounterVec::new(
        Opts::new("tickets_changes_total", "Ticket mutations, by kind"),
        &["kind"]
    )
    .expect("metric can be created");
}

/// Registers every collector with [`REGISTRY`]. Safe to call more than once.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(REQUESTS_SUBMITTED.clone()),
        Box::new(ITEM_TRANSITIONS.clone()),
        Box::new(INSUFFICIENT_STOCK_REJECTIONS.clone()),
        Box::new(STOCK_ADJUSTMENTS.clone()),
        Box::new(TICKET_CHANGES.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => error!(error = %e, "Failed to register metric"),
        }
    }
}

/// Renders the registry in the Prometheus text exposition format.
pub fn export() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exported_text_contains_registered_counters() {
        register_metrics();
        register_metrics();
        REQUESTS_SUBMITTED.inc();
        ITEM_TRANSITIONS.with_label_values(&["accepted"]).inc();

        let text = export().unwrap();
        assert!(text.contains("equipment_requests_submitted_total"));
        assert!(text.contains("equipment_item_transitions_total{target=\"accepted\"}"));
    }
}
