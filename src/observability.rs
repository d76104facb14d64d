use std::net::SocketAddr;

// ── RED metrics (backend calls) ─────────────────────────────────

/// Counter: backend requests. Labels: endpoint, status.
pub const API_REQUESTS_TOTAL: &str = "staycart_api_requests_total";

/// Histogram: backend request latency in seconds. Labels: endpoint.
pub const API_REQUEST_DURATION_SECONDS: &str = "staycart_api_request_duration_seconds";

// ── Engine metrics ──────────────────────────────────────────────

/// Counter: day clicks refused by a selector. Labels: reason.
pub const SELECTION_REFUSALS_TOTAL: &str = "staycart_selection_refusals_total";

/// Counter: booking code lookups discarded because a newer one started.
pub const VALIDATIONS_SUPERSEDED_TOTAL: &str = "staycart_validations_superseded_total";

/// Counter: carts whose server total disagreed with the derived total.
pub const CART_TOTAL_MISMATCH_TOTAL: &str = "staycart_cart_total_mismatch_total";

/// Counter: checkout operations issued. Labels: kind (new_invoice, append).
pub const CHECKOUT_GROUPS_TOTAL: &str = "staycart_checkout_groups_total";

/// Counter: append-services calls that failed during checkout.
pub const CHECKOUT_APPEND_FAILURES_TOTAL: &str = "staycart_checkout_append_failures_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map an HTTP outcome to a short status label for metrics.
pub fn status_label(status: Option<u16>) -> &'static str {
    match status {
        None => "transport_error",
        Some(200..=299) => "ok",
        Some(404) => "not_found",
        Some(409 | 422) => "rejected",
        Some(400..=499) => "client_error",
        Some(_) => "server_error",
    }
}
