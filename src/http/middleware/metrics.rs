//! Request metrics middleware.

use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};

use crate::inspect::Transport;
use crate::observability::metrics;

/// Record count and latency for every request passing through.
///
/// The listener's [`Transport`] extension supplies the protocol label.
pub async fn record_metrics(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let uri = req.uri().path().to_string();
    let protocol = req
        .extensions()
        .get::<Transport>()
        .copied()
        .unwrap_or_default()
        .protocol();

    let response = next.run(req).await;

    metrics::record_request(&method, &uri, protocol, start);
    response
}
