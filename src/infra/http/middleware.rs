use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::{Instrument, debug, error, info_span, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

/// Wrap each request in a span carrying a fresh request id, and log failures
/// with the [`ErrorReport`] the handler attached.
pub async fn trace_requests(request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!(
        "http_request",
        %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    async move {
        let start = Instant::now();
        let mut response = next.run(request).await;
        let status = response.status();
        let elapsed_ms = start.elapsed().as_millis() as u64;

        if !(status.is_client_error() || status.is_server_error()) {
            debug!(status = status.as_u16(), elapsed_ms, "request served");
            return response;
        }

        let (source, detail) = match response.extensions_mut().remove::<ErrorReport>() {
            Some(report) => (report.source, report.messages.join(": ")),
            None => ("unknown", "no diagnostic available".to_string()),
        };
        if status.is_server_error() {
            error!(status = status.as_u16(), elapsed_ms, source, %detail, "request failed");
        } else {
            warn!(status = status.as_u16(), elapsed_ms, source, %detail, "client request error");
        }
        response
    }
    .instrument(span)
    .await
}
