//! Request correlation middleware.
//!
//! Every request gets a correlation id: the one the caller sent in
//! `X-Correlation-ID` when it parses as a UUID, a fresh one otherwise. The id
//! is stored in the request extensions (see [`CorrelationId`]), recorded on an
//! `http_request` tracing span wrapping the handler, and echoed back in the
//! response header.
//!
//! # Example
//!
//! ```ignore
//! use axum::{middleware::from_fn, Router};
//! use hackops_web::middleware::correlation_id;
//!
//! let app = Router::new()
//!     .route("/api/bags", post(check_in))
//!     .layer(from_fn(correlation_id));
//! ```

use crate::extractors::CorrelationId;
use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Assign a correlation id and run the rest of the stack inside its span.
pub async fn correlation_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    req.extensions_mut().insert(CorrelationId(id));

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %id,
        method = %req.method(),
        uri = %req.uri(),
    );

    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }

    response
}
