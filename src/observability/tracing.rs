//! Request spans.
//!
//! # Responsibilities
//! - Give every dispatched request a UUID v4 correlation id
//! - Create the span the transport call and normalization run inside

use tracing::Span;
use uuid::Uuid;

/// Create the span for one dispatched request.
pub fn request_span(method: &str, url: &str) -> (Uuid, Span) {
    let request_id = Uuid::new_v4();
    let span = tracing::debug_span!(
        "unirest_request",
        request_id = %request_id,
        method = %method,
        url = %url
    );
    (request_id, span)
}
