use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::tracker::Tracker;
use crate::TrackingRequest;

/// axum middleware running every response through [`Tracker::process_response`].
///
/// Mount with `middleware::from_fn_with_state(tracker, track_response)`, inside
/// the session layer so the tracker sees the visit's session.
pub async fn track_response(
    State(tracker): State<Arc<Tracker>>,
    req: Request,
    next: Next,
) -> Response {
    // The handler consumes the request; keep what tracking needs
    let context = TrackingRequest::from_request(&req);
    let response = next.run(req).await;
    tracker.process_response(&context, response).await
}
