//! Visitor cookie attached to tracked responses.

use axum::http::header::SET_COOKIE;
use axum::http::{HeaderValue, Response};
use beacon_core::{TrackingError, TrackingPayload, TrackingResult};
use cookie::time::{Duration, OffsetDateTime};
use cookie::Cookie;

/// Cookie carrying the payload's visitor id for the configured lifetime
pub fn visitor_cookie(payload: &TrackingPayload) -> TrackingResult<Cookie<'static>> {
    let persistence = payload.cookie.persistence;
    let expires = OffsetDateTime::now_utc()
        .checked_add(Duration::seconds(persistence))
        .ok_or_else(|| {
            TrackingError::configuration(format!(
                "Cookie persistence of {} seconds is out of range",
                persistence
            ))
        })?;

    Ok(
        Cookie::build((payload.cookie.name.clone(), payload.visitor_id.clone()))
            .path(payload.cookie.path.clone())
            .expires(expires)
            .build(),
    )
}

pub fn set_visitor_cookie<B>(response: &mut Response<B>, payload: &TrackingPayload) -> TrackingResult<()> {
    let cookie = visitor_cookie(payload)?;
    let value = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| TrackingError::encoding(format!("Visitor cookie: {}", e)))?;
    response.headers_mut().append(SET_COOKIE, value);
    Ok(())
}
