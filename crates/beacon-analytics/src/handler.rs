use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

/// 1x1 transparent GIF
pub const TRACKING_PIXEL: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

pub const TRACKING_PIXEL_PATH: &str = "/track";

/// Pixel endpoint pages can beacon through; list it in `force_track_paths`
pub async fn tracking_pixel() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "image/gif"), (CACHE_CONTROL, "no-cache")],
        TRACKING_PIXEL,
    )
}

pub fn configure_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(TRACKING_PIXEL_PATH, get(tracking_pixel))
}
