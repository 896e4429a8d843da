//! Wire format descriptors.
//!
//! Both collector protocols share one derivation skeleton; everything that
//! differs between them lives in a [`FormatDescriptor`].

use beacon_core::RequestMethod;

use crate::TrackingRequest;

/// Query parameter whose presence selects the measurement-protocol format
pub const MODERN_FORMAT_MARKER: &str = "ua";

pub const LEGACY_COLLECTOR_URL: &str = "http://www.google-analytics.com/__utm.gif";
pub const MODERN_COLLECTOR_URL: &str = "http://www.google-analytics.com/collect";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingFormat {
    /// Pixel GET with `utm*` keys
    Legacy,
    /// Measurement-protocol POST with short keys
    Modern,
}

#[derive(Debug)]
pub struct FormatDescriptor {
    pub format: TrackingFormat,
    pub version: &'static str,
    pub cookie_name: &'static str,
    pub account_prefix: &'static str,
    /// Session slot holding this format's cached campaign parameters
    pub session_key: &'static str,
    /// Recognized campaign query keys and the payload keys they map to
    pub campaign_params: &'static [(&'static str, &'static str)],
    pub collector_url: &'static str,
    pub request_method: RequestMethod,
    /// New visitors get a random UUID instead of a hashed id
    pub random_visitor_id: bool,
}

pub static LEGACY: FormatDescriptor = FormatDescriptor {
    format: TrackingFormat::Legacy,
    version: "4.4sh",
    cookie_name: "__utmmobile",
    account_prefix: "MO",
    session_key: "ga_campaign_params",
    campaign_params: &[
        ("utm_source", "utmcsr"),
        ("utm_medium", "utmcmd"),
        ("utm_campaign", "utmccn"),
        ("utm_term", "utmctr"),
        ("utm_content", "utmcct"),
        ("gclid", "utmgclid"),
    ],
    collector_url: LEGACY_COLLECTOR_URL,
    request_method: RequestMethod::Get,
    random_visitor_id: false,
};

pub static MODERN: FormatDescriptor = FormatDescriptor {
    format: TrackingFormat::Modern,
    version: "1",
    cookie_name: "__uamobile",
    account_prefix: "UA",
    session_key: "ua_campaign_params",
    campaign_params: &[
        ("utm_source", "cs"),
        ("utm_medium", "cm"),
        ("utm_campaign", "cn"),
        ("utm_term", "ck"),
        ("utm_content", "cc"),
        ("utm_id", "ci"),
        ("gclid", "gclid"),
        ("dclid", "dclid"),
    ],
    collector_url: MODERN_COLLECTOR_URL,
    request_method: RequestMethod::Post,
    random_visitor_id: true,
};

impl TrackingFormat {
    pub fn select(request: &TrackingRequest) -> Self {
        if request.has_query_param(MODERN_FORMAT_MARKER) {
            TrackingFormat::Modern
        } else {
            TrackingFormat::Legacy
        }
    }

    pub fn descriptor(&self) -> &'static FormatDescriptor {
        match self {
            TrackingFormat::Legacy => &LEGACY,
            TrackingFormat::Modern => &MODERN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_selected_by_marker() {
        let request = TrackingRequest::from_uri("/page?ua=1");
        assert_eq!(TrackingFormat::select(&request), TrackingFormat::Modern);

        let request = TrackingRequest::from_uri("/page?ua");
        assert_eq!(TrackingFormat::select(&request), TrackingFormat::Modern);

        let request = TrackingRequest::from_uri("/page?utm_source=ua");
        assert_eq!(TrackingFormat::select(&request), TrackingFormat::Legacy);
    }

    #[test]
    fn test_formats_never_share_session_slot_or_cookie() {
        assert_ne!(LEGACY.session_key, MODERN.session_key);
        assert_ne!(LEGACY.cookie_name, MODERN.cookie_name);
        assert_eq!(TrackingFormat::Modern.descriptor().request_method, RequestMethod::Post);
        assert_eq!(TrackingFormat::Legacy.descriptor().request_method, RequestMethod::Get);
    }
}
