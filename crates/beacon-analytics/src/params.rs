//! Collector payload construction.

use std::collections::BTreeMap;

use beacon_core::{AnalyticsSettings, CookieSettings, TrackingError, TrackingPayload, TrackingResult};
use chrono::Utc;
use rand::Rng;
use tracing::debug;

use crate::account::resolve_account_id;
use crate::campaign::update_session_campaign_params;
use crate::format::{FormatDescriptor, TrackingFormat, LEGACY, MODERN};
use crate::providers::CustomDataProviders;
use crate::visitor::{gen_utma, visitor_id};
use crate::TrackingRequest;

const UNKNOWN_USER_AGENT: &str = "Unknown";
const CACHE_BUSTER_MAX: u32 = 0x7fff_ffff;

/// Event data attached to a hit
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingEvent {
    /// Joined into the pixel format's `utme` field as `5(a*b*c)`
    Segments(Vec<String>),
    /// Merged verbatim into a measurement-protocol body
    Fields(BTreeMap<String, String>),
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Overrides the `p` query parameter
    pub path: Option<String>,
    /// Overrides the `r` query parameter
    pub referer: Option<String>,
    pub event: Option<TrackingEvent>,
}

/// Request data shared by both formats
#[derive(Debug, Clone, PartialEq)]
pub struct GenericRequestData {
    pub domain: String,
    pub referer: String,
    pub path: String,
    pub user_agent: String,
    pub language: String,
    pub cookie: Option<String>,
    pub visitor_id: String,
    pub ip: String,
}

pub fn generic_request_data(
    request: &TrackingRequest,
    account: &str,
    descriptor: &FormatDescriptor,
    options: &BuildOptions,
) -> GenericRequestData {
    let user_agent = request.user_agent().unwrap_or(UNKNOWN_USER_AGENT).to_string();
    let cookie = request.cookie(descriptor.cookie_name).map(str::to_string);
    let visitor_id = visitor_id(
        request.device_id(),
        account,
        &user_agent,
        cookie.as_deref(),
        descriptor.random_visitor_id,
    );

    let referer = non_empty(options.referer.as_deref())
        .or_else(|| request.query_param("r"))
        .unwrap_or("")
        .to_string();
    let path = non_empty(options.path.as_deref())
        .or_else(|| request.query_param("p"))
        .unwrap_or("/")
        .to_string();

    GenericRequestData {
        domain: request.host().unwrap_or("").to_string(),
        referer,
        path,
        user_agent,
        language: request.accept_language().unwrap_or("").to_string(),
        cookie,
        visitor_id,
        ip: request
            .remote_addr
            .map(|ip| ip.to_string())
            .unwrap_or_default(),
    }
}

/// Builds collector payloads from request metadata
pub struct PayloadBuilder<'a> {
    settings: &'a AnalyticsSettings,
    providers: &'a CustomDataProviders,
}

impl<'a> PayloadBuilder<'a> {
    pub fn new(settings: &'a AnalyticsSettings, providers: &'a CustomDataProviders) -> Self {
        Self {
            settings,
            providers,
        }
    }

    /// Build a hit in the format the request asks for
    pub fn build(
        &self,
        request: &TrackingRequest,
        options: &BuildOptions,
    ) -> TrackingResult<TrackingPayload> {
        match TrackingFormat::select(request) {
            TrackingFormat::Legacy => self.build_legacy(request, options),
            TrackingFormat::Modern => self.build_modern(request, options),
        }
    }

    /// Pixel GET hit
    pub fn build_legacy(
        &self,
        request: &TrackingRequest,
        options: &BuildOptions,
    ) -> TrackingResult<TrackingPayload> {
        let account = resolve_account_id(self.settings, request, TrackingFormat::Legacy)?;
        let data = generic_request_data(request, &account, &LEGACY, options);

        let mut params = fields([
            ("utmwv", LEGACY.version.to_string()),
            ("utmn", cache_buster()),
            ("utmhn", data.domain.clone()),
            ("utmsr", String::new()),
            ("utme", String::new()),
            ("utmr", data.referer.clone()),
            ("utmp", data.path.clone()),
            ("utmac", account),
            ("utmcc", format!("__utma={};", gen_utma(&data.domain))),
            ("utmvid", data.visitor_id.clone()),
            ("utmip", data.ip.clone()),
        ]);

        if let Some(TrackingEvent::Segments(segments)) = &options.event {
            params.insert("utmt".to_string(), "event".to_string());
            params.insert("utme".to_string(), format!("5({})", segments.join("*")));
        }

        let campaign = update_session_campaign_params(request, &LEGACY)?;
        params.extend(campaign);

        let url = format!("{}?{}", LEGACY.collector_url, encode(&params)?);
        Ok(self.payload(&LEGACY, url, String::new(), data))
    }

    /// Measurement-protocol POST hit
    pub fn build_modern(
        &self,
        request: &TrackingRequest,
        options: &BuildOptions,
    ) -> TrackingResult<TrackingPayload> {
        let account = resolve_account_id(self.settings, request, TrackingFormat::Modern)?;
        let data = generic_request_data(request, &account, &MODERN, options);

        let mut params = fields([
            ("v", MODERN.version.to_string()),
            ("z", cache_buster()),
            ("dh", data.domain.clone()),
            ("dr", data.referer.clone()),
            ("dp", data.path.clone()),
            ("tid", account),
            ("cid", data.visitor_id.clone()),
        ]);

        match &options.event {
            Some(TrackingEvent::Fields(event)) => {
                params.extend(event.clone());
                params.insert("t".to_string(), "event".to_string());
            }
            _ => {
                params.insert("t".to_string(), "pageview".to_string());
            }
        }

        self.providers.apply(request, &mut params)?;
        let campaign = update_session_campaign_params(request, &MODERN)?;
        params.extend(campaign);

        let body = encode(&params)?;
        Ok(self.payload(&MODERN, MODERN.collector_url.to_string(), body, data))
    }

    fn payload(
        &self,
        descriptor: &FormatDescriptor,
        url: String,
        body: String,
        data: GenericRequestData,
    ) -> TrackingPayload {
        debug!(
            "Built {:?} hit for visitor {} on {}",
            descriptor.format, data.visitor_id, data.path
        );
        TrackingPayload {
            url,
            body,
            request_method: descriptor.request_method,
            user_agent: data.user_agent,
            language: data.language,
            visitor_id: data.visitor_id,
            cookie: CookieSettings {
                name: descriptor.cookie_name.to_string(),
                path: self.settings.cookie_path.clone(),
                persistence: self.settings.cookie_user_persistence,
            },
            created_at: Utc::now(),
        }
    }
}

fn fields<const N: usize>(pairs: [(&str, String); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn cache_buster() -> String {
    rand::thread_rng().gen_range(0..=CACHE_BUSTER_MAX).to_string()
}

fn encode(params: &BTreeMap<String, String>) -> TrackingResult<String> {
    serde_urlencoded::to_string(params).map_err(|e| TrackingError::encoding(e.to_string()))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
