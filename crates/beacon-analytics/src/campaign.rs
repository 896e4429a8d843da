//! Campaign attribution parameters cached per visit.
//!
//! A recognized parameter on the current request overwrites the cached value
//! for its key; every other cached key is kept. Each format has its own
//! session slot so the two never bleed into each other.

use std::collections::BTreeMap;

use beacon_core::{TrackingError, TrackingResult};
use tracing::debug;

use crate::format::FormatDescriptor;
use crate::TrackingRequest;

/// Payload key to value
pub type CampaignParams = BTreeMap<String, String>;

/// Overlay the request's recognized campaign parameters onto `cached`
pub fn merge_campaign_params(
    mut cached: CampaignParams,
    request: &TrackingRequest,
    descriptor: &FormatDescriptor,
) -> CampaignParams {
    for (query_key, payload_key) in descriptor.campaign_params {
        if let Some(value) = request.query_param(query_key) {
            cached.insert(payload_key.to_string(), value.to_string());
        }
    }
    cached
}

/// Read, merge and persist the campaign parameters for this format
pub fn update_session_campaign_params(
    request: &TrackingRequest,
    descriptor: &FormatDescriptor,
) -> TrackingResult<CampaignParams> {
    let session = request
        .session
        .as_ref()
        .ok_or_else(|| TrackingError::missing_attribute("session"))?;

    let cached = match session.get(descriptor.session_key)? {
        Some(value) => serde_json::from_value::<CampaignParams>(value).map_err(|e| {
            TrackingError::session(format!(
                "Cached campaign parameters under {} are malformed: {}",
                descriptor.session_key, e
            ))
        })?,
        None => CampaignParams::new(),
    };

    let merged = merge_campaign_params(cached, request, descriptor);
    let value = serde_json::to_value(&merged)
        .map_err(|e| TrackingError::encoding(format!("Campaign parameters: {}", e)))?;
    session.set(descriptor.session_key, value)?;

    debug!(
        "Campaign parameters for {}: {} cached keys",
        descriptor.session_key,
        merged.len()
    );
    Ok(merged)
}
