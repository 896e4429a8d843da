use beacon_core::{mask_sensitive, AnalyticsSettings, TrackingError, TrackingResult};
use tracing::debug;

use crate::format::TrackingFormat;
use crate::TrackingRequest;

/// Resolve the collector account for a hit.
///
/// A format-specific identifier wins over the base one; measurement-protocol
/// hits may additionally be overridden per request through the attribute
/// named by `request_key`. The first two characters are replaced with the
/// format's prefix (`UA-1234-1` becomes `MO-1234-1` for pixel hits).
pub fn resolve_account_id(
    settings: &AnalyticsSettings,
    request: &TrackingRequest,
    format: TrackingFormat,
) -> TrackingResult<String> {
    let base = non_empty(settings.google_analytics_id.as_deref());
    let mut account_id = match format {
        TrackingFormat::Legacy => non_empty(settings.ga_google_analytics_id.as_deref()).or(base),
        TrackingFormat::Modern => non_empty(settings.ua_google_analytics_id.as_deref()).or(base),
    };

    if format == TrackingFormat::Modern {
        if let Some(request_key) = non_empty(settings.request_key.as_deref()) {
            if let Some(overridden) = non_empty(request.attributes.get(request_key)) {
                debug!("Account overridden by request attribute {}", request_key);
                account_id = Some(overridden);
            }
        }
    }

    let account_id =
        account_id.ok_or_else(|| TrackingError::configuration("No Google Analytics ID configured"))?;

    let prefix = format.descriptor().account_prefix;
    let resolved = format!("{}{}", prefix, account_id.get(2..).unwrap_or(""));
    debug!("Resolved account {}", mask_sensitive(&resolved));
    Ok(resolved)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
