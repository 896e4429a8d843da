//! Analytics settings
//!
//! Every field has a default so a settings file only needs to name what it
//! changes. Empty lists mean the corresponding policy is not configured.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{TrackingError, TrackingResult};

/// Two years, in seconds
pub const DEFAULT_COOKIE_USER_PERSISTENCE: i64 = 63_072_000;
/// Ten years, in seconds
pub const MAX_COOKIE_USER_PERSISTENCE: i64 = 315_360_000;
pub const DEFAULT_COOKIE_PATH: &str = "/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsSettings {
    /// Base account identifier, used when no format-specific one is set
    pub google_analytics_id: Option<String>,
    /// Account identifier for the legacy pixel format
    pub ga_google_analytics_id: Option<String>,
    /// Account identifier for the measurement-protocol format
    pub ua_google_analytics_id: Option<String>,
    /// Name of a request attribute that may carry a per-request account override
    pub request_key: Option<String>,

    /// Paths tracked regardless of content type or ignore list
    pub force_track_paths: Vec<String>,
    /// Response content-type prefixes eligible for tracking
    pub include_content_types: Vec<String>,
    /// Path prefixes never tracked
    pub ignore_paths: Vec<String>,

    /// Registered names of custom data providers merged into measurement-protocol hits
    pub custom_data_providers: Vec<String>,

    pub cookie_user_persistence: i64,
    pub cookie_path: String,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            google_analytics_id: None,
            ga_google_analytics_id: None,
            ua_google_analytics_id: None,
            request_key: None,
            force_track_paths: Vec::new(),
            include_content_types: Vec::new(),
            ignore_paths: Vec::new(),
            custom_data_providers: Vec::new(),
            cookie_user_persistence: DEFAULT_COOKIE_USER_PERSISTENCE,
            cookie_path: DEFAULT_COOKIE_PATH.to_string(),
        }
    }
}

impl AnalyticsSettings {
    pub fn from_yaml_str(contents: &str) -> TrackingResult<Self> {
        let settings: Self = serde_yaml::from_str(contents)
            .map_err(|e| TrackingError::configuration(format!("Invalid YAML settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_str(contents: &str) -> TrackingResult<Self> {
        let settings: Self = serde_json::from_str(contents)
            .map_err(|e| TrackingError::configuration(format!("Invalid JSON settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> TrackingResult<()> {
        if !(0..=MAX_COOKIE_USER_PERSISTENCE).contains(&self.cookie_user_persistence) {
            return Err(TrackingError::configuration(format!(
                "cookie_user_persistence must be between 0 and {} seconds, got {}",
                MAX_COOKIE_USER_PERSISTENCE, self.cookie_user_persistence
            )));
        }
        Ok(())
    }

    /// Load settings from a `.json` file, or YAML for any other extension
    pub fn from_file(path: &Path) -> TrackingResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            TrackingError::configuration(format!(
                "Failed to read settings file {}: {}",
                path.display(),
                e
            ))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            _ => Self::from_yaml_str(&contents),
        }
    }

    pub fn is_force_tracked(&self, path: &str) -> bool {
        self.force_track_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        self.ignore_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Missing content types only pass when no allow-list is configured
    pub fn is_content_type_included(&self, content_type: Option<&str>) -> bool {
        if self.include_content_types.is_empty() {
            return true;
        }
        let content_type = content_type.unwrap_or("");
        self.include_content_types
            .iter()
            .any(|prefix| content_type.starts_with(prefix.as_str()))
    }
}
