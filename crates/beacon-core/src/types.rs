//! Custom types for common data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard UTC DateTime type used across all Beacon crates
///
/// Serializes as ISO 8601 with 'Z' suffix: `2025-10-12T12:15:47.609192Z`
pub type UtcDateTime = DateTime<Utc>;

/// HTTP method the collector expects for a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    Get,
    Post,
}

impl RequestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name, path and lifetime of the visitor cookie attached to a tracked response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieSettings {
    pub name: String,
    pub path: String,
    /// Seconds from now until the cookie expires
    pub persistence: i64,
}
