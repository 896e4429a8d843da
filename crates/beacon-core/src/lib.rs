//! Core settings, payload types and queue traits shared across all Beacon crates

pub mod config;
pub mod error;
pub mod jobs;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use error::*;
pub use jobs::*;
pub use types::*;
pub use utils::*;

// Re-export external dependencies
pub use async_trait;
pub use chrono;
pub use serde;
pub use serde_json;
pub use thiserror;
pub use tracing;
pub use uuid;
