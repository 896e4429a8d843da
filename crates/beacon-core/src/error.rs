//! Error types shared by the tracking pipeline

use thiserror::Error;

use crate::QueueError;

/// Everything that can stop a tracking hit from being built or dispatched
#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Request attribute missing: {name}")]
    MissingAttribute { name: String },

    #[error("Custom data provider could not be resolved: {name}")]
    ProviderResolution { name: String },

    #[error("Session error: {message}")]
    Session { message: String },

    #[error("Encoding error: {message}")]
    Encoding { message: String },

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] QueueError),
}

impl TrackingError {
    pub fn configuration(message: impl Into<String>) -> Self {
        TrackingError::Configuration {
            message: message.into(),
        }
    }

    pub fn missing_attribute(name: impl Into<String>) -> Self {
        TrackingError::MissingAttribute { name: name.into() }
    }

    pub fn session(message: impl Into<String>) -> Self {
        TrackingError::Session {
            message: message.into(),
        }
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        TrackingError::Encoding {
            message: message.into(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, TrackingError::Configuration { .. })
    }

    /// The request lacks something the builder expects, such as a session
    pub fn is_attribute_error(&self) -> bool {
        matches!(
            self,
            TrackingError::MissingAttribute { .. } | TrackingError::Session { .. }
        )
    }

    /// Deployment-level failures that should stop startup rather than degrade every request
    pub fn is_fatal(&self) -> bool {
        matches!(self, TrackingError::ProviderResolution { .. })
    }
}

/// Result type alias for tracking operations
pub type TrackingResult<T> = Result<T, TrackingError>;
