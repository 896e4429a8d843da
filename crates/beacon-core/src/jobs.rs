use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{CookieSettings, RequestMethod, UtcDateTime};

/// A fully built analytics hit, ready to be relayed to the collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingPayload {
    pub url: String,
    /// Empty for pixel hits, URL-encoded form for measurement-protocol hits
    pub body: String,
    pub request_method: RequestMethod,
    pub user_agent: String,
    pub language: String,
    pub visitor_id: String,
    pub cookie: CookieSettings,
    pub created_at: UtcDateTime,
}

/// Core job enum containing all possible job types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Job {
    DeliverTracking(TrackingPayload),
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::DeliverTracking(payload) => write!(
                f,
                "DeliverTracking({} {}, visitor: {})",
                payload.request_method, payload.url, payload.visitor_id
            ),
        }
    }
}

// Core queue abstraction - beacon-queue implements this
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Failed to send job: {0}")]
    SendError(String),
    #[error("Failed to receive job: {0}")]
    ReceiveError(String),
    #[error("Queue channel closed")]
    ChannelClosed,
}

/// Core trait for job queue operations
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Send a job to the queue
    async fn send(&self, job: Job) -> Result<(), QueueError>;

    /// Create a new receiver for jobs
    fn subscribe(&self) -> Box<dyn JobReceiver>;
}

/// Core trait for receiving jobs
#[async_trait]
pub trait JobReceiver: Send {
    /// Receive the next job
    async fn recv(&mut self) -> Result<Job, QueueError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_job_display() {
        let job = Job::DeliverTracking(TrackingPayload {
            url: "http://www.google-analytics.com/collect".to_string(),
            body: "v=1".to_string(),
            request_method: RequestMethod::Post,
            user_agent: "TestAgent".to_string(),
            language: "en".to_string(),
            visitor_id: "abc".to_string(),
            cookie: CookieSettings {
                name: "__uamobile".to_string(),
                path: "/".to_string(),
                persistence: 60,
            },
            created_at: Utc::now(),
        });

        assert_eq!(
            job.to_string(),
            "DeliverTracking(POST http://www.google-analytics.com/collect, visitor: abc)"
        );
    }
}
