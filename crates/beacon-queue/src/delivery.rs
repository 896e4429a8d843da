//! Relays queued tracking payloads to the analytics collector.
//!
//! Delivery is fire-and-forget: every payload gets exactly one attempt, and
//! failures are logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use beacon_core::chrono::{DateTime, Utc};
use beacon_core::{Job, JobQueue, QueueError, RequestMethod, TrackingPayload};
use reqwest::header::{ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Some user agents carry group references like `\2` that break downstream
/// rewriting; they are sent with forward slashes instead.
pub fn heal_user_agent(user_agent: &str) -> String {
    user_agent.replace('\\', "/")
}

/// Result of a single delivery attempt
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub visitor_id: String,
    pub success: bool,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
    pub delivered_at: DateTime<Utc>,
}

/// Sends payloads to the collector over HTTP
#[derive(Clone)]
pub struct PayloadSender {
    http_client: reqwest::Client,
}

impl PayloadSender {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http_client })
    }

    pub async fn deliver(&self, payload: &TrackingPayload) -> DeliveryOutcome {
        let mut request_builder = match payload.request_method {
            RequestMethod::Get => self.http_client.get(&payload.url),
            RequestMethod::Post => self
                .http_client
                .post(&payload.url)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(payload.body.clone()),
        };

        request_builder = request_builder.header(USER_AGENT, heal_user_agent(&payload.user_agent));
        if !payload.language.is_empty() {
            request_builder = request_builder.header(ACCEPT_LANGUAGE, &payload.language);
        }

        let (success, status_code, error_message) = match request_builder.send().await {
            Ok(resp) => {
                let status = resp.status();
                (status.is_success(), Some(status.as_u16()), None)
            }
            Err(e) => (false, None, Some(e.to_string())),
        };

        DeliveryOutcome {
            visitor_id: payload.visitor_id.clone(),
            success,
            status_code,
            error_message,
            delivered_at: Utc::now(),
        }
    }
}

/// Subscribes to the job queue and relays every tracking payload
pub struct TrackingDeliveryListener {
    sender: PayloadSender,
    queue: Arc<dyn JobQueue>,
    shutdown: CancellationToken,
    task_handle: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl TrackingDeliveryListener {
    pub fn new(sender: PayloadSender, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            sender,
            queue,
            shutdown: CancellationToken::new(),
            task_handle: Arc::new(RwLock::new(None)),
        }
    }

    /// Start listening for tracking jobs
    pub async fn start(&self) {
        let mut task_handle = self.task_handle.write().await;
        if task_handle.is_some() {
            info!("Tracking delivery listener already running");
            return;
        }

        let mut receiver = self.queue.subscribe();
        let sender = self.sender.clone();
        let shutdown = self.shutdown.clone();

        let handle = tokio::spawn(async move {
            info!("Tracking delivery listener started");
            let mut job_count: u64 = 0;
            loop {
                let next = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    next = receiver.recv() => next,
                };

                match next {
                    Ok(Job::DeliverTracking(payload)) => {
                        job_count += 1;
                        let sender = sender.clone();
                        // One attempt per hit, never awaited by the receive loop
                        tokio::spawn(async move {
                            Self::report(sender.deliver(&payload).await);
                        });
                    }
                    Err(QueueError::ChannelClosed) => {
                        warn!("Job queue closed, stopping tracking delivery listener");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to receive tracking job: {}", e);
                    }
                }
            }
            info!(
                "Tracking delivery listener stopped after {} payloads",
                job_count
            );
        });

        *task_handle = Some(handle);
    }

    /// Stop the listener and wait for the receive loop to exit
    pub async fn stop(&self) {
        self.shutdown.cancel();
        if let Some(handle) = self.task_handle.write().await.take() {
            let _ = handle.await;
        }
    }

    pub async fn is_running(&self) -> bool {
        self.task_handle
            .read()
            .await
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    fn report(outcome: DeliveryOutcome) {
        if outcome.success {
            debug!(
                "Delivered tracking hit for visitor {} ({:?})",
                outcome.visitor_id, outcome.status_code
            );
        } else {
            warn!(
                "Tracking hit for visitor {} was not accepted: status {:?}, error {:?}",
                outcome.visitor_id, outcome.status_code, outcome.error_message
            );
        }
    }
}
