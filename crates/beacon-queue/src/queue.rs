use std::sync::Arc;

use beacon_core::async_trait::async_trait;
use beacon_core::{Job, JobQueue, JobReceiver, QueueError};
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

#[derive(Clone)]
pub struct BroadcastQueueService {
    broadcast_sender: broadcast::Sender<Job>,
}

// Wrapper for broadcast::Receiver to implement JobReceiver trait
pub struct BroadcastJobReceiver {
    receiver: broadcast::Receiver<Job>,
}

#[async_trait]
impl JobReceiver for BroadcastJobReceiver {
    async fn recv(&mut self) -> Result<Job, QueueError> {
        let result = self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => {
                error!("Broadcast channel closed");
                QueueError::ChannelClosed
            }
            broadcast::error::RecvError::Lagged(n) => {
                warn!("Receiver lagged by {} messages", n);
                QueueError::ReceiveError(format!("Receiver lagged by {} messages", n))
            }
        });

        if let Ok(job) = &result {
            debug!("Received job: {}", job);
        }

        result
    }
}

#[async_trait]
impl JobQueue for BroadcastQueueService {
    async fn send(&self, job: Job) -> Result<(), QueueError> {
        let subscriber_count = self.broadcast_sender.receiver_count();
        debug!("Broadcasting job to {} subscribers: {}", subscriber_count, job);

        // Only the keep-alive receiver may be listening; the hit is dropped in that case
        if subscriber_count <= 1 {
            debug!("No delivery listener may be subscribed, job can be lost: {}", job);
        }

        self.broadcast_sender.send(job).map_err(|e| {
            error!("Failed to broadcast job: {}", e);
            QueueError::SendError(format!("Broadcast send failed: {}", e))
        })?;
        Ok(())
    }

    fn subscribe(&self) -> Box<dyn JobReceiver> {
        debug!(
            "Creating new subscriber, current count: {}",
            self.broadcast_sender.receiver_count()
        );
        Box::new(BroadcastJobReceiver {
            receiver: self.broadcast_sender.subscribe(),
        })
    }
}

impl BroadcastQueueService {
    pub fn new(broadcast_sender: broadcast::Sender<Job>) -> Self {
        Self { broadcast_sender }
    }

    pub fn create_broadcast_channel(
        buffer_size: usize,
    ) -> (BroadcastQueueService, broadcast::Receiver<Job>) {
        debug!("Creating broadcast channel with buffer size: {}", buffer_size);
        let (sender, receiver) = broadcast::channel(buffer_size);
        (BroadcastQueueService::new(sender), receiver)
    }

    /// Create a new broadcast queue that implements the JobQueue trait
    /// Returns (queue, keep_alive_receiver) - the receiver must be kept alive!
    pub fn create_job_queue_arc_with_receiver(
        buffer_size: usize,
    ) -> (Arc<dyn JobQueue>, broadcast::Receiver<Job>) {
        let (queue, receiver) = Self::create_broadcast_channel(buffer_size);
        (Arc::new(queue), receiver)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Job> {
        self.broadcast_sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::chrono::Utc;
    use beacon_core::{CookieSettings, RequestMethod, TrackingPayload};
    use tokio::time::{timeout, Duration};

    fn payload(visitor_id: &str) -> TrackingPayload {
        TrackingPayload {
            url: "http://www.google-analytics.com/collect".to_string(),
            body: format!("v=1&cid={}", visitor_id),
            request_method: RequestMethod::Post,
            user_agent: "TestAgent".to_string(),
            language: "en-US".to_string(),
            visitor_id: visitor_id.to_string(),
            cookie: CookieSettings {
                name: "__uamobile".to_string(),
                path: "/".to_string(),
                persistence: 63_072_000,
            },
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_subscribe_tracking_job() {
        let (queue, _keep_alive) = BroadcastQueueService::create_broadcast_channel(10);
        let mut receiver = queue.subscribe();

        JobQueue::send(&queue, Job::DeliverTracking(payload("visitor-1")))
            .await
            .unwrap();

        match receiver.recv().await.unwrap() {
            Job::DeliverTracking(data) => {
                assert_eq!(data.visitor_id, "visitor-1");
                assert_eq!(data.request_method, RequestMethod::Post);
            }
        }
    }

    #[tokio::test]
    async fn test_multiple_jobs_fifo_order() {
        let (queue, _keep_alive) = BroadcastQueueService::create_broadcast_channel(10);
        let mut receiver = queue.subscribe();

        for i in 0..3 {
            JobQueue::send(&queue, Job::DeliverTracking(payload(&format!("visitor-{}", i))))
                .await
                .unwrap();
        }

        for i in 0..3 {
            let Job::DeliverTracking(data) = receiver.recv().await.unwrap();
            assert_eq!(data.visitor_id, format!("visitor-{}", i));
        }
    }

    #[tokio::test]
    async fn test_send_without_receivers_fails() {
        let (queue, keep_alive) = BroadcastQueueService::create_broadcast_channel(10);
        drop(keep_alive);

        let result = JobQueue::send(&queue, Job::DeliverTracking(payload("lost"))).await;
        assert!(matches!(result, Err(QueueError::SendError(_))));
    }

    #[tokio::test]
    async fn test_broadcast_late_subscriber() {
        let (queue, _keep_alive) = BroadcastQueueService::create_broadcast_channel(10);

        JobQueue::send(&queue, Job::DeliverTracking(payload("early")))
            .await
            .unwrap();

        let mut late = JobQueue::subscribe(&queue);
        let result = timeout(Duration::from_millis(50), late.recv()).await;
        assert!(result.is_err(), "late subscriber should not see earlier jobs");
    }
}
