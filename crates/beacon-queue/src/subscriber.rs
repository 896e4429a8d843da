// Re-export for convenience - consumers can subscribe directly
pub use beacon_core::Job;
pub use tokio::sync::broadcast;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BroadcastQueueService;
    use beacon_core::chrono::Utc;
    use beacon_core::{CookieSettings, JobQueue, RequestMethod, TrackingPayload};
    use std::sync::Arc;

    fn pixel_payload() -> TrackingPayload {
        TrackingPayload {
            url: "http://www.google-analytics.com/__utm.gif?utmwv=4.4sh".to_string(),
            body: String::new(),
            request_method: RequestMethod::Get,
            user_agent: "TestAgent".to_string(),
            language: String::new(),
            visitor_id: "0x0123456789abcdef".to_string(),
            cookie: CookieSettings {
                name: "__utmmobile".to_string(),
                path: "/".to_string(),
                persistence: 63_072_000,
            },
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_trait_based_usage() {
        // Consumers get a JobQueue trait object
        let (queue, _keep_alive): (Arc<dyn JobQueue>, _) =
            BroadcastQueueService::create_job_queue_arc_with_receiver(10);
        let mut receiver = queue.subscribe();

        queue
            .send(Job::DeliverTracking(pixel_payload()))
            .await
            .unwrap();

        let Job::DeliverTracking(data) = receiver.recv().await.unwrap();
        assert_eq!(data.request_method, RequestMethod::Get);
        assert!(data.body.is_empty());
        assert_eq!(data.cookie.name, "__utmmobile");
    }

    #[tokio::test]
    async fn test_multiple_subscribers_each_see_job() {
        let (queue, _keep_alive) = BroadcastQueueService::create_broadcast_channel(10);
        let mut first = JobQueue::subscribe(&queue);
        let mut second = JobQueue::subscribe(&queue);

        JobQueue::send(&queue, Job::DeliverTracking(pixel_payload()))
            .await
            .unwrap();

        let Job::DeliverTracking(a) = first.recv().await.unwrap();
        let Job::DeliverTracking(b) = second.recv().await.unwrap();
        assert_eq!(a.visitor_id, b.visitor_id);
    }
}
