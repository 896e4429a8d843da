//! Implementation of the tracking job queue using tokio broadcast channels,
//! plus the listener that relays queued payloads to the analytics collector.

pub mod delivery;
pub mod queue;
pub mod subscriber;

pub use delivery::{heal_user_agent, DeliveryOutcome, PayloadSender, TrackingDeliveryListener};
pub use queue::*;
pub use subscriber::*;

// Re-export core traits for convenience
pub use beacon_core::{JobQueue, JobReceiver, QueueError};
