//! Server-side analytics tracking.
//!
//! The [`Tracker`] inspects outgoing responses, derives a collector payload
//! from the request, sets the visitor cookie and hands the payload to the job
//! queue for delivery. [`middleware::track_response`] mounts it on an axum
//! router.

pub mod account;
pub mod campaign;
pub mod context;
pub mod cookies;
pub mod format;
pub mod handler;
pub mod middleware;
pub mod params;
pub mod providers;
pub mod session;
pub mod tracker;
pub mod visitor;

pub use campaign::CampaignParams;
pub use context::{RequestAttributes, TrackingRequest};
pub use format::{FormatDescriptor, TrackingFormat};
pub use handler::configure_routes;
pub use middleware::track_response;
pub use params::{BuildOptions, PayloadBuilder, TrackingEvent};
pub use providers::{CustomDataProvider, CustomDataProviders, ProviderRegistry};
pub use session::{attach_session, MemorySession, MemorySessionStore, Session, SessionHandle};
pub use tracker::{Tracker, TrackingDecision};
