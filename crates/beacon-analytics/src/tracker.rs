//! The response interceptor.
//!
//! [`Tracker::process_response`] decides whether a response is tracked, builds
//! the payload, sets the visitor cookie and enqueues the payload for delivery.
//! It is an error boundary: per-request failures are logged and the response
//! is handed back as it was.

use std::sync::Arc;

use axum::http::header::CONTENT_TYPE;
use axum::http::Response;
use beacon_core::{
    AnalyticsSettings, Job, JobQueue, TrackingError, TrackingPayload, TrackingResult,
};
use tracing::{debug, error, info, warn};

use crate::cookies::set_visitor_cookie;
use crate::params::{BuildOptions, PayloadBuilder, TrackingEvent};
use crate::providers::{CustomDataProviders, ProviderRegistry};
use crate::TrackingRequest;

/// Outcome of the tracking policy for one response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingDecision {
    /// Path matched a forced prefix; the other checks were skipped
    Forced,
    ContentTypeExcluded,
    PathIgnored,
    Track,
}

impl TrackingDecision {
    pub fn should_track(&self) -> bool {
        matches!(self, TrackingDecision::Forced | TrackingDecision::Track)
    }
}

pub struct Tracker {
    settings: Arc<AnalyticsSettings>,
    providers: CustomDataProviders,
    queue: Arc<dyn JobQueue>,
}

impl Tracker {
    pub fn new(
        settings: Arc<AnalyticsSettings>,
        registry: ProviderRegistry,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        let providers = CustomDataProviders::new(settings.custom_data_providers.clone(), registry);
        Self {
            settings,
            providers,
            queue,
        }
    }

    pub fn settings(&self) -> &AnalyticsSettings {
        &self.settings
    }

    /// Resolve the configured custom data providers up front.
    ///
    /// An unknown provider name is a deployment error; call this at startup so
    /// it stops the process instead of silently failing every hit.
    pub fn warm_up(&self) -> TrackingResult<usize> {
        let count = self.providers.resolve()?.len();
        info!("Tracker ready with {} custom data providers", count);
        Ok(count)
    }

    /// First match wins: forced path, content-type allow-list, ignored path
    pub fn decide(&self, path: &str, content_type: Option<&str>) -> TrackingDecision {
        if self.settings.is_force_tracked(path) {
            return TrackingDecision::Forced;
        }
        if !self.settings.is_content_type_included(content_type) {
            return TrackingDecision::ContentTypeExcluded;
        }
        if self.settings.is_ignored(path) {
            return TrackingDecision::PathIgnored;
        }
        TrackingDecision::Track
    }

    /// Build a payload in the format the request selects
    pub fn build_params(
        &self,
        request: &TrackingRequest,
        options: &BuildOptions,
    ) -> TrackingResult<TrackingPayload> {
        PayloadBuilder::new(&self.settings, &self.providers).build(request, options)
    }

    /// Track `response` if policy allows. Never fails; the response comes back
    /// unmodified unless the visitor cookie was set.
    pub async fn process_response<B: Send>(
        &self,
        request: &TrackingRequest,
        mut response: Response<B>,
    ) -> Response<B> {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());
        let decision = self.decide(&request.path, content_type);
        if !decision.should_track() {
            debug!("Skipping tracking for {}: {:?}", request.path, decision);
            return response;
        }

        if let Err(e) = self.track_response(request, &mut response).await {
            log_contained(&request.path, &e);
        }
        response
    }

    async fn track_response<B: Send>(
        &self,
        request: &TrackingRequest,
        response: &mut Response<B>,
    ) -> TrackingResult<()> {
        let options = BuildOptions {
            path: Some(request.path.clone()),
            referer: request.referer().map(str::to_string),
            event: None,
        };
        let payload = self.build_params(request, &options)?;
        set_visitor_cookie(response, &payload)?;
        self.dispatch(payload).await
    }

    /// Build and enqueue an event hit without a response to decorate
    pub async fn track_event(
        &self,
        request: &TrackingRequest,
        event: TrackingEvent,
    ) -> TrackingResult<TrackingPayload> {
        let options = BuildOptions {
            path: Some(request.path.clone()),
            referer: request.referer().map(str::to_string),
            event: Some(event),
        };
        let payload = self.build_params(request, &options)?;
        self.dispatch(payload.clone()).await?;
        Ok(payload)
    }

    /// Fire and forget: the delivery listener owns the payload from here
    async fn dispatch(&self, payload: TrackingPayload) -> TrackingResult<()> {
        let job = Job::DeliverTracking(payload);
        debug!("Dispatching {}", job);
        self.queue.send(job).await?;
        Ok(())
    }
}

fn log_contained(path: &str, err: &TrackingError) {
    match err {
        e if e.is_configuration() => warn!("Tracking disabled for {}: {}", path, e),
        e if e.is_attribute_error() => debug!("Tracking skipped for {}: {}", path, e),
        TrackingError::Dispatch(e) => warn!("Tracking payload for {} was not queued: {}", path, e),
        e => error!("Tracking failed for {}: {}", path, e),
    }
}
