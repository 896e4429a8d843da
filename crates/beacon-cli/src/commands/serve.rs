use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::middleware::from_fn_with_state;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use beacon_analytics::handler::TRACKING_PIXEL_PATH;
use beacon_analytics::{
    attach_session, configure_routes, track_response, MemorySessionStore, ProviderRegistry,
    Tracker,
};
use beacon_queue::{BroadcastQueueService, PayloadSender, TrackingDeliveryListener};
use clap::Args;
use tracing::{info, warn};

use super::SettingsArgs;

const INDEX_PAGE: &str = r#"<!doctype html>
<html>
  <head><title>Beacon</title></head>
  <body>
    <h1>Beacon demo</h1>
    <p>This page is tracked server side. <a href="/about">About</a></p>
    <img src="/track?ua=1" width="1" height="1" alt="">
  </body>
</html>
"#;

const ABOUT_PAGE: &str = r#"<!doctype html>
<html>
  <head><title>About Beacon</title></head>
  <body>
    <h1>About</h1>
    <p><a href="/">Home</a></p>
  </body>
</html>
"#;

#[derive(Args)]
pub struct ServeCommand {
    /// Address to bind the demo site to
    #[arg(long, default_value = "127.0.0.1:8000", env = "BEACON_ADDRESS")]
    pub address: String,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Tracking jobs buffered for the delivery listener
    #[arg(long, default_value_t = 1024, env = "BEACON_QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Collector request timeout in seconds
    #[arg(long, default_value_t = 10, env = "BEACON_DELIVERY_TIMEOUT")]
    pub delivery_timeout: u64,

    /// Seconds of inactivity before a visit's session is dropped
    #[arg(long, default_value_t = 1800, env = "BEACON_SESSION_IDLE_TIMEOUT")]
    pub session_idle_timeout: u64,

    /// Sessions kept in memory before the least recently used is evicted
    #[arg(long, default_value_t = 10_000, env = "BEACON_MAX_SESSIONS")]
    pub max_sessions: usize,
}

impl ServeCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run())
    }

    async fn run(self) -> anyhow::Result<()> {
        let mut settings = self.settings.load()?;
        if settings.google_analytics_id.is_none()
            && settings.ga_google_analytics_id.is_none()
            && settings.ua_google_analytics_id.is_none()
        {
            warn!("No analytics account configured, hits will not be tracked");
        }
        if !settings.is_force_tracked(TRACKING_PIXEL_PATH) {
            settings
                .force_track_paths
                .push(TRACKING_PIXEL_PATH.to_string());
        }

        // The keep-alive receiver must outlive the server
        let (queue, _keep_alive) =
            BroadcastQueueService::create_job_queue_arc_with_receiver(self.queue_capacity);

        let tracker = Arc::new(Tracker::new(
            Arc::new(settings),
            ProviderRegistry::with_builtins(),
            queue.clone(),
        ));
        tracker
            .warm_up()
            .context("Custom data providers could not be resolved")?;

        let sender = PayloadSender::with_timeout(Duration::from_secs(self.delivery_timeout))?;
        let listener = TrackingDeliveryListener::new(sender, queue);
        listener.start().await;

        let sessions = Arc::new(MemorySessionStore::with_limits(
            Duration::from_secs(self.session_idle_timeout),
            self.max_sessions,
        ));
        let app = build_router(tracker, sessions);
        let addr: SocketAddr = self
            .address
            .parse()
            .with_context(|| format!("Invalid address {}", self.address))?;
        let tcp = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        info!("Serving demo site on http://{}", addr);
        axum::serve(
            tcp,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        listener.stop().await;
        info!("Beacon stopped");
        Ok(())
    }
}

/// Demo pages and the tracking pixel, tracked inside the session layer
pub fn build_router(tracker: Arc<Tracker>, sessions: Arc<MemorySessionStore>) -> Router {
    Router::new()
        .route("/", get(|| async { Html(INDEX_PAGE) }))
        .route("/about", get(|| async { Html(ABOUT_PAGE) }))
        .merge(configure_routes())
        .layer(from_fn_with_state(tracker, track_response))
        .layer(from_fn_with_state(sessions, attach_session))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
