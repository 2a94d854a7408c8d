//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the demo and admin handlers
//! - Layer the telemetry pipeline onto the demo routes only
//! - Wire up ambient middleware (tracing, request ID, caller role)
//! - Apply the request timeout inside the telemetry layers
//! - Serve on a listener until the shutdown signal fires

use std::time::Duration;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::{setup_admin_router, AdminState};
use crate::config::TelemetryConfig;
use crate::http::{context, routes};
use crate::pipeline::TelemetryPipeline;

/// HTTP server hosting the instrumented demo routes.
pub struct TelemetryServer {
    router: Router,
    config: TelemetryConfig,
}

impl TelemetryServer {
    /// Create a server with the default collaborators for `config`.
    pub fn new(config: TelemetryConfig) -> Self {
        let pipeline = TelemetryPipeline::from_config(&config);
        Self::with_pipeline(config, pipeline)
    }

    /// Create a server around a pre-built pipeline.
    pub fn with_pipeline(config: TelemetryConfig, pipeline: TelemetryPipeline) -> Self {
        let admin = config.admin.enabled.then(|| AdminState {
            registry: pipeline.registry(),
            tracker: pipeline.tracker(),
            logger: pipeline.logger(),
            console: pipeline.console(),
            api_key: config.admin.api_key.clone(),
        });

        let router = Self::build_router(&config, pipeline, admin);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(
        config: &TelemetryConfig,
        pipeline: TelemetryPipeline,
        admin: Option<AdminState>,
    ) -> Router {
        let timeout = TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs));

        // Timeout sits inside the pipeline so a 408 is still measured.
        let mut app = pipeline.apply(routes::router().layer(timeout.clone()));
        if let Some(state) = admin {
            app = app.merge(setup_admin_router(state).layer(timeout));
        }

        app.layer(middleware::from_fn(context::caller_role_from_header))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// A clone of the fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}
