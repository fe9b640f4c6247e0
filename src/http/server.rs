//! HTTP server setup.
//!
//! # Responsibilities
//! - Build shared state (upstream clients, rate limiter, experiments)
//! - Attach an admission gate to every API route
//! - Wire up shared middleware (request id, tracing)
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::Request,
    middleware::from_fn_with_state,
    routing::{get, post, MethodRouter},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::api::{self, ExperimentRegistry};
use crate::config::GatewayConfig;
use crate::http::admission::{admission_middleware, preflight, Gates, RouteGate};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::http::response::ApiError;
use crate::resilience::RetryPolicy;
use crate::security::RateLimiter;
use crate::upstream::{build_http_client, NewsletterClient, PriceFeed, UpstreamError, VideoCatalog};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub limiter: RateLimiter,
    pub price_feed: Arc<PriceFeed>,
    pub videos: Arc<VideoCatalog>,
    pub newsletter: Arc<NewsletterClient>,
    pub experiments: Arc<ExperimentRegistry>,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Result<Self, UpstreamError> {
        let client = build_http_client(&config.timeouts)?;
        let retry = RetryPolicy::from_config(&config.retries);

        Ok(Self {
            price_feed: Arc::new(PriceFeed::new(client.clone(), &config.bitcoin, retry.clone())?),
            videos: Arc::new(VideoCatalog::new(client.clone(), &config.youtube, retry)?),
            newsletter: Arc::new(NewsletterClient::new(client, &config.newsletter)?),
            experiments: Arc::new(ExperimentRegistry::from_config(&config.experiments)),
            limiter: RateLimiter::new(),
            config: Arc::new(config),
        })
    }
}

/// HTTP server for the site API.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: GatewayConfig) -> Result<Self, UpstreamError> {
        let state = AppState::new(config)?;

        if !state.videos.is_configured() {
            tracing::warn!("YouTube credentials missing, /api/videos will serve empty pages");
        }
        if !state.newsletter.is_configured() {
            tracing::warn!("ESP credentials missing, /api/subscribe will fail");
        }

        let router = build_router(state.clone());
        Ok(Self { router, state })
    }

    /// The fully layered router, for driving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires. The rate-limit sweeper
    /// runs for the same lifetime.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweep_every = Duration::from_secs(self.state.config.rate_limit.sweep_interval_secs);
        tokio::spawn(
            self.state
                .limiter
                .clone()
                .run_sweeper(sweep_every, shutdown.resubscribe()),
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the router with per-route admission and the shared middleware stack.
pub fn build_router(state: AppState) -> Router {
    let gates = Gates::new(&state.config, state.limiter.clone());

    Router::new()
        .route("/api/health", gated(get(api::health), gates.open("health")))
        .route(
            "/api/bitcoin/price",
            gated(get(api::bitcoin::price), gates.public_read("bitcoin_price")),
        )
        .route("/api/videos", gated(get(api::videos::list), gates.catalog("videos")))
        .route("/api/videos/{id}", gated(get(api::videos::by_id), gates.catalog("video")))
        .route(
            "/api/subscribe",
            gated(post(api::subscribe::subscribe), gates.subscribe("subscribe")),
        )
        .route(
            "/api/social/{platform}",
            gated(get(api::social::feed), gates.social("social")),
        )
        .route(
            "/api/experiments/{id}/variant",
            gated(get(api::experiments::variant), gates.public_read("experiments")),
        )
        .fallback(not_found)
        .with_state(state)
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = %request.headers().request_id(),
            )
        }))
        .layer(set_request_id_layer())
}

/// Answer `OPTIONS` and put the body limit under the admission gate, so
/// every rejection still carries CORS and rate-limit headers.
fn gated(route: MethodRouter<AppState>, gate: RouteGate) -> MethodRouter<AppState> {
    route
        .options(preflight)
        .layer(RequestBodyLimitLayer::new(gate.body_limit))
        .layer(from_fn_with_state(gate, admission_middleware))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".into())
}
