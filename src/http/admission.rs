//! Admission middleware applied to every public API route.
//!
//! ```text
//! request
//!     → OPTIONS? answer 204 with CORS headers, stop
//!     → resolve client identifier
//!     → rate limit (429 + headers, stop)
//!     → declared body over the route ceiling? 413, stop
//!     → handler, bounded by the request deadline (408 on expiry)
//!     → merge CORS + X-RateLimit-* headers into whatever came back
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::GatewayConfig;
use crate::http::request::RequestIdExt;
use crate::http::response::{apply_rate_limit_headers, merge_headers, ApiError};
use crate::observability::metrics;
use crate::security::limits::check_content_length;
use crate::security::{client_ip, CorsPolicy, RateLimitPolicy, RateLimiter};

/// Hard ceiling on any request body. Routes that accept bodies enforce
/// their own, smaller limit.
const BODY_CEILING: usize = 64 * 1024;

/// Resolved client identifier, inserted into request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

/// Admission settings for one route: its name, preset and CORS policy.
#[derive(Clone)]
pub struct RouteGate {
    pub route: &'static str,
    pub policy: Option<RateLimitPolicy>,
    pub cors: Arc<CorsPolicy>,
    pub limiter: RateLimiter,
    pub body_limit: usize,
    pub deadline: Duration,
}

impl RouteGate {
    /// Rate-limit buckets are per route so one endpoint cannot drain another.
    fn bucket(&self, client: &str) -> String {
        format!("{}:{}", self.route, client)
    }
}

/// Builds [`RouteGate`]s from the presets in configuration.
#[derive(Clone)]
pub struct Gates {
    limiter: RateLimiter,
    enabled: bool,
    strict: RateLimitPolicy,
    standard: RateLimitPolicy,
    relaxed: RateLimitPolicy,
    public: RateLimitPolicy,
    permissive_cors: Arc<CorsPolicy>,
    strict_cors: Arc<CorsPolicy>,
    body_limit: usize,
    deadline: Duration,
}

impl Gates {
    pub fn new(config: &GatewayConfig, limiter: RateLimiter) -> Self {
        let (permissive, strict) = CorsPolicy::presets(&config.cors);
        Self {
            limiter,
            enabled: config.rate_limit.enabled,
            strict: config.rate_limit.strict.to_policy(),
            standard: config.rate_limit.standard.to_policy(),
            relaxed: config.rate_limit.relaxed.to_policy(),
            public: config.rate_limit.public.to_policy(),
            permissive_cors: Arc::new(permissive),
            strict_cors: Arc::new(strict),
            body_limit: BODY_CEILING.max(config.security.max_body_size),
            deadline: Duration::from_secs(config.timeouts.request_secs),
        }
    }

    fn gate(&self, route: &'static str, policy: RateLimitPolicy, cors: &Arc<CorsPolicy>) -> RouteGate {
        RouteGate {
            route,
            policy: self.enabled.then_some(policy),
            cors: cors.clone(),
            limiter: self.limiter.clone(),
            body_limit: self.body_limit,
            deadline: self.deadline,
        }
    }

    /// Newsletter signup: standard preset, site origins only.
    pub fn subscribe(&self, route: &'static str) -> RouteGate {
        self.gate(route, self.standard, &self.strict_cors)
    }

    /// Video catalog: relaxed preset, any origin.
    pub fn catalog(&self, route: &'static str) -> RouteGate {
        self.gate(route, self.relaxed, &self.permissive_cors)
    }

    /// Cheap public reads: public preset, any origin.
    pub fn public_read(&self, route: &'static str) -> RouteGate {
        self.gate(route, self.public, &self.permissive_cors)
    }

    /// Placeholder social endpoints: strict preset, any origin.
    pub fn social(&self, route: &'static str) -> RouteGate {
        self.gate(route, self.strict, &self.permissive_cors)
    }

    /// Unmetered route that still answers CORS.
    pub fn open(&self, route: &'static str) -> RouteGate {
        RouteGate {
            route,
            policy: None,
            cors: self.permissive_cors.clone(),
            limiter: self.limiter.clone(),
            body_limit: self.body_limit,
            deadline: self.deadline,
        }
    }
}

/// 204 with the CORS headers and no body.
pub fn preflight_response(cors_headers: HeaderMap) -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    merge_headers(response.headers_mut(), cors_headers);
    response
}

/// Placeholder `OPTIONS` handler so the method is routed; the middleware
/// answers before it runs.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn admission_middleware(
    State(gate): State<RouteGate>,
    mut request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());
    let cors_headers = gate.cors.headers_for(origin);

    if request.method() == Method::OPTIONS {
        metrics::record_request(gate.route, "OPTIONS", StatusCode::NO_CONTENT.as_u16(), start);
        return preflight_response(cors_headers);
    }

    let client = client_ip::resolve(request.headers());
    let request_id = request.headers().request_id().to_string();
    let method = request.method().clone();

    let decision = gate
        .policy
        .map(|policy| gate.limiter.check(&gate.bucket(&client), &policy));

    let mut response = match decision {
        Some(decision) if !decision.admitted => {
            tracing::warn!(
                request_id = %request_id,
                client = %client,
                route = gate.route,
                reset_at = %decision.reset_at,
                "Rate limit exceeded"
            );
            metrics::record_rate_limited(gate.route);
            ApiError::TooManyRequests(decision).into_response()
        }
        _ => {
            request.extensions_mut().insert(ClientId(client.clone()));
            run_bounded(&gate, request, next, &request_id)
                .await
                .unwrap_or_else(IntoResponse::into_response)
        }
    };

    let headers = response.headers_mut();
    merge_headers(headers, cors_headers);
    if let Some(decision) = &decision {
        apply_rate_limit_headers(headers, decision);
    }

    tracing::debug!(
        request_id = %request_id,
        client = %client,
        route = gate.route,
        status = response.status().as_u16(),
        "Request admitted"
    );
    metrics::record_request(gate.route, method.as_str(), response.status().as_u16(), start);
    response
}

/// Run the handler under the route's body ceiling and deadline.
async fn run_bounded(
    gate: &RouteGate,
    request: Request,
    next: Next,
    request_id: &str,
) -> Result<Response, ApiError> {
    check_content_length(request.headers(), gate.body_limit)?;

    tokio::time::timeout(gate.deadline, next.run(request))
        .await
        .map_err(|_| {
            tracing::warn!(
                request_id = %request_id,
                route = gate.route,
                deadline_ms = gate.deadline.as_millis() as u64,
                "Request deadline exceeded"
            );
            ApiError::RequestTimeout
        })
}
