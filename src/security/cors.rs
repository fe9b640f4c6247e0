//! CORS policy evaluation.
//!
//! The gateway never rejects a request for its origin. A mismatched origin
//! simply gets no `Access-Control-Allow-Origin` header and the browser
//! enforces the failure.

use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};

use crate::config::CorsConfig;

/// Which origins may read responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

/// Static cross-origin policy attached to a route at startup.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    pub origins: AllowedOrigins,
    pub methods: Vec<Method>,
    pub allowed_headers: Vec<HeaderName>,
    pub exposed_headers: Vec<HeaderName>,
    pub allow_credentials: bool,
    pub max_age: Option<Duration>,
}

impl CorsPolicy {
    /// Public reads: any origin, no credentials, rate-limit headers readable.
    pub fn permissive(max_age: Duration) -> Self {
        Self {
            origins: AllowedOrigins::Any,
            methods: vec![Method::GET, Method::OPTIONS],
            allowed_headers: vec![header::CONTENT_TYPE],
            exposed_headers: rate_limit_header_names(),
            allow_credentials: false,
            max_age: Some(max_age),
        }
    }

    /// Mutating actions: only the site's own origins, credentials allowed.
    pub fn strict(origins: Vec<String>, max_age: Duration) -> Self {
        Self {
            origins: AllowedOrigins::List(origins),
            methods: vec![Method::POST, Method::OPTIONS],
            allowed_headers: vec![header::CONTENT_TYPE],
            exposed_headers: rate_limit_header_names(),
            allow_credentials: true,
            max_age: Some(max_age),
        }
    }

    /// Build both presets from configuration.
    pub fn presets(config: &CorsConfig) -> (Self, Self) {
        let max_age = Duration::from_secs(config.max_age_secs);
        (
            Self::permissive(max_age),
            Self::strict(config.allowed_origins.clone(), max_age),
        )
    }

    /// Compute the CORS response headers for a request origin.
    pub fn headers_for(&self, request_origin: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        match &self.origins {
            AllowedOrigins::Any => {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
            }
            AllowedOrigins::List(allowed) => {
                headers.insert(header::VARY, HeaderValue::from_static("Origin"));
                let matched = request_origin
                    .filter(|origin| allowed.iter().any(|a| a == origin))
                    .and_then(|origin| HeaderValue::from_str(origin).ok());
                if let Some(origin) = matched {
                    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
                }
            }
        }

        if let Some(v) = join_header(self.methods.iter().map(Method::as_str)) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, v);
        }
        if let Some(v) = join_header(self.allowed_headers.iter().map(HeaderName::as_str)) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, v);
        }
        if let Some(v) = join_header(self.exposed_headers.iter().map(HeaderName::as_str)) {
            headers.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, v);
        }
        if let Some(max_age) = self.max_age {
            headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from(max_age.as_secs()));
        }
        // Browsers refuse credentials with a wildcard origin.
        if self.allow_credentials && self.origins != AllowedOrigins::Any {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }

        headers
    }
}

fn rate_limit_header_names() -> Vec<HeaderName> {
    vec![
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderName::from_static("x-ratelimit-reset"),
        header::RETRY_AFTER,
    ]
}

fn join_header<'a>(values: impl Iterator<Item = &'a str>) -> Option<HeaderValue> {
    let joined = values.collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        None
    } else {
        HeaderValue::from_str(&joined).ok()
    }
}
