//! Response shapes and error mapping.
//!
//! Every JSON body carries a `success` discriminator. Errors share the shape
//! `{"error": "...", "success": false}`.

use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::security::RateLimitDecision;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Errors surfaced to API callers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Request timed out")]
    RequestTimeout,

    #[error("Too many requests. Please try again later.")]
    TooManyRequests(RateLimitDecision),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!(reason = %rejection.body_text(), "Query string rejected");
        Self::BadRequest("Invalid query parameters".into())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(reason = %rejection.body_text(), "Path parameter rejected");
        Self::BadRequest("Invalid path parameter".into())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = match &self {
            Self::TooManyRequests(decision) => Some(decision.reset_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
            _ => None,
        };
        let body = ErrorBody {
            error: self.to_string(),
            success: false,
            retry_after,
        };

        let mut response = (status, Json(body)).into_response();
        if let Self::TooManyRequests(decision) = &self {
            let headers = response.headers_mut();
            apply_rate_limit_headers(headers, decision);
            headers.insert(
                header::RETRY_AFTER,
                HeaderValue::from(decision.retry_after_secs(Utc::now())),
            );
        }
        response
    }
}

/// Successful payload wrapper: `{"success": true, "data": ...}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self { success: true, data })
    }
}

/// Write `X-RateLimit-*` headers for a decision.
pub fn apply_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    if let Ok(reset) =
        HeaderValue::from_str(&decision.reset_at.to_rfc3339_opts(SecondsFormat::Secs, true))
    {
        headers.insert(X_RATELIMIT_RESET, reset);
    }
}

/// Copy every header from `extra` onto `target`, replacing existing values.
pub fn merge_headers(target: &mut HeaderMap, extra: HeaderMap) {
    let mut last_name = None;
    for (name, value) in extra {
        match name {
            Some(name) => {
                target.insert(name.clone(), value);
                last_name = Some(name);
            }
            None => {
                if let Some(name) = &last_name {
                    target.append(name.clone(), value);
                }
            }
        }
    }
}
