//! Route handlers.
//!
//! Handlers run after admission, so they see only requests that passed the
//! rate limiter and carry a [`ClientId`](crate::http::admission::ClientId).
//! Failures are returned as [`ApiError`](crate::http::response::ApiError);
//! price and video listings degrade to a fallback payload instead.

pub mod bitcoin;
pub mod experiments;
pub mod social;
pub mod subscribe;
pub mod videos;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub use experiments::ExperimentRegistry;

#[derive(Serialize)]
struct Degraded<T: Serialize> {
    success: bool,
    error: &'static str,
    data: T,
}

/// 500 that still carries a usable `data` payload.
pub(crate) fn degraded<T: Serialize>(error: &'static str, data: T) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(Degraded {
            success: false,
            error,
            data,
        }),
    )
        .into_response()
}

#[derive(Serialize)]
struct Health {
    success: bool,
    status: &'static str,
    version: &'static str,
}

/// `GET /api/health`
pub async fn health() -> Response {
    Json(Health {
        success: true,
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
    .into_response()
}
