use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::degraded;
use crate::http::response::{ApiError, Envelope};
use crate::http::server::AppState;
use crate::security::sanitize::{looks_like_injection, never_matches, sanitize_text};
use crate::upstream::youtube::MAX_PAGE_SIZE;
use crate::upstream::VideoPage;

const MAX_PAGE_TOKEN_LEN: usize = 100;

static VIDEO_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap_or_else(|e| {
        tracing::error!("Failed to compile video id regex: {}", e);
        never_matches()
    })
});

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    max_results: Option<String>,
    page_token: Option<String>,
}

/// Parse `maxResults`, clamped to the provider's page size.
fn page_size(raw: Option<&str>, default: u32) -> Result<u32, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(default.clamp(1, MAX_PAGE_SIZE)),
        Some(value) => value
            .parse::<i64>()
            .map(|n| n.clamp(1, i64::from(MAX_PAGE_SIZE)) as u32)
            .map_err(|_| ApiError::BadRequest("maxResults must be a number".into())),
    }
}

/// Page tokens are opaque provider strings; anything that changes under
/// sanitization or trips a detector is refused rather than forwarded.
fn page_token(raw: Option<&str>) -> Result<Option<String>, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let clean = sanitize_text(raw, MAX_PAGE_TOKEN_LEN);
    if clean != raw || looks_like_injection(raw) {
        return Err(ApiError::BadRequest("Invalid page token".into()));
    }
    Ok(Some(clean))
}

/// `GET /api/videos`
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let max_results = page_size(
        query.max_results.as_deref(),
        state.config.youtube.default_max_results,
    )?;
    let token = page_token(query.page_token.as_deref())?;

    match state.videos.latest(max_results, token.as_deref()).await {
        Ok(page) => Ok(Envelope::ok(page).into_response()),
        Err(e) => {
            tracing::error!(error = %e, max_results, "Video listing failed");
            Ok(degraded("Failed to fetch videos", VideoPage::empty()))
        }
    }
}

/// `GET /api/videos/{id}`
pub async fn by_id(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id?;
    if !VIDEO_ID.is_match(&id) {
        return Err(ApiError::BadRequest("Invalid video id".into()));
    }

    match state.videos.video(&id).await {
        Ok(Some(video)) => Ok(Envelope::ok(video).into_response()),
        Ok(None) => Err(ApiError::NotFound("Video not found".into())),
        Err(e) => {
            tracing::error!(error = %e, video_id = %id, "Video lookup failed");
            Err(ApiError::Internal("Failed to fetch video".into()))
        }
    }
}
