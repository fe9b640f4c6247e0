use axum::{
    extract::{rejection::PathRejection, Path, State},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::config::schema::SocialConfig;
use crate::http::response::{ApiError, Envelope};
use crate::http::server::AppState;

/// Platforms the site links to.
pub const PLATFORMS: [&str; 5] = ["twitter", "youtube", "instagram", "linkedin", "nostr"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialFeed {
    platform: &'static str,
    profile_url: String,
    posts: Vec<serde_json::Value>,
    available: bool,
}

fn profile_url<'a>(config: &'a SocialConfig, platform: &str) -> Option<(&'static str, &'a str)> {
    let url = match platform {
        "twitter" => &config.twitter,
        "youtube" => &config.youtube,
        "instagram" => &config.instagram,
        "linkedin" => &config.linkedin,
        "nostr" => &config.nostr,
        _ => return None,
    };
    let name = PLATFORMS.into_iter().find(|p| *p == platform)?;
    Some((name, url.as_str()))
}

/// `GET /api/social/{platform}`
///
/// Feeds are not wired up yet; the response only carries the profile link.
pub async fn feed(
    State(state): State<AppState>,
    platform: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(platform) = platform?;
    let platform = platform.to_ascii_lowercase();
    let (platform, url) = profile_url(&state.config.social, &platform)
        .ok_or_else(|| ApiError::NotFound("Unknown platform".into()))?;

    Ok(Envelope::ok(SocialFeed {
        platform,
        profile_url: url.to_string(),
        posts: Vec::new(),
        available: false,
    })
    .into_response())
}
