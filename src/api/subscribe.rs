//! Newsletter signup.
//!
//! ```text
//! (admission already ran: 429 stops here)
//!     → Content-Length over the limit?   413
//!     → body is a JSON object?           400
//!     → honeypot field filled?           200, ESP never called
//!     → email present and well formed?   400
//!     → injection detectors              400
//!     → sanitize, call ESP               200 / 409 / 500
//! ```

use axum::{
    body::to_bytes,
    extract::{Request, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::admission::ClientId;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::limits::check_content_length;
use crate::security::sanitize::{
    is_valid_email, looks_like_injection, sanitize_email, sanitize_name, sanitize_tag,
    sanitize_text,
};
use crate::upstream::{Signup, SignupOutcome, UpstreamError};

const MAX_TAGS: usize = 10;
const MAX_SOURCE_LEN: usize = 100;
const SUBSCRIBED: &str = "Successfully subscribed! Check your inbox to confirm.";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscribeBody {
    email: Option<String>,
    first_name: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    source: Option<String>,
}

#[derive(Serialize)]
struct Subscribed {
    success: bool,
    message: &'static str,
}

fn subscribed() -> Response {
    Json(Subscribed {
        success: true,
        message: SUBSCRIBED,
    })
    .into_response()
}

/// A honeypot is tripped by any non-blank value in one of the hidden fields.
fn honeypot_tripped(body: &Map<String, Value>, fields: &[String]) -> bool {
    fields.iter().any(|field| match body.get(field) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Bool(b)) => *b,
        Some(_) => true,
    })
}

/// Validate the raw fields and produce a sanitized signup.
fn prepare_signup(body: SubscribeBody) -> Result<Signup, ApiError> {
    let raw_email = body.email.as_deref().map(str::trim).unwrap_or_default();
    if raw_email.is_empty() {
        return Err(ApiError::BadRequest("Email is required".into()));
    }

    let email = sanitize_email(raw_email);
    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest("Invalid email address".into()));
    }

    let raw_fields = std::iter::once(raw_email)
        .chain(body.first_name.as_deref())
        .chain(body.source.as_deref())
        .chain(body.tags.iter().map(String::as_str));
    for field in raw_fields {
        if looks_like_injection(field) {
            return Err(ApiError::BadRequest("Invalid characters in request".into()));
        }
    }

    let mut tags: Vec<String> = Vec::new();
    for tag in body.tags.iter().map(|t| sanitize_tag(t)) {
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
        if tags.len() == MAX_TAGS {
            break;
        }
    }

    Ok(Signup {
        email,
        first_name: body
            .first_name
            .as_deref()
            .map(sanitize_name)
            .filter(|n| !n.is_empty()),
        tags,
        source: body
            .source
            .as_deref()
            .map(|s| sanitize_text(s, MAX_SOURCE_LEN))
            .filter(|s| !s.is_empty()),
    })
}

/// `POST /api/subscribe`
pub async fn subscribe(State(state): State<AppState>, request: Request) -> Result<Response, ApiError> {
    let max_body = state.config.security.max_body_size;
    check_content_length(request.headers(), max_body)?;

    let (parts, body) = request.into_parts();
    let client = parts
        .extensions
        .get::<ClientId>()
        .map(|c| c.0.clone())
        .unwrap_or_default();

    // Chunked bodies carry no Content-Length; cap the read as well.
    let bytes = to_bytes(body, max_body)
        .await
        .map_err(|_| ApiError::PayloadTooLarge)?;

    let object = match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(object)) => object,
        _ => return Err(ApiError::BadRequest("Invalid request body".into())),
    };

    if honeypot_tripped(&object, &state.config.security.honeypot_fields) {
        tracing::warn!(client = %client, "Honeypot field filled, dropping signup");
        metrics::record_honeypot();
        return Ok(subscribed());
    }

    let body: SubscribeBody = serde_json::from_value(Value::Object(object))
        .map_err(|_| ApiError::BadRequest("Invalid request body".into()))?;
    let signup = prepare_signup(body)?;

    match state.newsletter.subscribe(&signup).await {
        Ok(SignupOutcome::Subscribed) => {
            tracing::info!(client = %client, tags = signup.tags.len(), "Newsletter signup");
            Ok(subscribed())
        }
        Ok(SignupOutcome::AlreadySubscribed) => {
            Err(ApiError::Conflict("This email is already subscribed".into()))
        }
        Err(UpstreamError::NotConfigured(provider)) => {
            tracing::error!(provider, "Newsletter signup attempted without ESP credentials");
            Err(ApiError::Internal("Failed to subscribe. Please try again later.".into()))
        }
        Err(e) => {
            tracing::error!(client = %client, error = %e, "Newsletter signup failed");
            Err(ApiError::Internal("Failed to subscribe. Please try again later.".into()))
        }
    }
}
