//! Request size limits.
//!
//! The declared `Content-Length` is checked before the body is read so an
//! oversized submission is refused with 413 without buffering it. The
//! `RequestBodyLimitLayer` under each route's admission gate caps bodies
//! that lie about their size.

use axum::http::{header, HeaderMap};

use crate::http::response::ApiError;

/// Reject when the declared body size exceeds `max_bytes`.
///
/// A missing or unparsable header passes; the body limit layer still applies.
pub fn check_content_length(headers: &HeaderMap, max_bytes: usize) -> Result<(), ApiError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    match declared {
        Some(len) if len > max_bytes as u64 => Err(ApiError::PayloadTooLarge),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_length(len: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, len.parse().unwrap());
        headers
    }

    #[test]
    fn test_content_length_boundary() {
        assert!(check_content_length(&with_length("10000"), 10_000).is_ok());
        assert!(matches!(
            check_content_length(&with_length("10001"), 10_000),
            Err(ApiError::PayloadTooLarge)
        ));
    }

    #[test]
    fn test_missing_or_garbage_passes() {
        assert!(check_content_length(&HeaderMap::new(), 10).is_ok());
        assert!(check_content_length(&with_length("lots"), 10).is_ok());
    }
}
