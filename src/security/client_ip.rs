//! Client identifier resolution for rate limiting.
//!
//! The value is an opaque bucketing key, not a validated address. Without a
//! trusted reverse proxy in front of the gateway these headers are spoofable.

use axum::http::HeaderMap;

/// Identifier used when no proxy header carries a client address. Every such
/// request shares one bucket.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Headers consulted after `X-Forwarded-For`, in priority order.
const SINGLE_VALUE_HEADERS: [&str; 3] = ["x-real-ip", "cf-connecting-ip", "x-client-ip"];

/// Resolve the best-effort client identifier from request headers.
pub fn resolve(headers: &HeaderMap) -> String {
    let forwarded = header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    SINGLE_VALUE_HEADERS
        .iter()
        .filter_map(|name| header_str(headers, name))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, v.parse().unwrap());
        }
        map
    }

    #[test]
    fn test_forwarded_for_first_hop() {
        let h = headers(&[("x-forwarded-for", " 203.0.113.50 , 70.41.3.18")]);
        assert_eq!(resolve(&h), "203.0.113.50");
    }

    #[test]
    fn test_priority_order() {
        let h = headers(&[
            ("x-client-ip", "4.4.4.4"),
            ("cf-connecting-ip", "3.3.3.3"),
            ("x-real-ip", "2.2.2.2"),
        ]);
        assert_eq!(resolve(&h), "2.2.2.2");

        let h = headers(&[("x-client-ip", "4.4.4.4"), ("cf-connecting-ip", "3.3.3.3")]);
        assert_eq!(resolve(&h), "3.3.3.3");

        let h = headers(&[("x-client-ip", "4.4.4.4")]);
        assert_eq!(resolve(&h), "4.4.4.4");
    }

    #[test]
    fn test_empty_values_fall_through() {
        let h = headers(&[("x-forwarded-for", " , 1.1.1.1"), ("x-real-ip", "2.2.2.2")]);
        assert_eq!(resolve(&h), "2.2.2.2");
    }

    #[test]
    fn test_not_validated() {
        let h = headers(&[("x-real-ip", "not-an-ip")]);
        assert_eq!(resolve(&h), "not-an-ip");
    }

    #[test]
    fn test_fallback_is_shared_bucket() {
        assert_eq!(resolve(&HeaderMap::new()), UNKNOWN_CLIENT);
    }
}
