//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::security::rate_limit::RateLimitPolicy;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting presets and sweep settings.
    pub rate_limit: RateLimitConfig,

    /// Cross-origin policy settings.
    pub cors: CorsConfig,

    /// Retry configuration for outbound calls.
    pub retries: RetryConfig,

    /// Request size limits and bot traps.
    pub security: SecurityConfig,

    /// Video catalog provider.
    pub youtube: YoutubeConfig,

    /// Bitcoin price feed.
    pub bitcoin: PriceFeedConfig,

    /// Email service provider for newsletter signups.
    pub newsletter: NewsletterConfig,

    /// Public social profiles served by the placeholder endpoints.
    pub social: SocialConfig,

    /// A/B experiments offered to the site.
    pub experiments: Vec<ExperimentConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for an inbound request, in seconds.
    pub request_secs: u64,

    /// Connection establishment timeout for upstream calls, in seconds.
    pub upstream_connect_secs: u64,

    /// Deadline for a single upstream call, in seconds.
    pub upstream_request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_connect_secs: 3,
            upstream_request_secs: 8,
        }
    }
}

/// A single `(max_requests, window)` pair.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct PolicyConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl PolicyConfig {
    pub fn to_policy(self) -> RateLimitPolicy {
        RateLimitPolicy::new(self.max_requests, Duration::from_secs(self.window_secs))
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// How often expired entries are swept from memory.
    pub sweep_interval_secs: u64,

    /// Social placeholders and other abuse-prone endpoints.
    pub strict: PolicyConfig,

    /// Newsletter signups.
    pub standard: PolicyConfig,

    /// Video catalog lookups.
    pub relaxed: PolicyConfig,

    /// Cheap public reads (price feed, experiments).
    pub public: PolicyConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_secs: 60,
            strict: PolicyConfig { max_requests: 5, window_secs: 15 * 60 },
            standard: PolicyConfig { max_requests: 10, window_secs: 10 * 60 },
            relaxed: PolicyConfig { max_requests: 30, window_secs: 60 },
            public: PolicyConfig { max_requests: 100, window_secs: 60 },
        }
    }
}

/// Cross-origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to call mutating endpoints.
    pub allowed_origins: Vec<String>,

    /// Preflight cache duration in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "https://betirement.com".to_string(),
                "https://www.betirement.com".to_string(),
            ],
            max_age_secs: 86_400,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries for idempotent upstream calls.
    pub enabled: bool,

    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 2,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum accepted `Content-Length` for JSON bodies, in bytes.
    pub max_body_size: usize,

    /// Hidden form fields that only bots fill in.
    pub honeypot_fields: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 10_000,
            honeypot_fields: vec![
                "website".to_string(),
                "phone_number".to_string(),
                "company".to_string(),
            ],
        }
    }
}

/// YouTube Data API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct YoutubeConfig {
    /// API root, overridable for tests.
    pub base_url: String,

    /// Data API key. Usually supplied through `YOUTUBE_API_KEY`.
    pub api_key: String,

    /// Channel whose uploads are listed.
    pub channel_id: String,

    /// Page size when the caller does not ask for one.
    pub default_max_results: u32,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            api_key: String::new(),
            channel_id: String::new(),
            default_max_results: 12,
        }
    }
}

/// CoinGecko price feed settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PriceFeedConfig {
    pub base_url: String,

    /// Fiat currency the quote is expressed in.
    pub vs_currency: String,

    /// How long a successful quote is served from memory.
    pub cache_ttl_secs: u64,
}

impl Default for PriceFeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            vs_currency: "usd".to_string(),
            cache_ttl_secs: 60,
        }
    }
}

/// ConvertKit-compatible ESP settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NewsletterConfig {
    pub base_url: String,

    /// Usually supplied through `CONVERTKIT_API_KEY`.
    pub api_key: String,

    /// Usually supplied through `CONVERTKIT_FORM_ID`.
    pub form_id: String,
}

impl Default for NewsletterConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.convertkit.com/v3".to_string(),
            api_key: String::new(),
            form_id: String::new(),
        }
    }
}

impl NewsletterConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.form_id.is_empty()
    }
}

/// Social profile links.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SocialConfig {
    pub twitter: String,
    pub youtube: String,
    pub instagram: String,
    pub linkedin: String,
    pub nostr: String,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            twitter: "https://x.com/betirement".to_string(),
            youtube: "https://www.youtube.com/@betirement".to_string(),
            instagram: "https://www.instagram.com/betirement".to_string(),
            linkedin: "https://www.linkedin.com/company/betirement".to_string(),
            nostr: String::new(),
        }
    }
}

/// One A/B experiment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExperimentConfig {
    /// Experiment identifier used in the URL.
    pub id: String,

    /// Variants and their relative weights.
    pub variants: Vec<VariantConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VariantConfig {
    pub name: String,

    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
