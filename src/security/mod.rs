//! Security subsystem: the request admission pipeline.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client_ip.rs (resolve bucketing identifier from proxy headers)
//!     → rate_limit.rs (fixed-window check, 429 when exhausted)
//!     → cors.rs (compute allow-origin / methods / exposed headers)
//!     → limits.rs (declared body size, 413)
//!     → sanitize.rs (per-field cleanup, injection heuristics → 400)
//!     → Pass to handler
//! ```
//!
//! # Design Decisions
//! - Admission failures short-circuit before any handler validation
//! - CORS withholds permission rather than rejecting
//! - Injection detection is a heuristic pre-filter, never the only defense

pub mod client_ip;
pub mod cors;
pub mod limits;
pub mod rate_limit;
pub mod sanitize;

pub use cors::{AllowedOrigins, CorsPolicy};
pub use rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimiter};
