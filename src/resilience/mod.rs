//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a third-party API:
//!     → reqwest client deadline (connect + request timeout)
//!     → On failure: retries.rs (retryable? back off and try again)
//!     → Handler maps the final error to a fallback payload or 5xx
//! ```
//!
//! # Design Decisions
//! - Every outbound call has a deadline; timeouts are retryable, never fatal
//! - Retries only for idempotent reads
//! - The admission layer itself never retries

pub mod backoff;
pub mod retries;

pub use retries::RetryPolicy;
