//! API gateway for betirement.com.
//!
//! # Architecture Overview
//!
//! ```text
//!     Browser / client
//!           │
//!           ▼
//!   ┌──────────────────────────────────────────────┐
//!   │ http: request id → trace → timeout → limit   │
//!   │   admission: preflight → client id →         │
//!   │              rate limit → CORS headers       │
//!   │   api: price · videos · subscribe · social   │
//!   │        experiments · health                  │
//!   └───────────────┬──────────────────────────────┘
//!                   │ security::sanitize on inputs
//!                   ▼
//!   ┌──────────────────────────────────────────────┐
//!   │ upstream: CoinGecko · YouTube · ESP          │
//!   │   (resilience: deadlines, retries on GET)    │
//!   └──────────────────────────────────────────────┘
//!
//!   cross-cutting: config · observability · lifecycle
//! ```

// Request path
pub mod api;
pub mod http;
pub mod security;
pub mod upstream;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
