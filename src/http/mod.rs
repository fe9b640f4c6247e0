//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, shared layers)
//!     → request.rs (assign or propagate x-request-id)
//!     → admission.rs (preflight, client id, rate limit, CORS)
//!     → api handlers
//!     → response.rs (envelope, ApiError mapping, rate-limit headers)
//! ```

pub mod admission;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{AppState, HttpServer};
