//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; rate-limit and CORS presets never change at runtime
//! - All fields have defaults to allow minimal configs
//! - Secrets come from the environment, not the file

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::GatewayConfig;
pub use schema::{
    CorsConfig, ListenerConfig, NewsletterConfig, ObservabilityConfig, PriceFeedConfig,
    RateLimitConfig, RetryConfig, SecurityConfig, YoutubeConfig,
};
