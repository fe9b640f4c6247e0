//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM / Ctrl-C → wait_for_signal() returns
//!
//! Shutdown (shutdown.rs):
//!     trigger() → server stops accepting, drains in-flight requests
//!               → rate-limit sweeper exits
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
