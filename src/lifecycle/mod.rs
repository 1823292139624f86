//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → HTTP gateway stops accepting, drains
//!             → TCP gateway stops accepting, live pairs finish
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans the signal out to every gateway
//! - In-flight work is never cut mid-stream by the signal itself

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
