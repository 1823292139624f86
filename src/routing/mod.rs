//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (ordered route lookup)
//!     → matcher.rs (exact, prefix-wildcard or segment pattern)
//!     → Return: RouteTarget or NoMatch (404)
//!
//! Route Compilation (at startup):
//!     RoutesConfig
//!     → command, login, base routes in that order
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod matcher;
pub mod router;

pub use matcher::RoutePattern;
pub use router::{RouteTarget, Router};

use thiserror::Error;

/// Route table construction errors. Always fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("invalid route pattern '{0}': must start with '/' and may only end with '*'")]
    InvalidPattern(String),
    #[error("route pattern '{0}' registered twice")]
    Duplicate(String),
}
