//! Filegate: the front door of a file-management service.
//!
//! Accepts HTTP and WebSocket traffic under an administrative path prefix,
//! forwards it to a single backend, asserts a trusted identity header for
//! successful logins, and can also relay raw TCP byte streams.

pub mod backend;
pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::schema::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use net::TcpGateway;
