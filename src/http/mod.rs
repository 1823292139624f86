//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, route dispatch)
//!     → request.rs (request ID, header rewrite)
//!     → login.rs (credential decode, identity header) [login POST only]
//!     → backend via hyper-util client
//!     → response.rs (header merge, stylesheet override)
//!     → Send to client
//!
//! Command paths instead:
//!     → websocket.rs (upgrade caller, dial backend, bridge messages)
//! ```

pub mod login;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use login::LoginInterceptor;
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
pub use websocket::{Bridge, BridgeState};
