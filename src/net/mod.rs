//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection (raw mode)
//!     → listener.rs (accept loop, connection limits)
//!     → tcp.rs (dial backend with deadline)
//!     → connection.rs (pair tracking)
//!     → relay.rs (bidirectional copy, close both)
//!
//! Pair States:
//!     Dialing → Relaying → Closed
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - A failed dial closes only that caller
//! - The relay is generic over the transport so it runs on in-memory pipes too

pub mod connection;
pub mod listener;
pub mod relay;
pub mod tcp;

pub use listener::{bind, Listener};
pub use relay::{forward, Direction, RelayOutcome};
pub use tcp::TcpGateway;
