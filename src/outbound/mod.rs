//! Outbound dialing subsystem.
//!
//! # Data Flow
//! ```text
//! Validated config
//!     → strategy.rs (Direct | HttpProxy | Socks5, resolved once at startup)
//!     → connector.rs (the dial function handed to the HTTP client)
//!     → one TCP/TLS/SOCKS stream per pooled upstream connection
//! ```
//!
//! # Design Decisions
//! - The strategy is a closed variant resolved at construction; there is no
//!   per-request dispatch on configuration strings
//! - Dial failures surface as per-request errors, never process failures

pub mod connector;
pub mod strategy;

pub use connector::{DialError, RelayConnector, RelayStream};
pub use strategy::{OutboundStrategy, ProxyScheme};
