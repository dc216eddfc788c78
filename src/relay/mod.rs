//! Request-forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → handler.rs (rewrite target + Host, strip hop-by-hop headers)
//!     → transport.rs (shared pooled client, dials via outbound::connector)
//!     → upstream response streamed back, or one generic 502 on failure
//! ```

pub mod handler;
pub mod transport;
pub mod upstream;

pub use handler::{relay, RelayState};
pub use transport::{assemble, ForwardingClient, RelayTimeouts};
pub use upstream::UpstreamTarget;
