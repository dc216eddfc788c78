//! relay-proxy — a single-upstream HTTP reverse proxy.
//!
//! Every inbound request is forwarded to one configured upstream, with the
//! outbound TCP connection optionally routed through a forward proxy
//! (HTTP/HTTPS CONNECT or SOCKS5).
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────┐
//!                 │                   RELAY PROXY                    │
//!   Client        │  ┌────────┐   ┌─────────┐   ┌────────────────┐  │
//!   ──────────────┼─▶│  http  │──▶│  relay  │──▶│   forwarding   │──┼──▶ Upstream
//!                 │  │ server │   │ handler │   │   transport    │  │
//!   ◀─────────────┼──│        │◀──│         │◀──│ (pooled client)│◀─┼───
//!                 │  └────────┘   └─────────┘   └───────┬────────┘  │
//!                 │                                     │           │
//!                 │                             ┌───────▼────────┐  │
//!                 │                             │    outbound    │  │
//!                 │                             │ direct / http  │──┼──▶ Forward
//!                 │                             │ proxy / socks5 │  │    proxy
//!                 │                             └────────────────┘  │
//!                 │                                                 │
//!                 │  config · lifecycle · net · observability       │
//!                 └──────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod outbound;
pub mod relay;

pub use config::RelayConfig;
pub use http::{RelayServer, ServerError};
pub use lifecycle::Shutdown;
