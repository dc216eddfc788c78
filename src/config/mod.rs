//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! TOML file
//!     → loader.rs (read, parse)
//!     → validation.rs (required fields, timeout defaults)
//!     → schema.rs types consumed by the rest of the relay
//! ```
//!
//! Duration fields use the string grammar in `duration.rs` (`"5s"`,
//! `"1m30s"`). Validation runs exactly once; everything downstream receives
//! a fully-validated config.

pub mod duration;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{ObservabilityConfig, OutboundConfig, RelayConfig, ServerConfig, UpstreamConfig};
