//! HTTP serving subsystem.

pub mod server;

pub use server::{bind, RelayServer, ServerError};
