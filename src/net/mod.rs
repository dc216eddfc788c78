//! Network layer subsystem.
//!
//! Connection-level bookkeeping shared by the server lifecycle. Accepting
//! and serving live in `http::server`; this module only tracks what is
//! in flight so draining knows when it is done.

pub mod connection;

pub use connection::{ConnectionGuard, ConnectionTracker};
