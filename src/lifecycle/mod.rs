//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast to the serve loop → stop accepting → drain → stop
//!
//! States (state.rs):
//!     Starting → Serving → Draining → Stopped(Clean | Errored)
//! ```

pub mod shutdown;
pub mod signals;
pub mod state;

pub use shutdown::Shutdown;
pub use state::{LifecycleState, StopKind};
