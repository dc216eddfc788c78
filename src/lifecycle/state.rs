//! Server lifecycle states.

/// How the server came to rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopKind {
    /// All in-flight work finished within the grace period.
    Clean,
    /// The serve loop failed, or the grace period elapsed with work
    /// outstanding.
    Errored,
}

/// The one-directional lifecycle of the server.
///
/// `Starting → Serving → Draining → Stopped`; a serve failure skips straight
/// from `Serving` to `Stopped(Errored)`. No state is ever revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Serving,
    Draining,
    Stopped(StopKind),
}
