/// Convenience result type used across the crate.
pub type RemixResult<T> = Result<T, RemixError>;

/// Top-level error taxonomy used by the public APIs.
///
/// Configuration and catalog errors are produced eagerly, before any backend
/// work begins. Per-overlay failures never appear here: they are recovered
/// locally in the compositor (the overlay is dropped). Cleanup failures are
/// reported through logging and never override a primary result.
#[derive(thiserror::Error, Debug)]
pub enum RemixError {
    /// Invalid user-provided request data (segment length, weights, fps, ...).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The segment catalog handed to the scheduler was empty.
    #[error("empty catalog: no segments to schedule")]
    EmptyCatalog,

    /// The schedule handed to the compositor was empty.
    #[error("empty schedule: no entries to compose")]
    EmptySchedule,

    /// A referenced source could not be opened or probed by the backend.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// Canvas dimensions could not be established (no sources loaded).
    #[error("no canvas reference: cannot determine output dimensions")]
    NoCanvasReference,

    /// Composition produced zero placements.
    #[error("empty timeline: composition produced no placements")]
    EmptyTimeline,

    /// The external render backend failed.
    #[error("backend failure: {0}")]
    Backend(String),

    /// Closing a source handle failed. Logged by the session, never fatal.
    #[error("resource cleanup failure: {0}")]
    ResourceCleanup(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RemixError {
    /// Build a [`RemixError::InvalidConfiguration`] value.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Build a [`RemixError::SourceUnavailable`] value.
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    /// Build a [`RemixError::Backend`] value.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Build a [`RemixError::ResourceCleanup`] value.
    pub fn cleanup(msg: impl Into<String>) -> Self {
        Self::ResourceCleanup(msg.into())
    }
}
