//! Error types shared across the crate.
//!
//! Per-read failures are delivered through the read completion and never
//! tear down a mount; mount-time failures abort the mount. The pools catch
//! task failures, log them and report them through the same type.

use thiserror::Error;

/// Errors produced by the virtual filesystem core and its collaborators.
#[derive(Debug, Error)]
pub enum VfsError {
    /// Unsupported sensor arrangement, unreadable container, or wrong extension.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// A path or entry that does not resolve within the mount.
    #[error("not found: {0}")]
    NotFound(String),

    /// Non-read access to the projection.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Container decode or adapter read failure; per-request, not fatal.
    #[error("I/O failure: {0}")]
    Io(String),

    /// A single item was too large for the cache. Not reported to readers;
    /// the item simply is not retained.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Single-flight wait on a peer exceeded the configured timeout.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Violated invariant; logged and surfaced to readers as an I/O failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for VfsError {
    fn from(err: std::io::Error) -> Self {
        VfsError::Io(err.to_string())
    }
}

impl VfsError {
    /// Collapse the taxonomy to what a reader is allowed to observe.
    ///
    /// Internal faults are reported as I/O failures; everything else passes
    /// through unchanged.
    pub fn surface(self) -> VfsError {
        match self {
            VfsError::Internal(msg) => VfsError::Io(msg),
            other => other,
        }
    }
}
