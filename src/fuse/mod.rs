//! Projection host contract and adapters.
//!
//! The core never talks to a platform mount API directly; the registry
//! attaches a [`ProjectionHost`] built by a [`ProjectionHostFactory`].
//! The in-tree adapter projects through FUSE; tests attach the null host.

mod adapter;

pub use adapter::FuseHostFactory;

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::VfsError;
use crate::vfs::McrawFileSystem;

/// A live attachment of one mount to the platform's projection surface.
pub trait ProjectionHost: Send {
    /// Drop host-side cached metadata (sizes, attributes) so the platform
    /// re-queries the core. Called after an options update.
    fn invalidate(&self, path: &Path);

    /// Stop serving and detach from the mount point. Must have returned
    /// before the core it serves is dropped.
    fn detach(&mut self);
}

/// Builds a [`ProjectionHost`] for a mount.
pub trait ProjectionHostFactory: Send + Sync {
    fn attach(
        &self,
        mount_path: &Path,
        core: Arc<McrawFileSystem>,
    ) -> Result<Box<dyn ProjectionHost>, VfsError>;
}

/// Host that projects nothing; used headless and in tests.
#[derive(Default)]
pub struct NullHostFactory {
    invalidations: Arc<AtomicUsize>,
}

impl NullHostFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of invalidations requested across all attached hosts.
    pub fn invalidation_count(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

impl ProjectionHostFactory for NullHostFactory {
    fn attach(
        &self,
        _mount_path: &Path,
        _core: Arc<McrawFileSystem>,
    ) -> Result<Box<dyn ProjectionHost>, VfsError> {
        Ok(Box::new(NullHost {
            invalidations: Arc::clone(&self.invalidations),
        }))
    }
}

struct NullHost {
    invalidations: Arc<AtomicUsize>,
}

impl ProjectionHost for NullHost {
    fn invalidate(&self, _path: &Path) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }

    fn detach(&mut self) {}
}
