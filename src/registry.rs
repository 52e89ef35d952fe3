//! The mount registry.
//!
//! Owns every live mount and the resources they share: one content cache,
//! one I/O pool, one processing pool and one decoder pool for the whole
//! process. Mount ids are assigned monotonically and never reused.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, error, info};

use crate::cache::{ContentCache, DEFAULT_WAIT_TIMEOUT};
use crate::container::DecoderFactory;
use crate::error::VfsError;
use crate::fuse::{ProjectionHost, ProjectionHostFactory};
use crate::options::RenderOptions;
use crate::pool::{DecoderPool, WorkerPool, DEFAULT_IO_THREADS};
use crate::vfs::{FileInfo, McrawFileSystem, MountConfig};

/// Process-unique identifier of a live mount.
pub type MountId = i32;

/// Default cache capacity shared by all mounts.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024 * 1024 * 1024;

const CONTAINER_EXTENSION: &str = "mcraw";

/// Registry-wide resource configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    cache_capacity: usize,
    io_threads: usize,
    wait_timeout: Duration,
    /// Project platform-shell sidecar entries into every mount.
    shell_entries: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            io_threads: DEFAULT_IO_THREADS,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            shell_entries: false,
        }
    }
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_capacity(mut self, bytes: usize) -> Self {
        self.cache_capacity = bytes;
        self
    }

    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads;
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn with_shell_entries(mut self, enabled: bool) -> Self {
        self.shell_entries = enabled;
        self
    }
}

struct ActiveMount {
    mount_path: PathBuf,
    core: Arc<McrawFileSystem>,
    // Hosts are Send but not Sync; the mutex lets the registry stay
    // shareable across threads.
    host: Mutex<Box<dyn ProjectionHost>>,
}

impl Drop for ActiveMount {
    fn drop(&mut self) {
        // Detach first so no new reads arrive, then stop the core's cache
        // writes; queued renders finish into discarded targets.
        if let Ok(host) = self.host.get_mut() {
            host.detach();
        }
        self.core.close();
    }
}

/// Owns active mounts and the process-wide pools and cache.
pub struct MountRegistry {
    next_mount_id: AtomicI32,
    mounts: DashMap<MountId, ActiveMount>,
    io_pool: Arc<WorkerPool>,
    processing_pool: Arc<WorkerPool>,
    cache: Arc<ContentCache>,
    decoders: Arc<DecoderPool>,
    host_factory: Box<dyn ProjectionHostFactory>,
    wait_timeout: Duration,
    shell_entries: bool,
}

impl MountRegistry {
    /// Initialize the shared pools and cache.
    pub fn new(
        decoder_factory: Arc<dyn DecoderFactory>,
        host_factory: Box<dyn ProjectionHostFactory>,
        config: RegistryConfig,
    ) -> Result<Self, VfsError> {
        Ok(Self {
            next_mount_id: AtomicI32::new(0),
            mounts: DashMap::new(),
            io_pool: Arc::new(WorkerPool::new("mcraw-io", config.io_threads)?),
            processing_pool: Arc::new(WorkerPool::with_default_size("mcraw-proc")?),
            cache: Arc::new(ContentCache::new(config.cache_capacity)),
            decoders: Arc::new(DecoderPool::new(decoder_factory)),
            host_factory,
            wait_timeout: config.wait_timeout,
            shell_entries: config.shell_entries,
        })
    }

    /// Project `src_path` at `mount_path`.
    ///
    /// Validates the container extension, creates the destination
    /// directory if missing, builds the core and attaches the host
    /// adapter.
    pub fn mount(
        &self,
        options: RenderOptions,
        draft_scale: u32,
        src_path: &Path,
        mount_path: &Path,
        custom_camera_model: Option<String>,
    ) -> Result<MountId, VfsError> {
        debug!(
            "mounting {} at {}",
            src_path.display(),
            mount_path.display()
        );

        let extension_ok = src_path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(CONTAINER_EXTENSION));
        if !extension_ok {
            return Err(VfsError::InvalidFormat(format!(
                "not a .{CONTAINER_EXTENSION} container: {}",
                src_path.display()
            )));
        }

        std::fs::create_dir_all(mount_path).map_err(|e| {
            error!("could not create {}: {e}", mount_path.display());
            VfsError::Io(format!("could not create {}: {e}", mount_path.display()))
        })?;

        let core = Arc::new(McrawFileSystem::new(
            src_path,
            Arc::clone(&self.io_pool),
            Arc::clone(&self.processing_pool),
            Arc::clone(&self.cache),
            Arc::clone(&self.decoders),
            MountConfig {
                options,
                draft_scale,
                custom_camera_model,
                shell_entries: self.shell_entries,
                wait_timeout: self.wait_timeout,
            },
        )?);

        let host = self.host_factory.attach(mount_path, Arc::clone(&core))?;

        let mount_id = self.next_mount_id.fetch_add(1, Ordering::SeqCst);
        self.mounts.insert(
            mount_id,
            ActiveMount {
                mount_path: mount_path.to_path_buf(),
                core,
                host: Mutex::new(host),
            },
        );

        info!(mount_id, "mounted {}", src_path.display());
        Ok(mount_id)
    }

    /// Drop a mount. Unknown ids are ignored.
    pub fn unmount(&self, mount_id: MountId) {
        if self.mounts.remove(&mount_id).is_some() {
            info!(mount_id, "unmounted");
        }
    }

    /// Apply new render options to a live mount and invalidate host-side
    /// metadata so sizes are re-queried.
    pub fn update_options(
        &self,
        mount_id: MountId,
        options: RenderOptions,
        draft_scale: u32,
        custom_camera_model: Option<String>,
    ) -> Result<(), VfsError> {
        let mount = self
            .mounts
            .get(&mount_id)
            .ok_or_else(|| VfsError::NotFound(format!("mount {mount_id}")))?;

        mount
            .core
            .update_options(options, draft_scale, custom_camera_model)?;
        mount.host.lock().unwrap().invalidate(&mount.mount_path);
        Ok(())
    }

    /// Recording summary of a live mount.
    pub fn file_info(&self, mount_id: MountId) -> Option<FileInfo> {
        self.mounts.get(&mount_id).map(|m| m.core.file_info())
    }

    /// Number of live mounts.
    pub fn mount_count(&self) -> usize {
        self.mounts.len()
    }

    /// The shared content cache.
    pub fn cache(&self) -> &Arc<ContentCache> {
        &self.cache
    }
}

impl Drop for MountRegistry {
    fn drop(&mut self) {
        // Drain mounts first; the pools join their workers when the last
        // Arc drops at the end of this scope.
        self.mounts.clear();
        info!("mount registry shut down");
    }
}
