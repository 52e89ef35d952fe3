//! mcrawfs - projects MotionCam RAW containers as virtual DNG sequences.
//!
//! Mounting a `.mcraw` container exposes a read-only directory of
//! standard still-image files (one DNG per recorded frame, with dropped
//! frames compensated by duplication) plus a synthesized `audio.wav`.
//! Frames are decoded, processed and encoded on first read, cached in a
//! process-wide byte-bounded LRU, and never written to disk.
//!
//! # High-level API
//!
//! ```ignore
//! use mcrawfs::fuse::FuseHostFactory;
//! use mcrawfs::registry::{MountRegistry, RegistryConfig};
//! use mcrawfs::RenderOptions;
//! use std::sync::Arc;
//!
//! let registry = MountRegistry::new(
//!     Arc::new(decoder_factory),           // your container decoder
//!     Box::new(FuseHostFactory::new()),
//!     RegistryConfig::default(),
//! )?;
//!
//! let id = registry.mount(
//!     RenderOptions::NONE,
//!     1,
//!     "/clips/take1.mcraw".as_ref(),
//!     "/mnt/take1".as_ref(),
//!     None,
//! )?;
//!
//! // ... reads are served on demand ...
//! registry.unmount(id);
//! ```

pub mod audio;
pub mod cache;
pub mod container;
pub mod dng;
pub mod entry;
pub mod error;
pub mod fuse;
pub mod logging;
pub mod options;
pub mod pool;
pub mod registry;
pub mod timing;
pub mod vfs;

pub use entry::{Entry, EntryKind, Timestamp};
pub use error::VfsError;
pub use options::RenderOptions;
pub use registry::{MountId, MountRegistry, RegistryConfig};
pub use vfs::{FileInfo, McrawFileSystem, MountConfig};

/// Library version, synchronized with the crate manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
