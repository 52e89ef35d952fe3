//! FUSE adapter over the virtual filesystem core.
//!
//! Translates kernel callbacks (lookup, getattr, readdir, open, read)
//! into core calls. The projection is a single flat read-only directory;
//! every entry gets a stable inode derived from its position in the entry
//! list, which survives option updates because entry identity does.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyData, ReplyDirectory, ReplyEntry,
    ReplyOpen, Request,
};
use libc::{EACCES, EIO, ENOENT, O_ACCMODE, O_RDONLY};
use tracing::{debug, error, info};

use crate::entry::{Entry, EntryKind};
use crate::error::VfsError;
use crate::fuse::{ProjectionHost, ProjectionHostFactory};
use crate::vfs::McrawFileSystem;

const ROOT_INODE: u64 = 1;
const ENTRY_INODE_BASE: u64 = 2;

/// Attribute time-to-live; short so invalidated sizes are re-queried.
const TTL: Duration = Duration::from_secs(1);

/// Inode assignments for the current entry list.
struct EntryTable {
    by_inode: HashMap<u64, Entry>,
    by_name: HashMap<String, u64>,
}

impl EntryTable {
    fn from_entries(entries: Vec<Entry>) -> Self {
        let mut by_inode = HashMap::with_capacity(entries.len());
        let mut by_name = HashMap::with_capacity(entries.len());

        for (index, entry) in entries.into_iter().enumerate() {
            let inode = ENTRY_INODE_BASE + index as u64;
            by_name.insert(entry.full_path().to_string_lossy().into_owned(), inode);
            by_inode.insert(inode, entry);
        }

        Self { by_inode, by_name }
    }

    fn lookup_name(&self, name: &str) -> Option<(u64, &Entry)> {
        let inode = *self.by_name.get(name)?;
        Some((inode, self.by_inode.get(&inode)?))
    }
}

fn dir_attr(ino: u64, uid: u32, gid: u32) -> FileAttr {
    let now = SystemTime::now();
    FileAttr {
        ino,
        size: 0,
        blocks: 0,
        atime: now,
        mtime: now,
        ctime: now,
        crtime: now,
        kind: FileType::Directory,
        perm: 0o755,
        nlink: 2,
        uid,
        gid,
        rdev: 0,
        blksize: 512,
        flags: 0,
    }
}

fn file_attr(ino: u64, size: u64, uid: u32, gid: u32) -> FileAttr {
    let now = SystemTime::now();
    FileAttr {
        ino,
        size,
        blocks: size.div_ceil(512),
        atime: now,
        mtime: now,
        ctime: now,
        crtime: now,
        kind: FileType::RegularFile,
        perm: 0o644,
        nlink: 1,
        uid,
        gid,
        rdev: 0,
        blksize: 512,
        flags: 0,
    }
}

fn errno_for(err: &VfsError) -> i32 {
    match err {
        VfsError::NotFound(_) => ENOENT,
        VfsError::AccessDenied(_) => EACCES,
        _ => EIO,
    }
}

/// The `fuser::Filesystem` implementation backing one mount.
struct McrawFuseFs {
    core: Arc<McrawFileSystem>,
    table: Arc<Mutex<EntryTable>>,
    uid: u32,
    gid: u32,
}

impl McrawFuseFs {
    fn attr_for_inode(&self, ino: u64) -> Option<FileAttr> {
        if ino == ROOT_INODE {
            return Some(dir_attr(ROOT_INODE, self.uid, self.gid));
        }

        let table = self.table.lock().unwrap();
        table.by_inode.get(&ino).map(|entry| match entry.kind {
            EntryKind::Directory => dir_attr(ino, self.uid, self.gid),
            _ => file_attr(ino, entry.size, self.uid, self.gid),
        })
    }
}

impl Filesystem for McrawFuseFs {
    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        debug!("lookup: parent={}, name={:?}", parent, name);

        if parent != ROOT_INODE {
            reply.error(ENOENT);
            return;
        }

        let Some(name) = name.to_str() else {
            reply.error(ENOENT);
            return;
        };

        let attr = {
            let table = self.table.lock().unwrap();
            table
                .lookup_name(name)
                .map(|(ino, entry)| file_attr(ino, entry.size, self.uid, self.gid))
        };

        match attr {
            Some(attr) => reply.entry(&TTL, &attr, 0),
            None => reply.error(ENOENT),
        }
    }

    fn getattr(&mut self, _req: &Request, ino: u64, reply: ReplyAttr) {
        debug!("getattr: ino={}", ino);

        match self.attr_for_inode(ino) {
            Some(attr) => reply.attr(&TTL, &attr),
            None => reply.error(ENOENT),
        }
    }

    fn open(&mut self, _req: &Request, ino: u64, flags: i32, reply: ReplyOpen) {
        debug!("open: ino={}, flags={:#x}", ino, flags);

        if ino != ROOT_INODE && !self.table.lock().unwrap().by_inode.contains_key(&ino) {
            reply.error(ENOENT);
            return;
        }

        // The projection is read-only.
        if flags & O_ACCMODE != O_RDONLY {
            reply.error(EACCES);
            return;
        }

        reply.opened(0, 0);
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock: Option<u64>,
        reply: ReplyData,
    ) {
        debug!("read: ino={}, offset={}, size={}", ino, offset, size);

        let entry = {
            let table = self.table.lock().unwrap();
            table.by_inode.get(&ino).cloned()
        };

        let Some(entry) = entry else {
            reply.error(ENOENT);
            return;
        };

        // FUSE has no deferred-completion path here, so the read blocks on
        // the processing future and replies with whatever it delivered.
        let (tx, rx) = mpsc::channel();
        let outcome = self.core.read_file(
            &entry,
            offset.max(0) as u64,
            size as usize,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
            false,
        );

        if let Err(err) = outcome {
            reply.error(errno_for(&err));
            return;
        }

        match rx.recv() {
            Ok(Ok(data)) => reply.data(&data),
            Ok(Err(err)) => {
                error!("read of {} failed: {err}", entry.name);
                reply.error(errno_for(&err));
            }
            Err(_) => reply.error(EIO),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        debug!("readdir: ino={}, offset={}", ino, offset);

        if ino != ROOT_INODE {
            reply.error(ENOENT);
            return;
        }

        let listing: Vec<(u64, FileType, String)> = {
            let table = self.table.lock().unwrap();
            let mut listing = Vec::with_capacity(table.by_inode.len() + 2);
            listing.push((ROOT_INODE, FileType::Directory, ".".to_string()));
            listing.push((ROOT_INODE, FileType::Directory, "..".to_string()));

            let mut inodes: Vec<u64> = table.by_inode.keys().copied().collect();
            inodes.sort_unstable();
            for inode in inodes {
                if let Some(entry) = table.by_inode.get(&inode) {
                    listing.push((inode, FileType::RegularFile, entry.name.clone()));
                }
            }
            listing
        };

        for (i, (inode, kind, name)) in listing.iter().enumerate().skip(offset.max(0) as usize) {
            if reply.add(*inode, (i + 1) as i64, *kind, name) {
                break;
            }
        }
        reply.ok();
    }
}

/// Attaches mounts through `fuser`.
pub struct FuseHostFactory;

impl FuseHostFactory {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FuseHostFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectionHostFactory for FuseHostFactory {
    fn attach(
        &self,
        mount_path: &Path,
        core: Arc<McrawFileSystem>,
    ) -> Result<Box<dyn ProjectionHost>, VfsError> {
        let table = Arc::new(Mutex::new(EntryTable::from_entries(core.list_files(""))));

        let fs = McrawFuseFs {
            core: Arc::clone(&core),
            table: Arc::clone(&table),
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
        };

        let options = [
            MountOption::RO,
            MountOption::FSName("mcrawfs".to_string()),
            MountOption::DefaultPermissions,
        ];

        let session = fuser::spawn_mount2(fs, mount_path, &options)
            .map_err(|e| VfsError::Io(format!("failed to mount {}: {e}", mount_path.display())))?;

        info!("attached FUSE projection at {}", mount_path.display());

        Ok(Box::new(FuseProjection {
            session: Some(session),
            core,
            table,
        }))
    }
}

/// A live FUSE mount; dropping (or detaching) unmounts.
struct FuseProjection {
    session: Option<fuser::BackgroundSession>,
    core: Arc<McrawFileSystem>,
    table: Arc<Mutex<EntryTable>>,
}

impl ProjectionHost for FuseProjection {
    fn invalidate(&self, path: &Path) {
        debug!("invalidating projection metadata for {}", path.display());
        let mut table = self.table.lock().unwrap();
        *table = EntryTable::from_entries(self.core.list_files(""));
    }

    fn detach(&mut self) {
        if let Some(session) = self.session.take() {
            session.join();
        }
    }
}

impl Drop for FuseProjection {
    fn drop(&mut self) {
        self.detach();
    }
}
