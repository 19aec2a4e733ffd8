use crate::{
    api::SmaApi,
    common::join_child,
    ino::{ino_for_name, ROOT_INO},
};
use bytes::Bytes;
use fuser::{
    consts::FOPEN_DIRECT_IO, FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyData,
    ReplyDirectory, ReplyEntry, ReplyOpen, Request,
};
use libc::{c_int, EBADF, EINVAL, EIO, ENOENT, EROFS};
use std::{
    collections::HashMap,
    ffi::OsStr,
    path::Path,
    sync::Arc,
    time::{Duration, UNIX_EPOCH},
};
use tokio::runtime::Runtime;

// Zero TTL: the kernel caches no attributes or entries.
const TTL: Duration = Duration::ZERO;

struct Node {
    path: String,
    kind: FileType,
}

/// Read-only filesystem over a device session.
///
/// Callbacks are dispatched by inode number, so known nodes are kept in an
/// ino-keyed registry, populated at construction (root) and at lookup
/// (everything else). Inode numbers themselves are derived purely from the
/// entry name.
pub struct SmaFs {
    api: SmaApi,
    sid: String,
    rt: Arc<Runtime>,
    nodes: HashMap<u64, Node>,
    handles: HashMap<u64, Bytes>,
    next_fh: u64,
}

impl SmaFs {
    pub fn new(api: SmaApi, sid: String, rt: Arc<Runtime>) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            ROOT_INO,
            Node {
                path: "/".to_string(),
                kind: FileType::Directory,
            },
        );
        Self {
            api,
            sid,
            rt,
            nodes,
            handles: HashMap::new(),
            next_fh: 1,
        }
    }

    /// Mount at `mountpoint` and serve until unmounted.
    pub fn mount(self, mountpoint: &str) -> anyhow::Result<()> {
        let options = [
            MountOption::FSName("smafs".to_string()),
            MountOption::RO,
            MountOption::AutoUnmount,
        ];
        fuser::mount2(self, mountpoint, &options)?;
        Ok(())
    }

    /// Attributes for a known node.
    ///
    /// The listing's size and time fields are not projected: every node
    /// reports size 0, epoch timestamps, and mode `r-xr-xr-x`. Reads work
    /// regardless because open handles bypass the page cache.
    pub fn node_attr(&self, ino: u64) -> Result<FileAttr, c_int> {
        let node = self.nodes.get(&ino).ok_or(ENOENT)?;
        Ok(self.file_attr(ino, node.kind))
    }

    /// Resolve a child name under a known directory node.
    ///
    /// No remote call is made: the kind comes from the name (an extension
    /// means a file), the identity from its hash. The child is registered
    /// so later callbacks can resolve its ino back to a path. Lookup
    /// therefore succeeds even for names the device has never heard of;
    /// the mistake surfaces on the first listing or download.
    pub fn lookup_child(&mut self, parent: u64, name: &str) -> Result<FileAttr, c_int> {
        let parent_path = match self.nodes.get(&parent) {
            Some(node) => node.path.clone(),
            None => return Err(ENOENT),
        };
        let path = join_child(&parent_path, name);
        let kind = if Path::new(name).extension().is_some() {
            FileType::RegularFile
        } else {
            FileType::Directory
        };
        let ino = ino_for_name(name);
        tracing::debug!(path = %path, ino, "lookup");
        self.nodes.insert(ino, Node { path, kind });
        Ok(self.file_attr(ino, kind))
    }

    /// List a directory node from the device, in listing order.
    pub fn read_dir(&self, ino: u64) -> Result<Vec<(u64, FileType, String)>, c_int> {
        let path = match self.nodes.get(&ino) {
            Some(node) => node.path.clone(),
            None => return Err(ENOENT),
        };
        let res = self.rt.block_on(self.api.get_fs(&self.sid, &path));
        let entries = match res {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "directory listing failed");
                return Err(EIO);
            }
        };
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(name) = entry.name() else {
                tracing::warn!(path = %path, "skipping listing entry with no name");
                continue;
            };
            let kind = if entry.is_file() {
                FileType::RegularFile
            } else {
                FileType::Directory
            };
            out.push((ino_for_name(name), kind, name.to_string()));
        }
        Ok(out)
    }

    /// Open a file node.
    ///
    /// Write intent is refused before anything touches the network. A read
    /// open downloads the whole file into a buffer owned by the returned
    /// handle; there is no cross-open caching.
    pub fn open_file(&mut self, ino: u64, flags: i32) -> Result<u64, c_int> {
        if (flags & libc::O_WRONLY) != 0 || (flags & libc::O_RDWR) != 0 {
            return Err(EROFS);
        }
        let path = match self.nodes.get(&ino) {
            Some(node) => node.path.clone(),
            None => return Err(ENOENT),
        };
        let res = self.rt.block_on(self.api.download(&self.sid, &path));
        let data = match res {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "download failed");
                return Err(EIO);
            }
        };
        let fh = self.next_fh;
        self.next_fh += 1;
        tracing::debug!(path = %path, fh, size = data.len(), "opened");
        self.handles.insert(fh, data);
        Ok(fh)
    }

    /// Read from an open handle, clipped to the buffered contents. Reading
    /// at or past the end yields an empty slice.
    pub fn read_at(&self, fh: u64, offset: u64, size: u32) -> Result<&[u8], c_int> {
        let data = self.handles.get(&fh).ok_or(EBADF)?;
        let offset = offset as usize;
        if offset >= data.len() {
            return Ok(&[]);
        }
        let end = std::cmp::min(offset + size as usize, data.len());
        Ok(&data[offset..end])
    }

    /// Drop an open handle and its buffer.
    pub fn release_handle(&mut self, fh: u64) -> Result<(), c_int> {
        self.handles.remove(&fh).map(|_| ()).ok_or(EBADF)
    }

    fn file_attr(&self, ino: u64, kind: FileType) -> FileAttr {
        FileAttr {
            ino,
            size: 0,
            blocks: 1,
            atime: UNIX_EPOCH,
            mtime: UNIX_EPOCH,
            ctime: UNIX_EPOCH,
            crtime: UNIX_EPOCH,
            kind,
            perm: 0o555,
            nlink: if kind == FileType::Directory { 2 } else { 1 },
            uid: unsafe { libc::geteuid() },
            gid: unsafe { libc::getegid() },
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }
}

impl Filesystem for SmaFs {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let name = name.to_string_lossy();
        match self.lookup_child(parent, &name) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(errno) => reply.error(errno),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        match self.node_attr(ino) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(errno) => reply.error(errno),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let entries = match self.read_dir(ino) {
            Ok(entries) => entries,
            Err(errno) => {
                reply.error(errno);
                return;
            }
        };

        let mut all = Vec::with_capacity(entries.len() + 2);
        all.push((ino, FileType::Directory, ".".to_string()));
        all.push((ino, FileType::Directory, "..".to_string()));
        all.extend(entries);

        let start = if offset < 0 { 0 } else { offset as usize };
        for (i, (child_ino, kind, name)) in all.into_iter().enumerate().skip(start) {
            let next_offset = (i + 1) as i64;
            if reply.add(child_ino, next_offset, kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        match self.open_file(ino, flags) {
            Ok(fh) => reply.opened(fh, FOPEN_DIRECT_IO),
            Err(errno) => reply.error(errno),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        if offset < 0 {
            reply.error(EINVAL);
            return;
        }
        match self.read_at(fh, offset as u64, size) {
            Ok(data) => reply.data(data),
            Err(errno) => reply.error(errno),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: fuser::ReplyEmpty,
    ) {
        match self.release_handle(fh) {
            Ok(()) => reply.ok(),
            Err(errno) => reply.error(errno),
        }
    }
}
