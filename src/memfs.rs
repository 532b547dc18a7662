/*!
 An in-memory filesystem behind the raw interface.

 [`MemFs`] speaks exactly the same negative-errno convention as the host kernel and
 serialises directory listings in the kernel's record layout, so everything built on
 [`Syscalls`] can be driven deterministically: no temp directories, no races with other
 processes, and failures can be injected on demand.
*/
use crate::DirError;
use crate::fs::{FileInfo, FileType, Result, Syscalls, Wanted, encode_record};
use crate::util::PATH_SEPARATOR;
use core::cell::RefCell;
use core::ffi::CStr;
use std::collections::BTreeMap;

/// Longest single path component accepted, as on Linux
const NAME_MAX: usize = 255;
/// Timestamps handed out by `stat` start here and advance by one second per node
const EPOCH_SECS: i64 = 1_700_000_000;
/// Descriptors 0..=2 are left alone so a leaked one is recognisable
const FIRST_FD: i32 = 3;
const ROOT: usize = 0;

#[derive(Debug)]
struct Node {
    name: Vec<u8>,
    parent: usize,
    kind: FileType,
    mode: u32,
    size: u64,
    children: Vec<usize>,
    /// fields `stat` pretends it cannot resolve
    unresolved: Wanted,
    stat_error: Option<i32>,
}

impl Node {
    fn inode(index: usize) -> u64 {
        index as u64 + 1
    }
}

#[derive(Debug)]
struct OpenDir {
    node: usize,
    /// index into the listing `.`, `..`, children...
    position: usize,
}

#[derive(Debug, Default)]
struct State {
    nodes: Vec<Node>,
    fds: BTreeMap<i32, OpenDir>,
    next_fd: i32,
    created: Vec<Vec<u8>>,
    mkdir_calls: usize,
    getdents_calls: usize,
    close_calls: usize,
    stat_calls: usize,
    fail_close: Option<i32>,
    fail_getdents: Option<i32>,
    unknown_inodes: bool,
}

/**
 A single-threaded in-memory tree of directories and files implementing [`Syscalls`].

 - The root `/` has inode 1, every later node the next inode in creation order.
 - Listings return `.` and `..` first, then children in insertion order.
 - Only absolute paths resolve; there is no working directory, so a relative path is
   `-ENOENT`. `.` and `..` components are understood.

 State lives in a `RefCell`, so a `MemFs` is not `Sync`, which matches the
 single-owner contract of the handles that use it.

 # Examples
 ```
 use dirshim::{MemFs, Mode, make_recursive};

 let fs = MemFs::new();
 make_recursive(&fs, "/a/b", Mode::DIR_DEFAULT).unwrap();
 assert!(fs.is_dir(b"/a/b"));
 assert_eq!(fs.mkdir_calls(), 3);
 ```
*/
#[derive(Debug)]
pub struct MemFs {
    state: RefCell<State>,
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

fn neg(code: i32) -> isize {
    -(code as isize)
}

fn components(path: &[u8]) -> impl Iterator<Item = &[u8]> {
    path.split(|&b| b == PATH_SEPARATOR).filter(|c| !c.is_empty())
}

impl State {
    fn child(&self, dir: usize, name: &[u8]) -> Option<usize> {
        self.nodes[dir]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].name == name)
    }

    /// Walks `path` from the root, returning the node index or the errno a kernel would give
    fn resolve(&self, path: &[u8]) -> core::result::Result<usize, i32> {
        if !path.starts_with(&[PATH_SEPARATOR]) {
            return Err(libc::ENOENT);
        }
        let mut current = ROOT;
        for component in components(path) {
            if !self.nodes[current].kind.is_dir() {
                return Err(libc::ENOTDIR);
            }
            if component.len() > NAME_MAX {
                return Err(libc::ENAMETOOLONG);
            }
            current = match component {
                b"." => current,
                b".." => self.nodes[current].parent,
                name => self.child(current, name).ok_or(libc::ENOENT)?,
            };
        }
        Ok(current)
    }

    /// Resolves everything but the last component, which is returned as is
    fn resolve_parent<'p>(&self, path: &'p [u8]) -> core::result::Result<(usize, &'p [u8]), i32> {
        if !path.starts_with(&[PATH_SEPARATOR]) {
            return Err(libc::ENOENT);
        }
        let Some(leaf) = components(path).last() else {
            // the root itself
            return Err(libc::EEXIST);
        };
        let start = leaf.as_ptr() as usize - path.as_ptr() as usize;
        let parent = self.resolve(&path[..start])?;
        if !self.nodes[parent].kind.is_dir() {
            return Err(libc::ENOTDIR);
        }
        if leaf.len() > NAME_MAX {
            return Err(libc::ENAMETOOLONG);
        }
        Ok((parent, leaf))
    }

    fn insert(&mut self, path: &[u8], kind: FileType, mode: u32, size: u64) -> core::result::Result<(), i32> {
        let (parent, leaf) = self.resolve_parent(path)?;
        if leaf == b"." || leaf == b".." || self.child(parent, leaf).is_some() {
            return Err(libc::EEXIST);
        }
        let index = self.nodes.len();
        self.nodes.push(Node {
            name: leaf.to_vec(),
            parent,
            kind,
            mode: mode & 0o7777,
            size,
            children: Vec::new(),
            unresolved: Wanted::EMPTY,
            stat_error: None,
        });
        self.nodes[parent].children.push(index);
        Ok(())
    }

    /// The listing of a directory, as `(inode, type, name)`
    fn listing(&self, dir: usize) -> Vec<(u64, FileType, &[u8])> {
        let node = &self.nodes[dir];
        let mut out = Vec::with_capacity(node.children.len() + 2);
        out.push((Node::inode(dir), FileType::Directory, b".".as_slice()));
        out.push((Node::inode(node.parent), FileType::Directory, b"..".as_slice()));
        out.extend(
            node.children
                .iter()
                .map(|&c| (Node::inode(c), self.nodes[c].kind, self.nodes[c].name.as_slice())),
        );
        out
    }

    fn info(&self, index: usize) -> FileInfo {
        let node = &self.nodes[index];
        let mut info = FileInfo::new();
        info.set_inode(Node::inode(index));
        info.set_file_type(node.kind);
        info.set_device(1);
        let subdirs = node
            .children
            .iter()
            .filter(|&&c| self.nodes[c].kind.is_dir())
            .count() as u64;
        info.set_nlink(if node.kind.is_dir() { 2 + subdirs } else { 1 });
        info.set_size(node.size);
        info.set_csize(node.size.next_multiple_of(512));
        info.set_mode(node.mode);
        info.set_owner(0, 0);
        let stamp = EPOCH_SECS + index as i64;
        info.set_time(Wanted::ATIME, stamp, 0);
        info.set_time(Wanted::MTIME, stamp, 0);
        info.set_time(Wanted::CTIME, stamp, 0);
        info.valid.remove(node.unresolved);
        info
    }

    fn path_of(&self, mut index: usize) -> Vec<u8> {
        let mut parts = Vec::new();
        while index != ROOT {
            parts.push(self.nodes[index].name.as_slice());
            index = self.nodes[index].parent;
        }
        let mut path = Vec::new();
        for part in parts.iter().rev() {
            path.push(PATH_SEPARATOR);
            path.extend_from_slice(part);
        }
        if path.is_empty() {
            path.push(PATH_SEPARATOR);
        }
        path
    }
}

impl MemFs {
    /// An empty filesystem holding only `/`
    #[must_use]
    pub fn new() -> Self {
        let root = Node {
            name: Vec::new(),
            parent: ROOT,
            kind: FileType::Directory,
            mode: 0o755,
            size: 0,
            children: Vec::new(),
            unresolved: Wanted::EMPTY,
            stat_error: None,
        };
        Self {
            state: RefCell::new(State {
                nodes: vec![root],
                next_fd: FIRST_FD,
                ..State::default()
            }),
        }
    }

    /**
     Adds a directory without going through (or counting) the raw mkdir.

     # Errors
     The same errors mkdir would give, e.g. [`DirError::NoSuchEntry`] for a missing parent.
    */
    pub fn add_dir(&self, path: &[u8]) -> Result<()> {
        self.state
            .borrow_mut()
            .insert(path, FileType::Directory, 0o755, 0)
            .map_err(DirError::from_errno)
    }

    /**
     Adds a regular file of `size` bytes.

     # Errors
     As for [`MemFs::add_dir`].
    */
    pub fn add_file(&self, path: &[u8], size: u64) -> Result<()> {
        self.state
            .borrow_mut()
            .insert(path, FileType::RegularFile, 0o644, size)
            .map_err(DirError::from_errno)
    }

    #[must_use]
    pub fn is_dir(&self, path: &[u8]) -> bool {
        let state = self.state.borrow();
        state.resolve(path).is_ok_and(|i| state.nodes[i].kind.is_dir())
    }

    /// The permission bits a node was created with
    #[must_use]
    pub fn mode_of(&self, path: &[u8]) -> Option<u32> {
        let state = self.state.borrow();
        state.resolve(path).ok().map(|i| state.nodes[i].mode)
    }

    /// Paths created by successful raw mkdir calls, in order
    #[must_use]
    pub fn created(&self) -> Vec<Vec<u8>> {
        self.state.borrow().created.clone()
    }

    #[must_use]
    pub fn mkdir_calls(&self) -> usize {
        self.state.borrow().mkdir_calls
    }

    #[must_use]
    pub fn getdents_calls(&self) -> usize {
        self.state.borrow().getdents_calls
    }

    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.state.borrow().close_calls
    }

    #[must_use]
    pub fn stat_calls(&self) -> usize {
        self.state.borrow().stat_calls
    }

    /// Descriptors handed out and not yet closed
    #[must_use]
    pub fn open_fds(&self) -> usize {
        self.state.borrow().fds.len()
    }

    /// The next close fails with `errno`, after releasing the descriptor as Linux does
    pub fn fail_close(&self, errno: i32) {
        self.state.borrow_mut().fail_close = Some(errno);
    }

    /// The next getdents fails with `errno`
    pub fn fail_getdents(&self, errno: i32) {
        self.state.borrow_mut().fail_getdents = Some(errno);
    }

    /// Every stat of `path` fails with `errno`. Unknown paths are ignored.
    pub fn fail_stat(&self, path: &[u8], errno: i32) {
        let mut state = self.state.borrow_mut();
        match state.resolve(path) {
            Ok(i) => state.nodes[i].stat_error = Some(errno),
            Err(_) => log::warn!("fail_stat: no such path {}", String::from_utf8_lossy(path)),
        }
    }

    /// Stats of `path` succeed but leave the `unresolved` fields out. Unknown paths are ignored.
    pub fn partial_stat(&self, path: &[u8], unresolved: Wanted) {
        let mut state = self.state.borrow_mut();
        match state.resolve(path) {
            Ok(i) => state.nodes[i].unresolved = unresolved,
            Err(_) => log::warn!("partial_stat: no such path {}", String::from_utf8_lossy(path)),
        }
    }

    /// Listings report inode 0, as some filesystems do, forcing inodes to come from stat
    pub fn report_unknown_inodes(&self, unknown: bool) {
        self.state.borrow_mut().unknown_inodes = unknown;
    }
}

impl Syscalls for MemFs {
    fn open(&self, path: &CStr, _flags: i32, _mode: u32) -> isize {
        let mut state = self.state.borrow_mut();
        let node = match state.resolve(path.to_bytes()) {
            Ok(node) => node,
            Err(code) => return neg(code),
        };
        // only directories can be opened, every open here is for enumeration
        if !state.nodes[node].kind.is_dir() {
            return neg(libc::ENOTDIR);
        }
        let fd = state.next_fd;
        state.next_fd += 1;
        state.fds.insert(fd, OpenDir { node, position: 0 });
        fd as isize
    }

    fn getdents(&self, fd: i32, buf: &mut [u8]) -> isize {
        let mut state = self.state.borrow_mut();
        state.getdents_calls += 1;
        if let Some(code) = state.fail_getdents.take() {
            return neg(code);
        }
        let Some(open) = state.fds.get(&fd) else {
            return neg(libc::EBADF);
        };
        let (node, start) = (open.node, open.position);

        let listing = state.listing(node);
        let unknown = state.unknown_inodes;
        let mut used = 0;
        let mut position = start;
        for (inode, kind, name) in listing.iter().skip(start) {
            let inode = if unknown { 0 } else { *inode };
            let next = position as i64 + 1;
            match encode_record(&mut buf[used..], inode, next, *kind, name) {
                Some(len) => used += len,
                None => break,
            }
            position += 1;
        }
        if used == 0 && start < listing.len() {
            return neg(libc::EINVAL);
        }

        if let Some(open) = state.fds.get_mut(&fd) {
            open.position = position;
        }
        used as isize
    }

    fn close(&self, fd: i32) -> isize {
        let mut state = self.state.borrow_mut();
        state.close_calls += 1;
        if state.fds.remove(&fd).is_none() {
            return neg(libc::EBADF);
        }
        state.fail_close.take().map_or(0, neg)
    }

    fn mkdir(&self, path: &CStr, mode: u32) -> isize {
        let mut state = self.state.borrow_mut();
        state.mkdir_calls += 1;
        let bytes = path.to_bytes();
        match state.insert(bytes, FileType::Directory, mode, 0) {
            Ok(()) => {
                let index = state.nodes.len() - 1;
                let created = state.path_of(index);
                state.created.push(created);
                0
            }
            Err(code) => neg(code),
        }
    }

    fn rmdir(&self, path: &CStr) -> isize {
        let mut state = self.state.borrow_mut();
        let bytes = path.to_bytes();
        if let Some(leaf) = components(bytes).last()
            && (leaf == b"." || leaf == b"..")
        {
            return neg(libc::EINVAL);
        }
        let node = match state.resolve(bytes) {
            Ok(node) => node,
            Err(code) => return neg(code),
        };
        if node == ROOT {
            return neg(libc::EBUSY);
        }
        if !state.nodes[node].kind.is_dir() {
            return neg(libc::ENOTDIR);
        }
        if !state.nodes[node].children.is_empty() {
            return neg(libc::ENOTEMPTY);
        }
        let parent = state.nodes[node].parent;
        state.nodes[parent].children.retain(|&c| c != node);
        0
    }

    fn stat(&self, path: &CStr, _wanted: Wanted, info: &mut FileInfo) -> isize {
        let mut state = self.state.borrow_mut();
        state.stat_calls += 1;
        let node = match state.resolve(path.to_bytes()) {
            Ok(node) => node,
            Err(code) => return neg(code),
        };
        if let Some(code) = state.nodes[node].stat_error {
            return neg(code);
        }
        info.merge(state.info(node));
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check;
    use crate::fs::RawEntry;
    use std::ffi::CString;

    fn c(path: &str) -> CString {
        CString::new(path).unwrap()
    }

    #[test]
    fn listing_starts_with_dots_then_insertion_order() {
        let fs = MemFs::new();
        fs.add_dir(b"/d").unwrap();
        fs.add_file(b"/d/zeta", 0).unwrap();
        fs.add_file(b"/d/alpha", 0).unwrap();

        let fd = check(fs.open(&c("/d"), 0, 0)).unwrap() as i32;
        let mut buf = [0u8; 256];
        let len = check(fs.getdents(fd, &mut buf)).unwrap();
        let mut offset = 0;
        let mut seen = Vec::new();
        while offset < len {
            let entry = RawEntry::decode(&buf[..len], offset).unwrap();
            seen.push((entry.inode(), entry.name_bytes().to_vec()));
            offset += entry.record_length();
        }
        assert_eq!(
            seen,
            [
                (2, b".".to_vec()),
                (1, b"..".to_vec()),
                (3, b"zeta".to_vec()),
                (4, b"alpha".to_vec())
            ]
        );
        assert_eq!(check(fs.getdents(fd, &mut buf)), Ok(0));
        assert_eq!(check(fs.close(fd)), Ok(0));
    }

    #[test]
    fn getdents_rejects_a_buffer_too_small_for_one_record() {
        let fs = MemFs::new();
        let fd = check(fs.open(&c("/"), 0, 0)).unwrap() as i32;
        let mut tiny = [0u8; 16];
        assert_eq!(check(fs.getdents(fd, &mut tiny)), Err(DirError::InvalidArgument));
    }

    #[test]
    fn resolution_errors_match_the_kernel() {
        let fs = MemFs::new();
        fs.add_file(b"/f", 1).unwrap();
        let mut info = FileInfo::new();
        assert_eq!(check(fs.open(&c("/f"), 0, 0)), Err(DirError::Os(libc::ENOTDIR)));
        assert_eq!(check(fs.open(&c("/f/x"), 0, 0)), Err(DirError::Os(libc::ENOTDIR)));
        assert_eq!(check(fs.open(&c("relative"), 0, 0)), Err(DirError::NoSuchEntry));
        assert_eq!(check(fs.stat(&c("/nope"), Wanted::SIZE, &mut info)), Err(DirError::NoSuchEntry));
        assert_eq!(check(fs.mkdir(&c("/"), 0o755)), Err(DirError::AlreadyExists));
        assert_eq!(check(fs.rmdir(&c("/"))), Err(DirError::Os(libc::EBUSY)));
        assert_eq!(check(fs.rmdir(&c("/f"))), Err(DirError::Os(libc::ENOTDIR)));
        assert_eq!(check(fs.close(99)), Err(DirError::Os(libc::EBADF)));
    }

    #[test]
    fn dot_components_resolve() {
        let fs = MemFs::new();
        fs.add_dir(b"/a").unwrap();
        fs.add_dir(b"/a/b").unwrap();
        assert!(fs.is_dir(b"/a/./b/.."));
        assert!(fs.is_dir(b"/.."));
        let mut info = FileInfo::new();
        assert_eq!(check(fs.stat(&c("/a/b/.."), Wanted::INODE, &mut info)), Ok(0));
        assert_eq!(info.inode(), Some(2));
    }

    #[test]
    fn stat_fills_everything_but_unresolved_fields() {
        let fs = MemFs::new();
        fs.add_dir(b"/s").unwrap();
        fs.add_dir(b"/s/sub").unwrap();
        fs.add_file(b"/s/f", 700).unwrap();
        fs.partial_stat(b"/s/f", Wanted::CTIME | Wanted::CSIZE);

        let mut dir = FileInfo::new();
        check(fs.stat(&c("/s"), Wanted::NORM, &mut dir)).unwrap();
        assert_eq!(dir.nlink(), Some(3));
        assert_eq!(dir.file_type(), Some(FileType::Directory));

        let mut file = FileInfo::new();
        check(fs.stat(&c("/s/f"), Wanted::NORM, &mut file)).unwrap();
        assert_eq!(file.size(), Some(700));
        assert_eq!(file.mode(), Some(0o644));
        assert!(file.modified().is_some());
        assert_eq!(file.changed(), None);
        assert_eq!(file.csize(), None);
        assert_eq!(fs.stat_calls(), 2);
    }

    #[test]
    fn rmdir_refuses_non_empty_and_dot_leaves() {
        let fs = MemFs::new();
        fs.add_dir(b"/r").unwrap();
        fs.add_file(b"/r/f", 0).unwrap();
        assert_eq!(check(fs.rmdir(&c("/r"))), Err(DirError::Os(libc::ENOTEMPTY)));
        assert_eq!(check(fs.rmdir(&c("/r/."))), Err(DirError::InvalidArgument));
        assert!(fs.is_dir(b"/r"));
    }

    #[test]
    fn created_records_normalised_paths() {
        let fs = MemFs::new();
        assert_eq!(check(fs.mkdir(&c("/one//"), 0o750)), Ok(0));
        assert_eq!(check(fs.mkdir(&c("/one/./two"), 0o750)), Ok(0));
        assert_eq!(fs.created(), [b"/one".to_vec(), b"/one/two".to_vec()]);
        assert_eq!(fs.mode_of(b"/one/two"), Some(0o750));
    }

    #[test]
    fn overlong_component_is_rejected() {
        let fs = MemFs::new();
        let mut path = b"/".to_vec();
        path.extend_from_slice(&[b'x'; NAME_MAX + 1]);
        assert_eq!(fs.add_dir(&path), Err(DirError::Os(libc::ENAMETOOLONG)));
    }
}
