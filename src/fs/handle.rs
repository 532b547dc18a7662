use crate::fs::{
    AlignedBuffer, BUFFER_SIZE, FileDes, FileInfo, Lookup, OPEN_DIRECTORY_FLAGS, PATH_MAX, RawEntry,
    Result, Syscalls, Wanted,
};
use crate::util::join_child;
use crate::{DirError, check};
use core::ffi::CStr;
use std::ffi::{CString, OsStr, OsString};
use std::os::unix::ffi::OsStrExt as _;

/**
 An open directory, enumerated through a fixed buffer that the raw getdents call refills.

 The handle owns its descriptor and its buffer. The descriptor is released exactly once:
 either by [`DirHandle::close`] or, failing that, when the handle is dropped, so an early
 return in the caller can never leak it and an explicit close is never repeated.

 Entries come back in whatever order the raw interface produced them, `.` and `..`
 included; nothing is sorted, filtered or deduplicated.

 # Threading
 A handle is a single-owner, single-thread resource: its cursor and buffer are mutated in
 place by every read. All reads take `&mut self`, so sharing one handle between threads
 requires external locking that this type does not provide. Handles on different
 directories are fully independent.

 # Examples
 ```
 use dirshim::{DirHandle, MemFs, Wanted};

 let fs = MemFs::new();
 fs.add_dir(b"/docs").unwrap();
 fs.add_file(b"/docs/readme", 12).unwrap();

 let mut dir = DirHandle::open(&fs, "/docs").unwrap();
 let mut names = Vec::new();
 while let Some(entry) = dir.read_next().unwrap() {
     names.push(entry.name_bytes().to_vec());
 }
 assert_eq!(names, [b".".to_vec(), b"..".to_vec(), b"readme".to_vec()]);
 ```
*/
#[derive(Debug)]
pub struct DirHandle<'sys, S: Syscalls + ?Sized, const SIZE: usize = BUFFER_SIZE> {
    /// The raw interface every primitive goes through
    pub(crate) sys: &'sys S,
    /// `None` once the descriptor has been released
    pub(crate) fd: Option<FileDes>,
    /// Kernel buffer for batch reading directory entries
    pub(crate) buffer: Box<AlignedBuffer<SIZE>>,
    /// Bytes of `buffer` holding records from the last fill
    pub(crate) valid_len: usize,
    /// Offset of the next undecoded record, never past `valid_len`
    pub(crate) cursor: usize,
    /// Directory path as opened, used to build child paths for stat
    pub(crate) dir_path: Vec<u8>,
    /// The error of the last fill that was treated as end of directory
    pub(crate) last_fill_error: Option<DirError>,
}

impl<'sys, S: Syscalls + ?Sized> DirHandle<'sys, S> {
    /**
     Opens `path` read-only as a directory, with a buffer of [`BUFFER_SIZE`] bytes.

     # Errors
     - [`DirError::InvalidArgument`] if the path contains a NUL byte
     - [`DirError::Open`] if the raw open fails. Its status is always
       [`crate::Status::InvalidArgument`]; the kernel's reason is kept in the error.
    */
    pub fn open<P: AsRef<OsStr>>(sys: &'sys S, path: P) -> Result<Self> {
        Self::open_sized(sys, path)
    }
}

impl<'sys, S: Syscalls + ?Sized, const SIZE: usize> DirHandle<'sys, S, SIZE> {
    /**
     Opens `path` with a buffer of `SIZE` bytes.

     # Errors
     See [`DirHandle::open`].
    */
    pub fn open_sized<P: AsRef<OsStr>>(sys: &'sys S, path: P) -> Result<Self> {
        let dir_path = path.as_ref().as_bytes().to_vec();
        let c_path = CString::new(dir_path.as_slice()).map_err(|_| DirError::InvalidArgument)?;

        let raw_fd = check(sys.open(&c_path, OPEN_DIRECTORY_FLAGS, 0)).map_err(|e| {
            log::debug!("open {} failed: {e}", path.as_ref().display());
            DirError::Open {
                code: e.raw_os_error().unwrap_or(libc::EINVAL),
            }
        })?;
        // close takes an i32, so a value outside it cannot be handed back without
        // truncating into some other descriptor
        let Ok(fd) = i32::try_from(raw_fd) else {
            log::error!("open {} returned {raw_fd}, not a descriptor", path.as_ref().display());
            return Err(DirError::InvalidArgument);
        };
        log::debug!("opened {} as fd {fd}", path.as_ref().display());

        Ok(Self {
            sys,
            fd: Some(FileDes(fd)),
            buffer: AlignedBuffer::boxed(),
            valid_len: 0,
            cursor: 0,
            dir_path,
            last_fill_error: None,
        })
    }

    /**
     Releases the descriptor.

     Closing an already closed handle is a no-op. If the raw close fails the error is
     returned, but the handle is still considered closed and will not try again.

     # Errors
     The translated error of the raw close, the first time only.
    */
    pub fn close(&mut self) -> Result<()> {
        let Some(fd) = self.fd.take() else {
            return Ok(());
        };
        self.valid_len = 0;
        self.cursor = 0;
        check(self.sys.close(fd.as_raw())).map(drop).inspect_err(|e| {
            log::warn!("closing fd {} for {} failed: {e}", fd.as_raw(), self.display());
        })
    }

    #[must_use]
    #[inline]
    pub const fn is_closed(&self) -> bool {
        self.fd.is_none()
    }

    /// The descriptor, while the handle is open
    #[must_use]
    #[inline]
    pub const fn fd(&self) -> Option<&FileDes> {
        self.fd.as_ref()
    }

    /// The directory path exactly as it was opened
    #[must_use]
    #[inline]
    pub fn path(&self) -> &OsStr {
        OsStr::from_bytes(&self.dir_path)
    }

    /// Unprocessed bytes left in the current buffer fill
    #[must_use]
    #[inline]
    pub const fn remaining_bytes(&self) -> usize {
        self.valid_len - self.cursor
    }

    /**
     The error behind the most recent "end of directory", if it was an error.

     A refill that returns zero bytes and one that fails are both reported as exhaustion by
     [`DirHandle::read_next`]; this is how a caller can tell them apart afterwards.
    */
    #[must_use]
    #[inline]
    pub const fn last_fill_error(&self) -> Option<DirError> {
        self.last_fill_error
    }

    fn display(&self) -> std::path::Display<'_> {
        std::path::Path::new(self.path()).display()
    }

    /// Refills the buffer; false means no more entries, for whatever reason
    fn refill(&mut self, fd: i32) -> bool {
        self.cursor = 0;
        self.valid_len = 0;

        match check(self.buffer.fill(self.sys, fd)) {
            Ok(0) => {
                log::debug!("end of directory {}", self.display());
                self.last_fill_error = None;
                false
            }
            Ok(bytes) => {
                self.valid_len = bytes.min(SIZE);
                self.last_fill_error = None;
                log::trace!("getdents filled {bytes} bytes for {}", self.display());
                true
            }
            Err(e) => {
                // treated exactly like end of directory, see `last_fill_error`
                log::debug!("getdents on {} failed, stopping: {e}", self.display());
                self.last_fill_error = Some(e);
                false
            }
        }
    }

    /**
     Decodes the next record, refilling the buffer first if it has been used up.

     Returns `Ok(None)` when the raw interface has nothing more to give. The returned entry
     borrows the handle's buffer, so it must be dropped before the next read.

     # Errors
     - [`DirError::InvalidArgument`] on a closed handle
     - [`DirError::Malformed`] if the record at the cursor does not fit the ABI layout; the
       rest of that buffer fill is discarded and the next read refills.
    */
    pub fn read_next(&mut self) -> Result<Option<RawEntry<'_>>> {
        let Some(fd) = self.fd.as_ref().map(FileDes::as_raw) else {
            return Err(DirError::InvalidArgument);
        };

        if self.cursor >= self.valid_len && !self.refill(fd) {
            return Ok(None);
        }

        let valid = &self.buffer[..self.valid_len];
        match RawEntry::decode(valid, self.cursor) {
            Ok(entry) => {
                self.cursor += entry.record_length;
                Ok(Some(entry))
            }
            Err(e) => {
                log::warn!("{e} in {}, discarding the rest of the fill", self.display());
                self.cursor = self.valid_len;
                Err(e)
            }
        }
    }

    /**
     Reads the next entry and resolves the `wanted` metadata for it.

     `NAME` (and `INODE`, when the record carries a real inode) come straight from the
     record. Anything else is asked of the raw stat on `dir/name`, without following a
     trailing symlink. A stat that fails outright does not fail the read: the entry comes
     back as [`Lookup::Incomplete`] with just its name and inode, and enumeration can carry on.

     # Errors
     - [`DirError::NoSuchEntry`] when the directory is exhausted
     - anything [`DirHandle::read_next`] reports
    */
    pub fn read_with_stat(&mut self, wanted: Wanted) -> Result<Lookup> {
        let (inode, inode_known, entry_type, name) = {
            let entry = self.read_next()?.ok_or(DirError::NoSuchEntry)?;
            (
                entry.inode(),
                entry.inode_known(),
                entry.entry_type(),
                OsStr::from_bytes(entry.name_bytes()).to_os_string(),
            )
        };

        let mut remaining = wanted;
        if inode_known {
            remaining.remove(Wanted::INODE);
        }
        remaining.remove(Wanted::NAME);

        let mut info = FileInfo::new();
        if inode_known {
            info.set_inode(inode);
        }

        if !remaining.without(Wanted::LINK).is_empty() {
            match self.stat_child(&name, remaining | Wanted::LINK) {
                Some(statted) => info.merge(statted),
                None => log::trace!(
                    "keeping bare entry {} ({entry_type})",
                    name.to_string_lossy()
                ),
            }
        }

        info.set_name(name);
        Ok(Lookup::classify(info, wanted))
    }

    /// Stats `dir/name`; `None` if the path is too long or the call fails outright
    fn stat_child(&self, name: &OsString, wanted: Wanted) -> Option<FileInfo> {
        let Some(full) = join_child(&self.dir_path, name.as_bytes(), PATH_MAX) else {
            log::warn!(
                "path to {} in {} exceeds {PATH_MAX} bytes, not statting",
                name.to_string_lossy(),
                self.display()
            );
            return None;
        };
        let c_path = CStr::from_bytes_with_nul(&full).ok()?;

        let mut statted = FileInfo::new();
        match check(self.sys.stat(c_path, wanted, &mut statted)) {
            Ok(_) => Some(statted),
            Err(e) => {
                log::warn!("stat {} failed: {e}", c_path.to_string_lossy());
                None
            }
        }
    }

    /// Iterates the remaining entries with `wanted` metadata, see [`DirHandle::read_with_stat`]
    pub fn entries(&mut self, wanted: Wanted) -> Entries<'_, 'sys, S, SIZE> {
        Entries {
            handle: self,
            wanted,
            done: false,
        }
    }
}

impl<S: Syscalls + ?Sized, const SIZE: usize> Drop for DirHandle<'_, S, SIZE> {
    /**
      Releases the descriptor if [`DirHandle::close`] has not already done so.
    */
    #[inline]
    fn drop(&mut self) {
        if let Some(fd) = self.fd.take()
            && let Err(e) = check(self.sys.close(fd.as_raw()))
        {
            log::warn!("closing fd {} on drop failed: {e}", fd.as_raw());
        }
    }
}

/**
 Iterator over the remaining entries of a [`DirHandle`], each with its metadata.

 Stops at the end of the directory. A decoding error is yielded once and ends iteration.
*/
#[derive(Debug)]
pub struct Entries<'h, 'sys, S: Syscalls + ?Sized, const SIZE: usize> {
    handle: &'h mut DirHandle<'sys, S, SIZE>,
    wanted: Wanted,
    done: bool,
}

impl<S: Syscalls + ?Sized, const SIZE: usize> Iterator for Entries<'_, '_, S, SIZE> {
    type Item = Result<Lookup>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.handle.read_with_stat(self.wanted) {
            Ok(lookup) => Some(Ok(lookup)),
            Err(DirError::NoSuchEntry) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<S: Syscalls + ?Sized, const SIZE: usize> core::iter::FusedIterator for Entries<'_, '_, S, SIZE> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileType, encode_record};
    use crate::{MemFs, Status};
    use core::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    /// Hands out prepared getdents fills in order, then end of directory
    #[derive(Debug, Default)]
    struct Scripted {
        open_result: Option<isize>,
        fills: RefCell<VecDeque<Vec<u8>>>,
        closes: Cell<usize>,
    }

    impl Scripted {
        fn with_fills(fills: Vec<Vec<u8>>) -> Self {
            Self {
                fills: RefCell::new(fills.into()),
                ..Self::default()
            }
        }
    }

    impl Syscalls for Scripted {
        fn open(&self, _path: &CStr, _flags: i32, _mode: u32) -> isize {
            self.open_result.unwrap_or(3)
        }
        fn getdents(&self, _fd: i32, buf: &mut [u8]) -> isize {
            let Some(fill) = self.fills.borrow_mut().pop_front() else {
                return 0;
            };
            buf[..fill.len()].copy_from_slice(&fill);
            fill.len() as isize
        }
        fn close(&self, _fd: i32) -> isize {
            self.closes.set(self.closes.get() + 1);
            0
        }
        fn mkdir(&self, _path: &CStr, _mode: u32) -> isize {
            -(libc::ENOSYS as isize)
        }
        fn rmdir(&self, _path: &CStr) -> isize {
            -(libc::ENOSYS as isize)
        }
        fn stat(&self, _path: &CStr, _wanted: Wanted, _info: &mut FileInfo) -> isize {
            -(libc::ENOSYS as isize)
        }
    }

    fn record(name: &[u8]) -> Vec<u8> {
        let mut buf = vec![0u8; 64];
        let len = encode_record(&mut buf, 7, 1, FileType::RegularFile, name).unwrap();
        buf.truncate(len);
        buf
    }

    fn names<S: Syscalls + ?Sized, const N: usize>(dir: &mut DirHandle<'_, S, N>) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(entry) = dir.read_next().unwrap() {
            out.push(entry.name_bytes().to_vec());
        }
        out
    }

    #[test]
    fn four_entries_then_exhaustion() {
        let fs = MemFs::new();
        fs.add_dir(b"/d").unwrap();
        fs.add_file(b"/d/a", 1).unwrap();
        fs.add_file(b"/d/b", 2).unwrap();

        let mut dir = DirHandle::open(&fs, "/d").unwrap();
        let got = names(&mut dir);
        assert_eq!(got, [b".".to_vec(), b"..".to_vec(), b"a".to_vec(), b"b".to_vec()]);
        assert!(dir.read_next().unwrap().is_none());
        assert_eq!(dir.last_fill_error(), None);
    }

    #[test]
    fn small_buffer_refills_without_losing_entries() {
        let fs = MemFs::new();
        fs.add_dir(b"/big").unwrap();
        let expected: Vec<Vec<u8>> = (0..50).map(|i| format!("entry_{i:03}").into_bytes()).collect();
        for name in &expected {
            let mut p = b"/big/".to_vec();
            p.extend_from_slice(name);
            fs.add_file(&p, 0).unwrap();
        }

        // 64 bytes holds two 32 byte records per fill
        let mut dir = DirHandle::<_, 64>::open_sized(&fs, "/big").unwrap();
        let got = names(&mut dir);
        assert_eq!(got.len(), 52);
        assert_eq!(&got[2..], expected.as_slice());
        assert!(fs.getdents_calls() >= 26);
    }

    #[test]
    fn cursor_never_passes_valid_length() {
        let fs = MemFs::new();
        fs.add_dir(b"/c").unwrap();
        fs.add_file(b"/c/one", 0).unwrap();
        let mut dir = DirHandle::<_, 48>::open_sized(&fs, "/c").unwrap();
        while dir.read_next().unwrap().is_some() {
            assert!(dir.cursor <= dir.valid_len);
            assert!(dir.valid_len <= 48);
        }
        assert_eq!(dir.remaining_bytes(), 0);
    }

    #[test]
    fn malformed_record_drops_the_rest_of_the_fill() {
        let mut first = record(b"good");
        let mut broken = record(b"lost");
        // a zero d_reclen can never be stepped over
        broken[16..18].copy_from_slice(&0u16.to_ne_bytes());
        first.extend_from_slice(&broken);
        first.extend_from_slice(&record(b"skipped"));
        let sys = Scripted::with_fills(vec![first, record(b"next")]);

        let mut dir = DirHandle::open(&sys, "/scripted").unwrap();
        assert_eq!(dir.read_next().unwrap().unwrap().name_bytes(), b"good");
        assert_eq!(dir.read_next().unwrap_err(), DirError::Malformed { offset: 24 });
        assert_eq!(dir.remaining_bytes(), 0);
        assert_eq!(dir.read_next().unwrap().unwrap().name_bytes(), b"next");
        assert!(dir.read_next().unwrap().is_none());
        assert_eq!(dir.last_fill_error(), None);
        drop(dir);
        assert_eq!(sys.closes.get(), 1);
    }

    #[test]
    fn malformed_record_ends_entries_with_one_error() {
        let mut fill = record(b"good");
        fill.extend_from_slice(&[0u8; 8]);
        let sys = Scripted::with_fills(vec![fill]);
        let mut dir = DirHandle::open(&sys, "/scripted").unwrap();
        let got: Vec<_> = dir.entries(Wanted::NAME).collect();
        assert_eq!(got.len(), 2);
        assert!(got[0].as_ref().is_ok_and(Lookup::is_complete));
        assert_eq!(got[1], Err(DirError::Malformed { offset: 24 }));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn descriptor_outside_i32_is_rejected() {
        let sys = Scripted {
            open_result: Some(i32::MAX as isize + 1),
            ..Scripted::default()
        };
        assert_eq!(
            DirHandle::open(&sys, "/scripted").unwrap_err(),
            DirError::InvalidArgument
        );
        assert_eq!(sys.closes.get(), 0);
    }

    #[test]
    fn open_failure_keeps_cause() {
        let fs = MemFs::new();
        let err = DirHandle::open(&fs, "/nope").unwrap_err();
        assert_eq!(err, DirError::Open { code: libc::ENOENT });
        assert_eq!(err.status(), Status::InvalidArgument);

        fs.add_file(b"/file", 3).unwrap();
        let err = DirHandle::open(&fs, "/file").unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOTDIR));
    }

    #[test]
    fn interior_nul_is_invalid() {
        let fs = MemFs::new();
        let bad = OsStr::from_bytes(b"/a\0b");
        assert_eq!(DirHandle::open(&fs, bad).unwrap_err(), DirError::InvalidArgument);
    }

    #[test]
    fn close_is_idempotent_and_drop_does_not_repeat() {
        let fs = MemFs::new();
        {
            let mut dir = DirHandle::open(&fs, "/").unwrap();
            assert_eq!(fs.open_fds(), 1);
            assert_eq!(dir.close(), Ok(()));
            assert!(dir.is_closed());
            assert_eq!(dir.close(), Ok(()));
            assert_eq!(dir.read_next().unwrap_err(), DirError::InvalidArgument);
        }
        assert_eq!(fs.open_fds(), 0);
        assert_eq!(fs.close_calls(), 1);
    }

    #[test]
    fn drop_releases_on_early_return() {
        fn bail_early(fs: &MemFs) -> Result<()> {
            let mut dir = DirHandle::open(fs, "/")?;
            dir.read_next()?;
            Err(DirError::Os(libc::EIO))
        }
        let fs = MemFs::new();
        assert!(bail_early(&fs).is_err());
        assert_eq!(fs.open_fds(), 0);
        assert_eq!(fs.close_calls(), 1);
    }

    #[test]
    fn failed_close_still_releases() {
        let fs = MemFs::new();
        let mut dir = DirHandle::open(&fs, "/").unwrap();
        fs.fail_close(libc::EIO);
        assert_eq!(dir.close(), Err(DirError::Os(libc::EIO)));
        assert!(dir.is_closed());
        assert_eq!(dir.close(), Ok(()));
        drop(dir);
        assert_eq!(fs.close_calls(), 1);
    }

    #[test]
    fn getdents_error_reads_as_exhaustion() {
        let fs = MemFs::new();
        let mut dir = DirHandle::open(&fs, "/").unwrap();
        fs.fail_getdents(libc::EIO);
        assert!(dir.read_next().unwrap().is_none());
        assert_eq!(dir.last_fill_error(), Some(DirError::Os(libc::EIO)));
    }

    #[test]
    fn name_only_never_stats() {
        let fs = MemFs::new();
        fs.add_dir(b"/n").unwrap();
        fs.add_file(b"/n/f", 10).unwrap();
        let mut dir = DirHandle::open(&fs, "/n").unwrap();
        let all: Vec<_> = dir.entries(Wanted::NAME).collect::<Result<_>>().unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(Lookup::is_complete));
        assert_eq!(fs.stat_calls(), 0);
    }

    #[test]
    fn known_inode_satisfies_inode_without_stat() {
        let fs = MemFs::new();
        fs.add_dir(b"/i").unwrap();
        let mut dir = DirHandle::open(&fs, "/i").unwrap();
        let lookup = dir.read_with_stat(Wanted::NAME | Wanted::INODE).unwrap();
        assert!(lookup.is_complete());
        assert!(lookup.info().inode().is_some());
        assert_eq!(fs.stat_calls(), 0);
    }

    #[test]
    fn unknown_inode_goes_to_stat() {
        let fs = MemFs::new();
        fs.add_dir(b"/u").unwrap();
        fs.add_file(b"/u/f", 4).unwrap();
        fs.report_unknown_inodes(true);
        let mut dir = DirHandle::open(&fs, "/u").unwrap();
        let all: Vec<_> = dir.entries(Wanted::NAME | Wanted::INODE).collect::<Result<_>>().unwrap();
        assert_eq!(fs.stat_calls(), 3);
        assert!(all.iter().all(|l| l.is_complete() && l.info().inode().is_some()));
    }

    #[test]
    fn stat_fields_are_merged() {
        let fs = MemFs::new();
        fs.add_dir(b"/s").unwrap();
        fs.add_file(b"/s/data", 321).unwrap();
        let mut dir = DirHandle::open(&fs, "/s").unwrap();
        let wanted = Wanted::NAME | Wanted::SIZE | Wanted::TYPE;
        let data = dir
            .entries(wanted)
            .map(Result::unwrap)
            .find(|l| l.info().name() == Some(OsStr::new("data")))
            .unwrap();
        assert_eq!(data.status(), Status::Success);
        assert_eq!(data.info().size(), Some(321));
        assert_eq!(data.info().file_type(), Some(FileType::RegularFile));
    }

    #[test]
    fn stat_failure_is_incomplete_and_enumeration_continues() {
        let fs = MemFs::new();
        fs.add_dir(b"/p").unwrap();
        fs.add_file(b"/p/good", 1).unwrap();
        fs.add_file(b"/p/bad", 2).unwrap();
        fs.add_file(b"/p/after", 3).unwrap();
        fs.fail_stat(b"/p/bad", libc::EACCES);

        let mut dir = DirHandle::open(&fs, "/p").unwrap();
        let all: Vec<Lookup> = dir.entries(Wanted::NAME | Wanted::SIZE).collect::<Result<_>>().unwrap();
        assert_eq!(all.len(), 5);

        let bad = all.iter().find(|l| l.info().name() == Some(OsStr::new("bad"))).unwrap();
        assert_eq!(bad.status(), Status::Incomplete);
        assert_eq!(bad.info().valid(), Wanted::NAME | Wanted::INODE);
        assert_eq!(bad.info().size(), None);

        let after = all.iter().find(|l| l.info().name() == Some(OsStr::new("after"))).unwrap();
        assert!(after.is_complete());
        assert_eq!(after.info().size(), Some(3));
    }

    #[test]
    fn partial_stat_is_incomplete() {
        let fs = MemFs::new();
        fs.add_dir(b"/q").unwrap();
        fs.add_file(b"/q/f", 8).unwrap();
        fs.partial_stat(b"/q/f", Wanted::MTIME);
        let mut dir = DirHandle::open(&fs, "/q").unwrap();
        let f = dir
            .entries(Wanted::NAME | Wanted::SIZE | Wanted::MTIME)
            .map(Result::unwrap)
            .find(|l| l.info().name() == Some(OsStr::new("f")))
            .unwrap();
        assert_eq!(f.status(), Status::Incomplete);
        assert_eq!(f.info().size(), Some(8));
        assert_eq!(f.info().modified(), None);
    }

    #[test]
    fn exhausted_read_with_stat_is_no_such_entry() {
        let fs = MemFs::new();
        fs.add_dir(b"/e").unwrap();
        let mut dir = DirHandle::open(&fs, "/e").unwrap();
        dir.read_with_stat(Wanted::NAME).unwrap();
        dir.read_with_stat(Wanted::NAME).unwrap();
        assert_eq!(dir.read_with_stat(Wanted::NAME), Err(DirError::NoSuchEntry));
    }

    #[test]
    fn overlong_child_path_is_incomplete() {
        let fs = MemFs::new();
        let mut path = Vec::new();
        // nest until the directory path alone is close to the limit
        while path.len() + 256 < PATH_MAX {
            path.extend_from_slice(b"/");
            path.extend_from_slice(&[b'd'; 200]);
            fs.add_dir(&path).unwrap();
        }
        let mut child = path.clone();
        child.extend_from_slice(b"/");
        child.extend_from_slice(&[b'f'; 250]);
        fs.add_file(&child, 1).unwrap();

        let mut dir = DirHandle::open(&fs, OsStr::from_bytes(&path)).unwrap();
        let all: Vec<Lookup> = dir.entries(Wanted::NAME | Wanted::SIZE).collect::<Result<_>>().unwrap();
        let long = all.last().unwrap();
        assert_eq!(long.info().name().unwrap().len(), 250);
        assert_eq!(long.status(), Status::Incomplete);
    }
}
