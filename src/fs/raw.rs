use crate::fs::{FileInfo, Wanted};
use core::ffi::CStr;

/**
 The raw syscall surface the shim adapts.

 Every method follows the kernel's convention: a non-negative value on success, a negated
 errno on failure. Nothing outside [`crate::error`] interprets these numbers.

 Implementations are expected to be driven from one thread at a time; the handles built on
 top of them are single-owner resources.
*/
pub trait Syscalls {
    /// `open(2)`: returns a new descriptor or `-errno`
    fn open(&self, path: &CStr, flags: i32, mode: u32) -> isize;

    /// Fills `buf` with packed `linux_dirent64` records, returning the bytes written,
    /// `0` at the end of the directory or `-errno`
    fn getdents(&self, fd: i32, buf: &mut [u8]) -> isize;

    fn close(&self, fd: i32) -> isize;

    fn mkdir(&self, path: &CStr, mode: u32) -> isize;

    fn rmdir(&self, path: &CStr) -> isize;

    /**
     Resolves as many of the `wanted` fields of `path` as possible into `info`.

     `Wanted::LINK` in `wanted` means a trailing symlink is not followed. Returns `0` when at
     least something was resolved (check `info.valid()` for what), `-errno` when nothing was.
    */
    fn stat(&self, path: &CStr, wanted: Wanted, info: &mut FileInfo) -> isize;
}

impl<S: Syscalls + ?Sized> Syscalls for &S {
    #[inline]
    fn open(&self, path: &CStr, flags: i32, mode: u32) -> isize {
        (**self).open(path, flags, mode)
    }
    #[inline]
    fn getdents(&self, fd: i32, buf: &mut [u8]) -> isize {
        (**self).getdents(fd, buf)
    }
    #[inline]
    fn close(&self, fd: i32) -> isize {
        (**self).close(fd)
    }
    #[inline]
    fn mkdir(&self, path: &CStr, mode: u32) -> isize {
        (**self).mkdir(path, mode)
    }
    #[inline]
    fn rmdir(&self, path: &CStr) -> isize {
        (**self).rmdir(path)
    }
    #[inline]
    fn stat(&self, path: &CStr, wanted: Wanted, info: &mut FileInfo) -> isize {
        (**self).stat(path, wanted, info)
    }
}

/// Flags used to open a directory for enumeration
pub const OPEN_DIRECTORY_FLAGS: i32 = libc::O_RDONLY | libc::O_DIRECTORY | libc::O_CLOEXEC | O_LARGEFILE;

#[cfg(any(target_os = "linux", target_os = "android"))]
const O_LARGEFILE: i32 = libc::O_LARGEFILE;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const O_LARGEFILE: i32 = 0;

/**
 The host kernel, reached through `libc`.

 Failures are read from `errno` and returned negated, so the host looks exactly like the
 emulated kernel the shim was designed around.
*/
#[derive(Debug, Clone, Copy, Default)]
pub struct Kernel;

impl Syscalls for Kernel {
    #[inline]
    fn open(&self, path: &CStr, flags: i32, mode: u32) -> isize {
        // SAFETY: the path is NUL terminated
        let fd = unsafe { libc::open(path.as_ptr(), flags, mode as libc::c_uint) };
        if fd < 0 { neg_errno!() } else { fd as isize }
    }

    #[inline]
    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[expect(clippy::cast_possible_truncation, reason = "clong is isize on Unix")]
    fn getdents(&self, fd: i32, buf: &mut [u8]) -> isize {
        // SAFETY: the buffer is valid for writes of `buf.len()` bytes
        let ret = unsafe { libc::syscall(libc::SYS_getdents64, fd, buf.as_mut_ptr(), buf.len()) };
        if ret < 0 { neg_errno!() } else { ret as isize }
    }

    #[inline]
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    fn getdents(&self, _fd: i32, _buf: &mut [u8]) -> isize {
        -(libc::ENOSYS as isize)
    }

    #[inline]
    fn close(&self, fd: i32) -> isize {
        // SAFETY: closing a descriptor has no memory safety requirements
        if unsafe { libc::close(fd) } < 0 { neg_errno!() } else { 0 }
    }

    #[inline]
    fn mkdir(&self, path: &CStr, mode: u32) -> isize {
        // SAFETY: the path is NUL terminated
        if unsafe { libc::mkdir(path.as_ptr(), mode as libc::mode_t) } < 0 {
            neg_errno!()
        } else {
            0
        }
    }

    #[inline]
    fn rmdir(&self, path: &CStr) -> isize {
        // SAFETY: the path is NUL terminated
        if unsafe { libc::rmdir(path.as_ptr()) } < 0 { neg_errno!() } else { 0 }
    }

    fn stat(&self, path: &CStr, wanted: Wanted, info: &mut FileInfo) -> isize {
        let statted = if wanted.contains(Wanted::LINK) {
            stat_syscall!(lstat, path.as_ptr())
        } else {
            stat_syscall!(stat, path.as_ptr())
        };
        match statted {
            Ok(st) => {
                info.merge(FileInfo::from_stat(&st));
                0
            }
            Err(code) => code,
        }
    }
}
