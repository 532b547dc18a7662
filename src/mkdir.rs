/*!
 Directory creation and removal on top of the raw interface.

 [`make`] and [`remove`] are single raw calls. [`make_recursive`] adds `mkdir -p`
 behaviour: an existing directory counts as success, and a missing parent is created
 first, walking up one component at a time.
*/
use crate::fs::{Result, Syscalls};
use crate::util::remove_last_component;
use crate::{DirError, check};
use core::fmt;
use std::ffi::{CString, OsStr};
use std::os::unix::ffi::OsStrExt as _;

/// Permission bits handed to the raw mkdir, passed through untouched apart from masking
/// to `0o7777`. The kernel still applies the umask.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Mode(u32);

impl Mode {
    /// `rwxrwxrwx`, the usual request for directories
    pub const DIR_DEFAULT: Self = Self(0o777);

    #[must_use]
    #[inline]
    pub const fn new(bits: u32) -> Self {
        Self(bits & 0o7777)
    }

    #[must_use]
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Parses an octal mode such as `"755"` or `"0700"`
    ///
    /// # Errors
    /// A message when the text is not octal or does not fit in `0o7777`.
    pub fn parse_octal(text: &str) -> core::result::Result<Self, String> {
        let bits = u32::from_str_radix(text.trim_start_matches("0o"), 8)
            .map_err(|e| format!("invalid octal mode {text:?}: {e}"))?;
        if bits > 0o7777 {
            return Err(format!("mode {text:?} is larger than 7777"));
        }
        Ok(Self(bits))
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self::DIR_DEFAULT
    }
}

impl fmt::Debug for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mode({:#o})", self.0)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

impl From<u32> for Mode {
    fn from(bits: u32) -> Self {
        Self::new(bits)
    }
}

fn c_path(path: &[u8]) -> Result<CString> {
    CString::new(path).map_err(|_| DirError::InvalidArgument)
}

/**
 Creates one directory with a single raw mkdir. No retries, no parent creation.

 # Errors
 The translated raw error, e.g. [`DirError::AlreadyExists`] or [`DirError::NoSuchEntry`]
 for a missing parent; [`DirError::InvalidArgument`] for a path containing NUL.
*/
pub fn make<S, P>(sys: &S, path: P, mode: Mode) -> Result<()>
where
    S: Syscalls + ?Sized,
    P: AsRef<OsStr>,
{
    let c = c_path(path.as_ref().as_bytes())?;
    check(sys.mkdir(&c, mode.bits())).map(drop)
}

/**
 Creates `path` and any missing parents.

 - `AlreadyExists` from the first attempt is success, so calling this twice is harmless.
 - `NoSuchEntry` means a parent is missing: the parent is created recursively and the
   original mkdir retried once. When there is no parent left to strip, the `NoSuchEntry`
   is returned instead of recursing further.
 - Every other error is returned immediately.

 Each level of recursion removes one component, so the depth is bounded by the number of
 components in `path`.

 # Errors
 See above; errors from parent creation are returned as they are.

 # Examples
 ```
 use dirshim::{MemFs, Mode, make_recursive};

 let fs = MemFs::new();
 make_recursive(&fs, "/x/y/z", Mode::new(0o700)).unwrap();
 assert_eq!(fs.created(), [b"/x".to_vec(), b"/x/y".to_vec(), b"/x/y/z".to_vec()]);

 make_recursive(&fs, "/x/y/z", Mode::new(0o700)).unwrap();
 assert_eq!(fs.created().len(), 3);
 ```
*/
pub fn make_recursive<S, P>(sys: &S, path: P, mode: Mode) -> Result<()>
where
    S: Syscalls + ?Sized,
    P: AsRef<OsStr>,
{
    make_recursive_bytes(sys, path.as_ref().as_bytes(), mode)
}

fn make_recursive_bytes<S: Syscalls + ?Sized>(sys: &S, path: &[u8], mode: Mode) -> Result<()> {
    let c = c_path(path)?;
    match check(sys.mkdir(&c, mode.bits())) {
        Ok(_) | Err(DirError::AlreadyExists) => Ok(()),
        Err(DirError::NoSuchEntry) => {
            let parent = remove_last_component(path);
            if parent.is_empty() {
                log::debug!("no parent left above {}", c.to_string_lossy());
                return Err(DirError::NoSuchEntry);
            }
            log::trace!(
                "{} is missing a parent, creating {} first",
                c.to_string_lossy(),
                String::from_utf8_lossy(&parent)
            );
            make_recursive_bytes(sys, &parent, mode)?;
            check(sys.mkdir(&c, mode.bits())).map(drop)
        }
        Err(e) => Err(e),
    }
}

/**
 Removes one empty directory with a single raw rmdir.

 # Errors
 The translated raw error, e.g. [`DirError::NoSuchEntry`] or
 `DirError::Os(ENOTEMPTY)`.
*/
pub fn remove<S, P>(sys: &S, path: P) -> Result<()>
where
    S: Syscalls + ?Sized,
    P: AsRef<OsStr>,
{
    let c = c_path(path.as_ref().as_bytes())?;
    check(sys.rmdir(&c)).map(drop)
}
