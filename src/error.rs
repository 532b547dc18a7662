use libc::{EEXIST, EINVAL, EIO, ENOENT};
use std::{fmt, io};

/**
 The portable status of an operation, independent of the raw interface's numeric error space.

 Every raw primitive reports either a non-negative success value or a negated errno.
 [`Status::from_raw`] is the one place that convention is interpreted; nothing above this
 module ever sees a negative return value.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    InvalidArgument,
    NoSuchEntry,
    AlreadyExists,
    /// Produced only by stat augmentation, never by a raw call
    Incomplete,
    GenericFailure(i32),
}

impl Status {
    /// Translates a raw return value (`>= 0` success, `< 0` negated errno).
    #[must_use]
    #[inline]
    pub const fn from_raw(ret: isize) -> Self {
        if ret >= 0 {
            return Self::Success;
        }
        Self::from_errno(errno_of(ret))
    }

    /// Maps a positive errno onto the portable taxonomy
    #[must_use]
    #[inline]
    pub const fn from_errno(code: i32) -> Self {
        match code {
            0 => Self::Success,
            EINVAL => Self::InvalidArgument,
            ENOENT => Self::NoSuchEntry,
            EEXIST => Self::AlreadyExists,
            other => Self::GenericFailure(other),
        }
    }

}

/// The errno carried by a negative raw result. A magnitude no errno can have is `EIO`.
#[inline]
#[expect(clippy::cast_possible_truncation, reason = "range checked above")]
const fn errno_of(ret: isize) -> i32 {
    let magnitude = ret.unsigned_abs();
    if magnitude == 0 || magnitude > i32::MAX as usize {
        EIO
    } else {
        magnitude as i32
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::NoSuchEntry => write!(f, "no such file or directory"),
            Self::AlreadyExists => write!(f, "already exists"),
            Self::Incomplete => write!(f, "incomplete metadata"),
            Self::GenericFailure(code) => write!(f, "os error {code}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The error side of every fallible operation in this crate.
///
/// `Incomplete` has no counterpart here: partial metadata is a successful read,
/// see [`crate::Lookup`].
pub enum DirError {
    InvalidArgument,
    NoSuchEntry,
    AlreadyExists,
    /// `open` failed. Reported as [`Status::InvalidArgument`] but the kernel's reason is kept.
    Open { code: i32 },
    /// A directory record in the getdents buffer did not fit the ABI layout
    Malformed { offset: usize },
    Os(i32),
}

impl DirError {
    /// Builds the error for a negated errno; returns `None` for non-negative values.
    #[must_use]
    #[inline]
    pub const fn from_raw(ret: isize) -> Option<Self> {
        if ret >= 0 {
            return None;
        }
        Some(Self::from_errno(errno_of(ret)))
    }

    #[must_use]
    #[inline]
    pub const fn from_errno(code: i32) -> Self {
        match Status::from_errno(code) {
            Status::InvalidArgument => Self::InvalidArgument,
            Status::NoSuchEntry => Self::NoSuchEntry,
            Status::AlreadyExists => Self::AlreadyExists,
            Status::GenericFailure(other) => Self::Os(other),
            // errno 0 from a negative return is not something a kernel produces
            Status::Success | Status::Incomplete => Self::Os(EIO),
        }
    }

    /// Projects this error onto the portable status taxonomy.
    #[must_use]
    #[inline]
    pub const fn status(&self) -> Status {
        match *self {
            Self::InvalidArgument | Self::Open { .. } => Status::InvalidArgument,
            Self::NoSuchEntry => Status::NoSuchEntry,
            Self::AlreadyExists => Status::AlreadyExists,
            Self::Malformed { .. } => Status::GenericFailure(EIO),
            Self::Os(code) => Status::GenericFailure(code),
        }
    }

    /// The kernel error code behind this error, where there is one
    #[must_use]
    #[inline]
    pub const fn raw_os_error(&self) -> Option<i32> {
        match *self {
            Self::InvalidArgument => Some(EINVAL),
            Self::NoSuchEntry => Some(ENOENT),
            Self::AlreadyExists => Some(EEXIST),
            Self::Open { code } | Self::Os(code) => Some(code),
            Self::Malformed { .. } => None,
        }
    }
}

/// Converts a raw return value into a `Result`, the single translation point for the
/// negative-errno convention.
///
/// # Errors
/// Returns the translated [`DirError`] when `ret` is negative.
#[inline]
#[expect(clippy::cast_sign_loss, reason = "checked non-negative")]
pub const fn check(ret: isize) -> Result<usize> {
    match DirError::from_raw(ret) {
        Some(err) => Err(err),
        None => Ok(ret as usize),
    }
}

///Generic result type for directory operations
pub type Result<T> = core::result::Result<T, DirError>;

impl fmt::Display for DirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "Invalid argument"),
            Self::NoSuchEntry => write!(f, "No such file or directory"),
            Self::AlreadyExists => write!(f, "Already exists"),
            Self::Open { code } => write!(
                f,
                "Failed to open directory: {}",
                io::Error::from_raw_os_error(*code)
            ),
            Self::Malformed { offset } => {
                write!(f, "Malformed directory record at buffer offset {offset}")
            }
            Self::Os(code) => write!(f, "OS error: {}", io::Error::from_raw_os_error(*code)),
        }
    }
}

impl std::error::Error for DirError {}

impl From<DirError> for io::Error {
    fn from(error: DirError) -> Self {
        match error.raw_os_error() {
            Some(code) => Self::from_raw_os_error(code),
            None => Self::new(io::ErrorKind::InvalidData, error),
        }
    }
}

impl From<Result<()>> for Status {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(e) => e.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_negative_is_success() {
        assert_eq!(Status::from_raw(0), Status::Success);
        assert_eq!(Status::from_raw(17), Status::Success);
        assert_eq!(check(42), Ok(42));
    }

    #[test]
    fn known_codes_map() {
        assert_eq!(Status::from_raw(-(EINVAL as isize)), Status::InvalidArgument);
        assert_eq!(Status::from_raw(-(ENOENT as isize)), Status::NoSuchEntry);
        assert_eq!(Status::from_raw(-(EEXIST as isize)), Status::AlreadyExists);
        assert_eq!(check(-(ENOENT as isize)), Err(DirError::NoSuchEntry));
    }

    #[test]
    fn unknown_codes_pass_through() {
        let code = libc::ENOTEMPTY;
        assert_eq!(Status::from_raw(-(code as isize)), Status::GenericFailure(code));
        let err = DirError::from_raw(-(code as isize)).unwrap();
        assert_eq!(err, DirError::Os(code));
        assert_eq!(err.status(), Status::GenericFailure(code));
        assert_eq!(err.raw_os_error(), Some(code));
    }

    #[test]
    fn raw_never_yields_incomplete() {
        for ret in -200..=1 {
            assert_ne!(Status::from_raw(ret), Status::Incomplete);
        }
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn oversized_negative_results_never_read_as_success() {
        // these truncate to 0 and ENOENT as a 32 bit value
        for ret in [-(1_isize << 32), -(1_isize << 32) - 2, isize::MIN, -(i32::MAX as isize) - 1] {
            assert_eq!(Status::from_raw(ret), Status::GenericFailure(EIO));
            assert_eq!(DirError::from_raw(ret), Some(DirError::Os(EIO)));
            assert_eq!(check(ret), Err(DirError::Os(EIO)));
        }
        assert_eq!(Status::from_raw(-(i32::MAX as isize)), Status::GenericFailure(i32::MAX));
    }

    #[test]
    fn open_keeps_cause_but_reports_invalid_argument() {
        let err = DirError::Open { code: libc::EACCES };
        assert_eq!(err.status(), Status::InvalidArgument);
        assert_eq!(err.raw_os_error(), Some(libc::EACCES));
        let io_err: io::Error = err.into();
        assert_eq!(io_err.raw_os_error(), Some(libc::EACCES));
    }

    #[test]
    fn result_projects_to_status() {
        assert_eq!(Status::from(Ok(())), Status::Success);
        assert_eq!(Status::from(Err(DirError::AlreadyExists)), Status::AlreadyExists);
    }
}
