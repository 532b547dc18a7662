mod buffer;
mod dirent;
mod file_type;
mod handle;
mod raw;
mod stat;
mod types;

pub use buffer::AlignedBuffer;
pub use dirent::{
    MINIMUM_DIRENT_SIZE, NAME_OFFSET, RawEntry, encode_record, is_dot_or_dot_dot, record_size,
};
pub use file_type::FileType;
pub use handle::{DirHandle, Entries};
pub use raw::{Kernel, OPEN_DIRECTORY_FLAGS, Syscalls};
pub use stat::{FileInfo, Lookup, Wanted};
pub use types::{FileDes, Result};

const_from_env!(
    /// Bytes requested from each getdents call, `DIRSHIM_BUFFER_SIZE` at build time to override
    BUFFER_SIZE: usize = "DIRSHIM_BUFFER_SIZE", 4096
);

const_from_env!(
    /// Longest child path (terminator included) built for stat, `DIRSHIM_PATH_MAX` to override
    PATH_MAX: usize = "DIRSHIM_PATH_MAX", 4096
);

const_assert!(BUFFER_SIZE >= 4096, "Buffer size too small!");
const_assert!(BUFFER_SIZE % 8 == 0, "Buffer size must keep records 8 byte aligned");
const_assert!(PATH_MAX > 255, "PATH_MAX must hold at least one full name");
