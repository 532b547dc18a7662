use libc::{
    DT_BLK, DT_CHR, DT_DIR, DT_FIFO, DT_LNK, DT_REG, DT_SOCK, DT_UNKNOWN, S_IFBLK, S_IFCHR,
    S_IFDIR, S_IFIFO, S_IFLNK, S_IFMT, S_IFREG, S_IFSOCK, mode_t,
};

/// Represents the type of a directory member, as tagged in its getdents record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum FileType {
    BlockDevice,
    CharDevice,
    Directory,
    Fifo,
    Symlink,
    RegularFile,
    Socket,
    /// The filesystem did not fill in `d_type`
    #[default]
    Unknown,
}

impl FileType {
    /// Converts a `d_type` tag to a `FileType`
    #[must_use]
    #[inline]
    pub const fn from_dtype(d_type: u8) -> Self {
        match d_type {
            DT_DIR => Self::Directory,
            DT_REG => Self::RegularFile,
            DT_BLK => Self::BlockDevice,
            DT_CHR => Self::CharDevice,
            DT_FIFO => Self::Fifo,
            DT_LNK => Self::Symlink,
            DT_SOCK => Self::Socket,
            _ => Self::Unknown,
        }
    }

    /// The `d_type` tag for this type, used when writing records
    #[must_use]
    #[inline]
    pub const fn to_dtype(self) -> u8 {
        match self {
            Self::Directory => DT_DIR,
            Self::RegularFile => DT_REG,
            Self::BlockDevice => DT_BLK,
            Self::CharDevice => DT_CHR,
            Self::Fifo => DT_FIFO,
            Self::Symlink => DT_LNK,
            Self::Socket => DT_SOCK,
            Self::Unknown => DT_UNKNOWN,
        }
    }

    /// Converts the `S_IFMT` bits of a `st_mode`
    #[must_use]
    #[inline]
    pub const fn from_mode(mode: mode_t) -> Self {
        match mode & S_IFMT {
            S_IFREG => Self::RegularFile,
            S_IFDIR => Self::Directory,
            S_IFBLK => Self::BlockDevice,
            S_IFCHR => Self::CharDevice,
            S_IFIFO => Self::Fifo,
            S_IFLNK => Self::Symlink,
            S_IFSOCK => Self::Socket,
            _ => Self::Unknown,
        }
    }

    /// The `S_IFMT` bits for this type (0 for unknown)
    #[must_use]
    #[inline]
    pub const fn to_mode(self) -> mode_t {
        match self {
            Self::RegularFile => S_IFREG,
            Self::Directory => S_IFDIR,
            Self::BlockDevice => S_IFBLK,
            Self::CharDevice => S_IFCHR,
            Self::Fifo => S_IFIFO,
            Self::Symlink => S_IFLNK,
            Self::Socket => S_IFSOCK,
            Self::Unknown => 0,
        }
    }

    #[must_use]
    #[inline]
    pub const fn is_dir(self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Single letter used by `dirshim ls -l`
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Directory => 'd',
            Self::RegularFile => '-',
            Self::Symlink => 'l',
            Self::BlockDevice => 'b',
            Self::CharDevice => 'c',
            Self::Fifo => 'p',
            Self::Socket => 's',
            Self::Unknown => '?',
        }
    }
}

impl core::fmt::Display for FileType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BlockDevice => write!(f, "Block device"),
            Self::CharDevice => write!(f, "Character device"),
            Self::Directory => write!(f, "Directory"),
            Self::Fifo => write!(f, "FIFO"),
            Self::Symlink => write!(f, "Symlink"),
            Self::RegularFile => write!(f, "Regular file"),
            Self::Socket => write!(f, "Socket"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}
