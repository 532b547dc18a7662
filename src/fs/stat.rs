use crate::Status;
use crate::fs::FileType;
use chrono::{DateTime, Utc};
use core::fmt;
use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};
use std::ffi::{OsStr, OsString};

/**
 A set of metadata fields, used both as "what the caller wants" and "what is populated".

 The bit values are the classic `apr_finfo_t` ones, which is what scripts driving the
 shim already speak.

 # Examples
 ```
 use dirshim::fs::Wanted;

 let wanted = Wanted::NAME | Wanted::SIZE;
 assert!(wanted.contains(Wanted::SIZE));
 assert!(!wanted.contains(Wanted::MIN));
 assert_eq!(wanted.without(Wanted::NAME), Wanted::SIZE);
 ```
*/
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Wanted(u32);

impl Wanted {
    /// Not a field: asks stat not to follow a trailing symlink
    pub const LINK: Self = Self(0x0000_0001);
    pub const MTIME: Self = Self(0x0000_0010);
    pub const CTIME: Self = Self(0x0000_0020);
    pub const ATIME: Self = Self(0x0000_0040);
    pub const SIZE: Self = Self(0x0000_0100);
    /// Storage size consumed by the file
    pub const CSIZE: Self = Self(0x0000_0200);
    pub const DEV: Self = Self(0x0000_1000);
    pub const INODE: Self = Self(0x0000_2000);
    pub const NLINK: Self = Self(0x0000_4000);
    pub const TYPE: Self = Self(0x0000_8000);
    pub const USER: Self = Self(0x0001_0000);
    pub const GROUP: Self = Self(0x0002_0000);
    pub const UPROT: Self = Self(0x0010_0000);
    pub const GPROT: Self = Self(0x0020_0000);
    pub const WPROT: Self = Self(0x0040_0000);
    pub const NAME: Self = Self(0x0200_0000);

    pub const EMPTY: Self = Self(0);
    /// type, size and the three timestamps
    pub const MIN: Self = Self(0x0000_8170);
    pub const IDENT: Self = Self(0x0000_3000);
    pub const OWNER: Self = Self(0x0003_0000);
    pub const PROT: Self = Self(0x0070_0000);
    /// `MIN`, `IDENT`, `OWNER` and `PROT`; the link count is not part of it
    pub const NORM: Self = Self(0x0073_b170);

    const NAMED: [(Self, &'static str); 16] = [
        (Self::LINK, "LINK"),
        (Self::MTIME, "MTIME"),
        (Self::CTIME, "CTIME"),
        (Self::ATIME, "ATIME"),
        (Self::SIZE, "SIZE"),
        (Self::CSIZE, "CSIZE"),
        (Self::DEV, "DEV"),
        (Self::INODE, "INODE"),
        (Self::NLINK, "NLINK"),
        (Self::TYPE, "TYPE"),
        (Self::USER, "USER"),
        (Self::GROUP, "GROUP"),
        (Self::UPROT, "UPROT"),
        (Self::GPROT, "GPROT"),
        (Self::WPROT, "WPROT"),
        (Self::NAME, "NAME"),
    ];

    #[must_use]
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[must_use]
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `other` is set in `self`
    #[must_use]
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// `self | other`, usable in const context
    #[must_use]
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    #[inline]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    #[inline]
    pub const fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    #[inline]
    pub const fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Parses a comma separated list of field names, e.g. `"size,mtime,prot"`
    ///
    /// # Errors
    /// Returns the first name that is not a known field or field group.
    pub fn parse_list(list: &str) -> Result<Self, String> {
        let mut wanted = Self::EMPTY;
        for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let upper = part.to_ascii_uppercase();
            let field = match upper.as_str() {
                "MIN" => Self::MIN,
                "IDENT" => Self::IDENT,
                "OWNER" => Self::OWNER,
                "PROT" => Self::PROT,
                "NORM" => Self::NORM,
                name => Self::NAMED
                    .iter()
                    .find(|(_, n)| *n == name)
                    .map(|(f, _)| *f)
                    .ok_or_else(|| part.to_owned())?,
            };
            wanted |= field;
        }
        Ok(wanted)
    }
}

impl fmt::Debug for Wanted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "Wanted(EMPTY)");
        }
        let mut first = true;
        write!(f, "Wanted(")?;
        for (flag, name) in Self::NAMED {
            if self.contains(flag) {
                if !first {
                    write!(f, " | ")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        let unknown = self.without(Self(Self::NAMED.iter().fold(0, |acc, (w, _)| acc | w.0)));
        if !unknown.is_empty() {
            if !first {
                write!(f, " | ")?;
            }
            write!(f, "{:#x}", unknown.0)?;
        }
        write!(f, ")")
    }
}

impl BitOr for Wanted {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Wanted {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Wanted {
    type Output = Self;
    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for Wanted {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for Wanted {
    type Output = Self;
    #[inline]
    fn not(self) -> Self {
        Self(!self.0)
    }
}

/**
 Metadata about one directory member.

 Only fields whose bit is set in [`FileInfo::valid`] carry meaning; the getters return
 `None` for everything else, so a field a stat call could not resolve is never mistaken
 for a zero.
*/
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInfo {
    pub(crate) valid: Wanted,
    pub(crate) name: Option<OsString>,
    pub(crate) file_type: FileType,
    pub(crate) inode: u64,
    pub(crate) device: u64,
    pub(crate) nlink: u64,
    pub(crate) size: u64,
    pub(crate) csize: u64,
    pub(crate) mode: u32,
    pub(crate) uid: u32,
    pub(crate) gid: u32,
    pub(crate) atime: Option<DateTime<Utc>>,
    pub(crate) mtime: Option<DateTime<Utc>>,
    pub(crate) ctime: Option<DateTime<Utc>>,
}

macro_rules! valid_getter {
    ($(#[$meta:meta])* $name:ident: $t:ty => $flag:ident) => {
        $(#[$meta])*
        #[must_use]
        #[inline]
        pub const fn $name(&self) -> Option<$t> {
            if self.valid.contains(Wanted::$flag) {
                Some(self.$name)
            } else {
                None
            }
        }
    };
}

impl FileInfo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The set of populated fields
    #[must_use]
    #[inline]
    pub const fn valid(&self) -> Wanted {
        self.valid
    }

    #[must_use]
    #[inline]
    pub fn name(&self) -> Option<&OsStr> {
        self.name.as_deref().filter(|_| self.valid.contains(Wanted::NAME))
    }

    valid_getter!(inode: u64 => INODE);
    valid_getter!(file_type: FileType => TYPE);
    valid_getter!(device: u64 => DEV);
    valid_getter!(nlink: u64 => NLINK);
    valid_getter!(size: u64 => SIZE);
    valid_getter!(
        /// Bytes of storage the file occupies
        csize: u64 => CSIZE
    );
    valid_getter!(uid: u32 => USER);
    valid_getter!(gid: u32 => GROUP);

    /// Permission bits, present when all three protection groups were resolved
    #[must_use]
    #[inline]
    pub const fn mode(&self) -> Option<u32> {
        if self.valid.contains(Wanted::PROT) {
            Some(self.mode)
        } else {
            None
        }
    }

    #[must_use]
    #[inline]
    pub const fn accessed(&self) -> Option<DateTime<Utc>> {
        if self.valid.contains(Wanted::ATIME) { self.atime } else { None }
    }

    #[must_use]
    #[inline]
    pub const fn modified(&self) -> Option<DateTime<Utc>> {
        if self.valid.contains(Wanted::MTIME) { self.mtime } else { None }
    }

    #[must_use]
    #[inline]
    pub const fn changed(&self) -> Option<DateTime<Utc>> {
        if self.valid.contains(Wanted::CTIME) { self.ctime } else { None }
    }

    pub fn set_name<N: Into<OsString>>(&mut self, name: N) {
        self.name = Some(name.into());
        self.valid |= Wanted::NAME;
    }

    pub const fn set_inode(&mut self, inode: u64) {
        self.inode = inode;
        self.valid.insert(Wanted::INODE);
    }

    pub const fn set_file_type(&mut self, file_type: FileType) {
        self.file_type = file_type;
        self.valid.insert(Wanted::TYPE);
    }

    pub const fn set_device(&mut self, device: u64) {
        self.device = device;
        self.valid.insert(Wanted::DEV);
    }

    pub const fn set_nlink(&mut self, nlink: u64) {
        self.nlink = nlink;
        self.valid.insert(Wanted::NLINK);
    }

    pub const fn set_size(&mut self, size: u64) {
        self.size = size;
        self.valid.insert(Wanted::SIZE);
    }

    pub const fn set_csize(&mut self, csize: u64) {
        self.csize = csize;
        self.valid.insert(Wanted::CSIZE);
    }

    /// Sets the permission bits (`0o7777`), marking all three protection groups
    pub const fn set_mode(&mut self, mode: u32) {
        self.mode = mode & 0o7777;
        self.valid.insert(Wanted::PROT);
    }

    pub const fn set_owner(&mut self, uid: u32, gid: u32) {
        self.uid = uid;
        self.gid = gid;
        self.valid.insert(Wanted::OWNER);
    }

    /// Sets a timestamp from seconds and nanoseconds since the epoch.
    /// An unrepresentable instant leaves the field unset.
    pub fn set_time(&mut self, which: Wanted, secs: i64, nsecs: u32) {
        let Some(time) = DateTime::from_timestamp(secs, nsecs) else {
            return;
        };
        let slot = match which {
            Wanted::ATIME => &mut self.atime,
            Wanted::MTIME => &mut self.mtime,
            Wanted::CTIME => &mut self.ctime,
            _ => return,
        };
        *slot = Some(time);
        self.valid |= which;
    }

    /**
     Builds a `FileInfo` from a `libc::stat`, populating every field the structure answers.

     The timestamps are built with [`chrono::DateTime::from_timestamp`]; one that chrono cannot
     represent is left unset rather than invented, which is how a partial result arises.
    */
    #[must_use]
    #[expect(
        clippy::cast_sign_loss,
        clippy::cast_possible_truncation,
        clippy::useless_conversion,
        reason = "stat field widths differ across targets"
    )]
    pub fn from_stat(st: &libc::stat) -> Self {
        let mut info = Self::new();
        info.set_file_type(FileType::from_mode(st.st_mode));
        info.set_mode(st.st_mode as u32);
        info.set_owner(st.st_uid, st.st_gid);
        info.set_inode(st.st_ino as u64);
        info.set_device(st.st_dev as u64);
        info.set_nlink(st.st_nlink as u64);
        info.set_size(st.st_size.max(0) as u64);
        info.set_csize((st.st_blocks.max(0) as u64).saturating_mul(512));
        info.set_time(Wanted::ATIME, st.st_atime.into(), st.st_atime_nsec as u32);
        info.set_time(Wanted::MTIME, st.st_mtime.into(), st.st_mtime_nsec as u32);
        info.set_time(Wanted::CTIME, st.st_ctime.into(), st.st_ctime_nsec as u32);
        info
    }

    /// Copies every field valid in `other` into `self`
    pub fn merge(&mut self, other: Self) {
        let v = other.valid;
        if v.contains(Wanted::NAME) {
            self.name = other.name;
        }
        if v.contains(Wanted::INODE) {
            self.inode = other.inode;
        }
        if v.contains(Wanted::TYPE) {
            self.file_type = other.file_type;
        }
        if v.contains(Wanted::DEV) {
            self.device = other.device;
        }
        if v.contains(Wanted::NLINK) {
            self.nlink = other.nlink;
        }
        if v.contains(Wanted::SIZE) {
            self.size = other.size;
        }
        if v.contains(Wanted::CSIZE) {
            self.csize = other.csize;
        }
        if v.intersects(Wanted::PROT) {
            self.mode = other.mode;
        }
        if v.contains(Wanted::USER) {
            self.uid = other.uid;
        }
        if v.contains(Wanted::GROUP) {
            self.gid = other.gid;
        }
        if v.contains(Wanted::ATIME) {
            self.atime = other.atime;
        }
        if v.contains(Wanted::MTIME) {
            self.mtime = other.mtime;
        }
        if v.contains(Wanted::CTIME) {
            self.ctime = other.ctime;
        }
        self.valid |= v;
    }

    /// Fields of `wanted` that are still missing, ignoring the `LINK` modifier
    #[must_use]
    #[inline]
    pub const fn missing(&self, wanted: Wanted) -> Wanted {
        wanted.without(Wanted::LINK).without(self.valid)
    }
}

/// The outcome of reading one entry with metadata.
///
/// Both variants are successful reads; `Incomplete` means some wanted field could not be
/// resolved, not that enumeration failed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Lookup {
    Complete(FileInfo),
    Incomplete(FileInfo),
}

impl Lookup {
    /// Classifies `info` against the fields the caller originally asked for
    pub fn classify(info: FileInfo, wanted: Wanted) -> Self {
        if info.missing(wanted).is_empty() {
            Self::Complete(info)
        } else {
            Self::Incomplete(info)
        }
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::Complete(_) => Status::Success,
            Self::Incomplete(_) => Status::Incomplete,
        }
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    #[must_use]
    pub const fn info(&self) -> &FileInfo {
        match self {
            Self::Complete(info) | Self::Incomplete(info) => info,
        }
    }

    #[must_use]
    pub fn into_info(self) -> FileInfo {
        match self {
            Self::Complete(info) | Self::Incomplete(info) => info,
        }
    }
}
