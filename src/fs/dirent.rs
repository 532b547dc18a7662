/*!
 Decoding of `linux_dirent64` records out of a getdents buffer.

 The layout is fixed by the kernel ABI (native endianness):

 ```text
 offset 0   d_ino     u64
 offset 8   d_off     i64
 offset 16  d_reclen  u16   total record length, header + name + padding
 offset 18  d_type    u8
 offset 19  d_name    NUL terminated, padded so records stay 8 byte aligned
 ```

 Records are read field by field from byte slices rather than by casting the buffer to a
 struct, so nothing here depends on the buffer's alignment.
*/
use crate::DirError;
use crate::fs::FileType;
use crate::fs::Result;
use core::ffi::CStr;

const INO_OFFSET: usize = 0;
const OFF_OFFSET: usize = 8;
const RECLEN_OFFSET: usize = 16;
const TYPE_OFFSET: usize = 18;
/// Offset of `d_name`, also the size of the fixed header
pub const NAME_OFFSET: usize = 19;
/// Smallest legal record: header, a one byte name and its NUL, rounded to 8
pub const MINIMUM_DIRENT_SIZE: usize = (NAME_OFFSET + 2).next_multiple_of(8);

crate::const_assert!(
    MINIMUM_DIRENT_SIZE == 24,
    "minimum dirent size isnt 24, the record layout constants are wrong"
);

/// Inode values that mean "the filesystem did not tell us"
pub const UNKNOWN_INODES: [u64; 2] = [0, u64::MAX];

/**
 One decoded directory record, borrowing its name from the buffer it was decoded from.

 A `RawEntry` cannot outlive the borrow of the buffer that holds it, so it is impossible to
 keep one across a refill of the owning [`crate::DirHandle`].
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEntry<'buf> {
    pub(crate) inode: u64,
    pub(crate) record_length: usize,
    pub(crate) entry_type: FileType,
    pub(crate) name: &'buf CStr,
}

#[inline]
fn read_array<const N: usize>(bytes: &[u8], at: usize) -> Option<[u8; N]> {
    bytes.get(at..at + N)?.try_into().ok()
}

impl<'buf> RawEntry<'buf> {
    /**
     Decodes the record starting at `offset` within `bytes`.

     `bytes` must be exactly the valid region of the buffer, so that a `d_reclen` running past
     what the kernel wrote is caught.

     # Errors
     [`DirError::Malformed`] when the header does not fit, `d_reclen` is shorter than the
     header or runs past `bytes`, or the name has no NUL inside the record.
    */
    pub fn decode(bytes: &'buf [u8], offset: usize) -> Result<Self> {
        let malformed = DirError::Malformed { offset };
        let record = bytes.get(offset..).ok_or(malformed)?;

        let inode = read_array::<8>(record, INO_OFFSET)
            .map(u64::from_ne_bytes)
            .ok_or(malformed)?;
        let record_length = read_array::<2>(record, RECLEN_OFFSET)
            .map(u16::from_ne_bytes)
            .ok_or(malformed)? as usize;
        let d_type = *record.get(TYPE_OFFSET).ok_or(malformed)?;

        if record_length <= NAME_OFFSET || record_length > record.len() {
            return Err(malformed);
        }

        // the name may only be searched for inside this record, never the next one
        let name = CStr::from_bytes_until_nul(&record[NAME_OFFSET..record_length])
            .map_err(|_| malformed)?;

        Ok(Self {
            inode,
            record_length,
            entry_type: FileType::from_dtype(d_type),
            name,
        })
    }

    #[must_use]
    #[inline]
    pub const fn inode(&self) -> u64 {
        self.inode
    }

    /// False for the sentinel inodes `0` and `u64::MAX`
    #[must_use]
    #[inline]
    pub const fn inode_known(&self) -> bool {
        self.inode != UNKNOWN_INODES[0] && self.inode != UNKNOWN_INODES[1]
    }

    #[must_use]
    #[inline]
    pub const fn record_length(&self) -> usize {
        self.record_length
    }

    #[must_use]
    #[inline]
    pub const fn entry_type(&self) -> FileType {
        self.entry_type
    }

    #[must_use]
    #[inline]
    pub const fn name(&self) -> &'buf CStr {
        self.name
    }

    #[must_use]
    #[inline]
    pub const fn name_bytes(&self) -> &'buf [u8] {
        self.name.to_bytes()
    }
}

/// True for the `.` and `..` members every directory lists
#[must_use]
#[inline]
pub fn is_dot_or_dot_dot(name: &[u8]) -> bool {
    matches!(name, b"." | b"..")
}

/// The padded length of a record holding `name_len` bytes of name
#[must_use]
#[inline]
pub const fn record_size(name_len: usize) -> usize {
    (NAME_OFFSET + name_len + 1).next_multiple_of(8)
}

/**
 Writes one record in the kernel layout at the front of `buf`.

 Returns the record length, or `None` when the record does not fit, the name contains a
 NUL, or the record would be longer than `d_reclen` can express.

 # Examples
 ```
 use dirshim::fs::{FileType, RawEntry, encode_record};

 let mut buf = [0u8; 64];
 let len = encode_record(&mut buf, 42, 1, FileType::Directory, b"subdir").unwrap();
 let entry = RawEntry::decode(&buf[..len], 0).unwrap();
 assert_eq!(entry.name_bytes(), b"subdir");
 assert_eq!(entry.inode(), 42);
 assert_eq!(entry.record_length(), len);
 ```
*/
#[must_use]
pub fn encode_record(
    buf: &mut [u8],
    inode: u64,
    offset: i64,
    file_type: FileType,
    name: &[u8],
) -> Option<usize> {
    let reclen = record_size(name.len());
    if reclen > buf.len() || name.contains(&0) {
        return None;
    }
    let reclen_field = u16::try_from(reclen).ok()?;
    let record = &mut buf[..reclen];
    record.fill(0);
    record[INO_OFFSET..OFF_OFFSET].copy_from_slice(&inode.to_ne_bytes());
    record[OFF_OFFSET..RECLEN_OFFSET].copy_from_slice(&offset.to_ne_bytes());
    record[RECLEN_OFFSET..TYPE_OFFSET].copy_from_slice(&reclen_field.to_ne_bytes());
    record[TYPE_OFFSET] = file_type.to_dtype();
    record[NAME_OFFSET..NAME_OFFSET + name.len()].copy_from_slice(name);
    Some(reclen)
}
