use crate::fs::Syscalls;
use core::ops::{Index, IndexMut};
use core::slice::SliceIndex;

/**
 A fixed-capacity, 8-byte aligned buffer that getdents writes directory records into.

 Unlike a scratch buffer this one is zero-initialised up front, so every byte is always
 readable and decoding can work on plain slices with ordinary bounds checks. Only the
 prefix reported by the last fill holds meaningful records.

 # Type Parameters
 - `SIZE`: The fixed capacity of the buffer in bytes

 # Examples
 ```
 use dirshim::fs::AlignedBuffer;

 let mut buffer = AlignedBuffer::<1024>::new();
 buffer[..5].copy_from_slice(b"hello");
 assert_eq!(&buffer[..5], b"hello");
 assert_eq!(buffer.max_capacity(), 1024);
 assert!((buffer.as_ptr() as usize) % 8 == 0, "We expect the buffer to be aligned to 8 bytes");
 ```
*/
#[derive(Debug, Clone)]
#[repr(C, align(8))]
pub struct AlignedBuffer<const SIZE: usize> {
    pub(crate) data: [u8; SIZE],
}

impl<const SIZE: usize, Idx> Index<Idx> for AlignedBuffer<SIZE>
where
    Idx: SliceIndex<[u8]>,
{
    type Output = Idx::Output;

    #[inline]
    fn index(&self, index: Idx) -> &Self::Output {
        &self.data[index]
    }
}

impl<const SIZE: usize, Idx> IndexMut<Idx> for AlignedBuffer<SIZE>
where
    Idx: SliceIndex<[u8]>,
{
    #[inline]
    fn index_mut(&mut self, index: Idx) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl<const SIZE: usize> Default for AlignedBuffer<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SIZE: usize> AlignedBuffer<SIZE> {
    /// Creates a new zeroed buffer
    #[must_use]
    #[inline]
    pub const fn new() -> Self {
        Self { data: [0; SIZE] }
    }

    /// Creates a new zeroed buffer directly on the heap
    #[must_use]
    #[inline]
    pub fn boxed() -> Box<Self> {
        Box::new(Self::new())
    }

    #[must_use]
    #[inline]
    pub const fn max_capacity(&self) -> usize {
        SIZE
    }

    #[must_use]
    #[inline]
    pub const fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    /// Runs one raw getdents into the whole buffer, returning the raw result untouched
    #[inline]
    pub fn fill<S: Syscalls + ?Sized>(&mut self, sys: &S, fd: i32) -> isize {
        sys.getdents(fd, &mut self.data)
    }
}
