pub use crate::error::Result;

/// A descriptor handed out by the raw `open`, owned by exactly one handle
#[derive(Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct FileDes(pub(crate) i32);

impl FileDes {
    /// Returns the raw descriptor number.
    #[must_use]
    #[inline]
    pub const fn as_raw(&self) -> i32 {
        self.0
    }
}
