//! # dirshim
//!
//! Directory operations over a raw, buffer-oriented syscall surface that reports failure
//! as a negated errno.
//!
//! - [`DirHandle`]: enumerate a directory through a fixed buffer that `getdents` refills,
//!   optionally resolving metadata for each entry with [`DirHandle::read_with_stat`]
//! - [`make_recursive`]: `mkdir -p`, built from single raw mkdir calls
//! - [`canonicalize`] and [`remove_last_component`]: the path arithmetic both of them need
//! - [`Status`] / [`DirError`]: the one translation of raw return values
//!
//! The raw surface itself is the [`Syscalls`] trait. [`Kernel`] forwards to the host
//! through `libc`; [`MemFs`] is a deterministic in-memory tree with failure injection.
//!
//! ```
//! use dirshim::{DirHandle, MemFs, Mode, Wanted, make_recursive};
//!
//! let fs = MemFs::new();
//! make_recursive(&fs, "/srv/data", Mode::new(0o750)).unwrap();
//! fs.add_file(b"/srv/data/log", 64).unwrap();
//!
//! let mut dir = DirHandle::open(&fs, "/srv/data").unwrap();
//! let sizes: Vec<_> = dir
//!     .entries(Wanted::NAME | Wanted::SIZE)
//!     .map(|lookup| lookup.unwrap().into_info().size())
//!     .collect();
//! assert_eq!(sizes, [Some(0), Some(0), Some(64)]);
//! ```
#![allow(clippy::single_call_fn)]
#![allow(clippy::implicit_return)]
#![allow(clippy::missing_docs_in_private_items)]
#![allow(clippy::pub_use)]
#![allow(clippy::exhaustive_enums)]
#![allow(clippy::exhaustive_structs)]
#![allow(clippy::as_conversions)]
#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::question_mark_used)]
#![allow(clippy::min_ident_chars)]
#![allow(clippy::field_scoped_visibility_modifiers)]
#![allow(clippy::redundant_pub_crate)]
#![allow(clippy::std_instead_of_core)]
#![allow(clippy::std_instead_of_alloc)]
#![allow(clippy::cast_possible_wrap)]

#[macro_use]
pub(crate) mod macros;

mod config;
mod error;
pub mod fs;
mod memfs;
mod mkdir;
pub mod util;

pub use config::{Config, DEFAULT_LOG_LEVEL, LOG_ENV};
pub use error::{DirError, Result, Status, check};
pub use fs::{DirHandle, FileInfo, FileType, Kernel, Lookup, Syscalls, Wanted};
pub use memfs::MemFs;
pub use mkdir::{Mode, make, make_recursive, remove};
pub use util::{canonicalize, remove_last_component};
