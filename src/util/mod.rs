mod path;

pub use path::{PATH_SEPARATOR, canonicalize, join_child, remove_last_component};
