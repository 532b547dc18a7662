use std::borrow::Cow;

/// The only separator the raw interface understands
pub const PATH_SEPARATOR: u8 = b'/';

/**
 Strips every trailing separator from `path`.

 When nothing needs trimming the input slice itself comes back (`Cow::Borrowed`, same
 pointer, no allocation); otherwise a trimmed copy is returned. Callers must not rely on
 either case for mutation.

 Note that `"/"` canonicalises to the empty path.

 # Examples
 ```
 use dirshim::util::canonicalize;
 use std::borrow::Cow;

 assert_eq!(&*canonicalize(b"/a/b///"), b"/a/b");

 let path: &[u8] = b"/a/b";
 assert!(matches!(canonicalize(path), Cow::Borrowed(p) if core::ptr::eq(p, path)));
 ```
*/
#[must_use]
pub fn canonicalize(path: &[u8]) -> Cow<'_, [u8]> {
    let len = path
        .iter()
        .rposition(|&b| b != PATH_SEPARATOR)
        .map_or(0, |last| last + 1);

    if len == path.len() {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(path[..len].to_vec())
    }
}

/**
 Removes the last component of `path` (after canonicalising it).

 Returns everything strictly before the last separator, or the empty path when there is no
 separator left, which is the signal that there is no parent to ascend to.

 # Examples
 ```
 use dirshim::util::remove_last_component;

 assert_eq!(&*remove_last_component(b"/a/b"), b"/a");
 assert_eq!(&*remove_last_component(b"/a/b//"), b"/a");
 assert_eq!(&*remove_last_component(b"a"), b"");
 assert_eq!(&*remove_last_component(b"/a"), b"");
 ```
*/
#[must_use]
pub fn remove_last_component(path: &[u8]) -> Cow<'_, [u8]> {
    let canonical = canonicalize(path);
    let cut = canonical
        .iter()
        .rposition(|&b| b == PATH_SEPARATOR)
        .unwrap_or(0);

    match canonical {
        Cow::Borrowed(p) => Cow::Borrowed(&p[..cut]),
        Cow::Owned(mut p) => {
            p.truncate(cut);
            Cow::Owned(p)
        }
    }
}

/**
 Builds the NUL terminated path `dir/name`, inserting a separator only when `dir` does
 not already end in one.

 Returns `None` when the result, terminator included, would exceed `max_len` bytes. The
 child path is never truncated: a truncated path names a different file.
*/
#[must_use]
pub fn join_child(dir: &[u8], name: &[u8], max_len: usize) -> Option<Vec<u8>> {
    let needs_slash = !dir.is_empty() && !dir.ends_with(&[PATH_SEPARATOR]);
    let total = dir.len() + usize::from(needs_slash) + name.len() + 1;
    if total > max_len {
        return None;
    }
    let mut full = Vec::with_capacity(total);
    full.extend_from_slice(dir);
    if needs_slash {
        full.push(PATH_SEPARATOR);
    }
    full.extend_from_slice(name);
    full.push(0);
    Some(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_trims_only_trailing() {
        assert_eq!(&*canonicalize(b"/a/b///"), b"/a/b");
        assert_eq!(&*canonicalize(b"//a//b"), b"//a//b");
        assert_eq!(&*canonicalize(b"/"), b"");
        assert_eq!(&*canonicalize(b"////"), b"");
        assert_eq!(&*canonicalize(b""), b"");
    }

    #[test]
    fn canonicalize_shares_untouched_input() {
        let path: &[u8] = b"/a/b";
        match canonicalize(path) {
            Cow::Borrowed(p) => assert!(core::ptr::eq(p, path)),
            Cow::Owned(_) => panic!("nothing to trim, expected the input back"),
        }
        assert!(matches!(canonicalize(b"/a/b/"), Cow::Owned(_)));
        assert!(matches!(canonicalize(b""), Cow::Borrowed(_)));
    }

    #[test]
    fn remove_last_component_walks_up() {
        assert_eq!(&*remove_last_component(b"/a/b"), b"/a");
        assert_eq!(&*remove_last_component(b"/a/b/c/"), b"/a/b");
        assert_eq!(&*remove_last_component(b"a/b"), b"a");
        assert_eq!(&*remove_last_component(b"a"), b"");
        assert_eq!(&*remove_last_component(b"/a"), b"");
        assert_eq!(&*remove_last_component(b"/"), b"");
        assert_eq!(&*remove_last_component(b""), b"");
    }

    #[test]
    fn remove_last_component_strictly_shortens() {
        let mut path: Vec<u8> = b"/x/y/z/w".to_vec();
        let mut steps = 0;
        while !path.is_empty() {
            let parent = remove_last_component(&path).into_owned();
            assert!(parent.len() < path.len());
            path = parent;
            steps += 1;
        }
        assert_eq!(steps, 4);
    }

    #[test]
    fn join_child_handles_separators_and_limits() {
        assert_eq!(join_child(b"/tmp", b"f", 64).unwrap(), b"/tmp/f\0");
        assert_eq!(join_child(b"/", b"f", 64).unwrap(), b"/f\0");
        assert_eq!(join_child(b"/tmp/", b"f", 64).unwrap(), b"/tmp/f\0");
        assert_eq!(join_child(b"", b"f", 64).unwrap(), b"f\0");
        // "/tmp/f\0" is 7 bytes
        assert!(join_child(b"/tmp", b"f", 7).is_some());
        assert!(join_child(b"/tmp", b"f", 6).is_none());
    }
}
