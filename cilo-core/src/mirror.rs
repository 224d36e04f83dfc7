//! Registry mirror handling

/// Strip the first matching mirror prefix from an image reference
///
/// A mirror matches when the image starts with the prefix followed by `/`.
/// Prefixes are tried in order; a trailing `/` on a prefix is ignored.
/// An image matching no prefix is returned unchanged.
pub fn strip_mirror<'a, S: AsRef<str>>(image: &'a str, mirrors: &[S]) -> &'a str {
    for mirror in mirrors {
        let prefix = mirror.as_ref().trim_end_matches('/');
        if prefix.is_empty() {
            continue;
        }

        if let Some(rest) = image
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('/'))
        {
            return rest;
        }
    }

    image
}
