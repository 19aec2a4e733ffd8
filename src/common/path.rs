/// Ensure a path ends with a single trailing `/`.
///
/// The device's listing endpoint only answers for directory paths written
/// with a trailing separator.
pub fn ensure_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

/// Join a child name onto a parent directory path.
pub fn join_child(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Whether two paths name the same directory, tolerating exactly one
/// trailing `/` added or removed on either side.
pub fn paths_equivalent(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    if let Some(stripped) = a.strip_suffix('/') {
        if stripped == b {
            return true;
        }
    }
    if let Some(stripped) = b.strip_suffix('/') {
        if stripped == a {
            return true;
        }
    }
    false
}
