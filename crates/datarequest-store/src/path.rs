//! Helpers for slash-separated storage paths.

/// Join a child name onto a parent path.
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), name.trim_start_matches('/'))
    }
}

/// Parent collection of a path, if any.
pub fn parent(path: &str) -> Option<&str> {
    path.trim_end_matches('/').rsplit_once('/').map(|(parent, _)| parent)
}

/// Last component of a path.
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit_once('/').map(|(_, name)| name).unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_and_splits() {
        let path = join("/zone/home/requests/", "12");
        assert_eq!(path, "/zone/home/requests/12");
        assert_eq!(parent(&path), Some("/zone/home/requests"));
        assert_eq!(file_name(&path), "12");
        assert_eq!(file_name("plain"), "plain");
        assert_eq!(parent("plain"), None);
    }
}
