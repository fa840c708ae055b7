//! Small path and argument helpers shared by the CLI and indexer
//! (spec.md §4.6, §4.7 driver code; grounded on `dn42/utils.py`).

use std::path::{Path, PathBuf};

/// Strips `prefix` from `text` if present, else returns `text` unchanged.
pub fn remove_prefix<'a>(text: &'a str, prefix: &str) -> &'a str {
    text.strip_prefix(prefix).unwrap_or(text)
}

/// Splits `args` into its head and the remaining tail.
pub fn shift(args: &[String]) -> (Option<&str>, &[String]) {
    match args.split_first() {
        Some((head, tail)) => (Some(head.as_str()), tail),
        None => (None, &[]),
    }
}

/// Walks upward from `path` looking for a `.rpsl` sidecar directory,
/// returning the registry root if one is found.
pub fn find_rpsl(path: &Path) -> Option<PathBuf> {
    let mut current = std::fs::canonicalize(path).ok()?;

    loop {
        if current.join(".rpsl").exists() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
        if current.as_os_str().is_empty() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_prefix_strips_known_prefix() {
        assert_eq!(remove_prefix("/reg/inetnum/foo", "/reg/"), "inetnum/foo");
        assert_eq!(remove_prefix("inetnum/foo", "/reg/"), "inetnum/foo");
    }

    #[test]
    fn shift_splits_head_and_tail() {
        let args = vec!["index".to_string(), "--verbose".to_string()];
        let (head, tail) = shift(&args);
        assert_eq!(head, Some("index"));
        assert_eq!(tail, &["--verbose".to_string()]);

        let (head, tail) = shift(&[]);
        assert_eq!(head, None);
        assert!(tail.is_empty());
    }
}
