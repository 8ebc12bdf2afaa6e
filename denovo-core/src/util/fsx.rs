use std::path::{Path, PathBuf};

/// Remove a file, logging instead of failing. A missing file counts as removed.
pub fn remove_quietly(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not delete file");
            false
        }
    }
}

/// `dir/<stem><suffix>`, where `suffix` carries its own dot(s).
pub fn sibling(dir: &Path, stem: &str, suffix: &str) -> PathBuf {
    dir.join(format!("{stem}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removing_twice_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("chunk_1.out");
        std::fs::write(&p, "x").unwrap();
        assert!(remove_quietly(&p));
        assert!(remove_quietly(&p));
        assert!(!p.exists());
    }

    #[test]
    fn failure_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        // a directory cannot be removed with remove_file
        assert!(!remove_quietly(dir.path()));
    }

    #[test]
    fn sibling_appends_suffix() {
        assert_eq!(
            sibling(Path::new("/out"), "run1", ".pnovo.txt"),
            PathBuf::from("/out/run1.pnovo.txt")
        );
    }
}
