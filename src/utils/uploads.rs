use std::path::{Path, PathBuf};

/// Creates the directory served under `/api/v1/static/`. Relative paths are
/// resolved against the working directory.
pub fn ensure_uploads_dir(dir: impl AsRef<Path>) -> std::io::Result<PathBuf> {
    let dir = dir.as_ref();
    let path = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()?.join(dir)
    };

    std::fs::create_dir_all(&path)?;
    Ok(path)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn creates_nested_directory() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("files").join("lessons");

        let created = ensure_uploads_dir(&target).unwrap();
        assert_eq!(created, target);
        assert!(target.is_dir());

        // second call is a no-op
        assert!(ensure_uploads_dir(&target).is_ok());
    }
}
