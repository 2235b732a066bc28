use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::error::{MirrorError, Result};

/// Join a repository-relative path onto `destination`
///
/// Only plain path components are accepted; `..`, roots and prefixes
/// would let a remote tree escape the destination.
pub fn safe_join(destination: &Path, relative: &str) -> Result<PathBuf> {
    let relative_path = Path::new(relative);
    let unsafe_path = || MirrorError::UnsafePath {
        path: relative.to_string(),
    };

    let mut joined = destination.to_path_buf();
    let mut components = 0;
    for component in relative_path.components() {
        match component {
            Component::Normal(part) => {
                joined.push(part);
                components += 1;
            }
            Component::CurDir => {}
            _ => return Err(unsafe_path()),
        }
    }

    if components == 0 {
        return Err(unsafe_path());
    }
    Ok(joined)
}

/// Write `bytes` to `destination/relative`, creating parent directories
///
/// Returns the path that was written.
pub async fn write_file(destination: &Path, relative: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = safe_join(destination, relative)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&path, bytes).await?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_safe_join() {
        let dest = Path::new("/srv/mirror");
        assert_eq!(
            safe_join(dest, "proto/a.proto").unwrap(),
            PathBuf::from("/srv/mirror/proto/a.proto")
        );
        assert_eq!(
            safe_join(dest, "./proto/a.proto").unwrap(),
            PathBuf::from("/srv/mirror/proto/a.proto")
        );
    }

    #[test]
    fn test_safe_join_rejects_escapes() {
        let dest = Path::new("/srv/mirror");
        for bad in ["../etc/passwd", "proto/../../x", "/etc/passwd", "", "."] {
            assert!(
                matches!(safe_join(dest, bad), Err(MirrorError::UnsafePath { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_write_creates_parents_and_overwrites() {
        let temp_dir = TempDir::new().unwrap();

        let written = write_file(temp_dir.path(), "a/b/c.txt", b"first").await.unwrap();
        assert_eq!(written, temp_dir.path().join("a/b/c.txt"));
        assert_eq!(std::fs::read(&written).unwrap(), b"first");

        write_file(temp_dir.path(), "a/b/c.txt", b"second").await.unwrap();
        assert_eq!(std::fs::read(&written).unwrap(), b"second");
    }
}
