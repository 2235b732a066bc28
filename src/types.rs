/// Raw bytes of one remote file
#[derive(Debug, Clone)]
pub struct FileContent {
    /// The raw bytes of the file
    pub content: bytes::Bytes,
    /// Repository-relative path the bytes were fetched from
    pub path: String,
}

/// A direct child of a remote directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Name of the file or folder, without its parent path
    pub name: String,
    /// Kind of entry
    pub kind: EntryKind,
}

impl TreeEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }
}

/// Kind of tree entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A tree entry resolved against its parent path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    /// Repository-relative, `/`-joined path
    pub path: String,
    pub kind: EntryKind,
}

impl DownloadTarget {
    /// Resolve `entry` under `parent` (`parent/name`, or `name` at the root)
    pub fn resolve(parent: &str, entry: &TreeEntry) -> Self {
        let parent = parent.trim_matches('/');
        let path = if parent.is_empty() {
            entry.name.clone()
        } else {
            format!("{}/{}", parent, entry.name)
        };

        Self {
            path,
            kind: entry.kind,
        }
    }
}

/// Counters gathered while walking a tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub files_written: usize,
    pub total_bytes: u64,
    pub files_failed: usize,
    pub folders_failed: usize,
    pub folders_ignored: usize,
}

impl DownloadSummary {
    pub fn merge(&mut self, other: DownloadSummary) {
        self.files_written += other.files_written;
        self.total_bytes += other.total_bytes;
        self.files_failed += other.files_failed;
        self.folders_failed += other.folders_failed;
        self.folders_ignored += other.folders_ignored;
    }

    /// Whether any file or folder was skipped because of an error
    pub fn has_failures(&self) -> bool {
        self.files_failed > 0 || self.folders_failed > 0
    }
}

/// How a mirror run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Remote revision and configuration matched the saved state
    Skipped { revision_id: String },
    /// Every root folder was walked
    Completed {
        revision_id: String,
        summary: DownloadSummary,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_target() {
        let entry = TreeEntry::file("a.proto");
        assert_eq!(DownloadTarget::resolve("proto", &entry).path, "proto/a.proto");
        assert_eq!(DownloadTarget::resolve("proto/", &entry).path, "proto/a.proto");
        assert_eq!(DownloadTarget::resolve("", &entry).path, "a.proto");

        let dir = TreeEntry::directory("v1");
        let target = DownloadTarget::resolve("proto/api", &dir);
        assert_eq!(target.path, "proto/api/v1");
        assert_eq!(target.kind, EntryKind::Directory);
    }

    #[test]
    fn test_summary_merge() {
        let mut total = DownloadSummary::default();
        total.merge(DownloadSummary {
            files_written: 2,
            total_bytes: 10,
            ..Default::default()
        });
        total.merge(DownloadSummary {
            files_failed: 1,
            folders_ignored: 3,
            ..Default::default()
        });

        assert_eq!(total.files_written, 2);
        assert_eq!(total.total_bytes, 10);
        assert_eq!(total.folders_ignored, 3);
        assert!(total.has_failures());
    }
}
