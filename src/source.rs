use async_trait::async_trait;
use crate::{error::Result, types::{FileContent, TreeEntry}};

/// Read-only access to a remote repository at a named ref
///
/// Implementors report failures as errors; deciding whether a failure
/// is fatal or only ends one branch of a walk is left to the caller.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// Resolve `reference` to the revision id it currently points at
    async fn latest_revision(&self, reference: &str) -> Result<String>;

    /// List the direct children of a directory (one level, no recursion)
    ///
    /// An empty directory is `Ok` with no entries, never an error
    async fn list_children(&self, path: &str, reference: &str) -> Result<Vec<TreeEntry>>;

    /// Fetch the full content of a single file
    ///
    /// Returns `MirrorError::NotFound` if the file doesn't exist
    async fn fetch_file(&self, path: &str, reference: &str) -> Result<FileContent>;

    /// Get a human-readable identifier for this source (for logging/debugging)
    fn identifier(&self) -> String;
}
