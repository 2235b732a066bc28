use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::{
    config::MirrorConfig,
    source::RepositorySource,
    types::{DownloadSummary, DownloadTarget, EntryKind},
    writer,
};

type Walk = Pin<Box<dyn Future<Output = DownloadSummary> + Send>>;

/// Walks remote folders and mirrors their files to the destination
///
/// Siblings in a folder are listed and downloaded concurrently. At most
/// `config.concurrency` remote calls are in flight at once; a permit is
/// only held for one call and its write, never across a recursion.
/// Failures stay local to the file or folder they hit.
#[derive(Clone)]
pub struct DownloadEngine {
    source: Arc<dyn RepositorySource>,
    config: Arc<MirrorConfig>,
    permits: Arc<Semaphore>,
}

impl DownloadEngine {
    pub fn new(source: Arc<dyn RepositorySource>, config: Arc<MirrorConfig>) -> Self {
        let permits = Arc::new(Semaphore::new(config.concurrency.max(1)));
        Self {
            source,
            config,
            permits,
        }
    }

    /// Mirror everything under `root_path` that passes the folder filter
    ///
    /// The root itself is always listed; the filter applies to every
    /// directory below it.
    pub async fn download_folder(&self, root_path: &str) -> DownloadSummary {
        self.clone()
            .walk(root_path.trim_matches('/').to_string())
            .await
    }

    fn walk(self, path: String) -> Walk {
        Box::pin(async move {
            let mut summary = DownloadSummary::default();

            let listing = {
                let _permit = self.permits.acquire().await.ok();
                self.source
                    .list_children(&path, &self.config.reference)
                    .await
            };

            let entries = match listing {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(folder = %path, "failed to list folder: {}", e);
                    summary.folders_failed += 1;
                    return summary;
                }
            };

            if entries.is_empty() {
                debug!(folder = %path, "empty folder");
                return summary;
            }

            let mut folders = JoinSet::new();
            let mut files = JoinSet::new();
            for entry in &entries {
                let target = DownloadTarget::resolve(&path, entry);
                match target.kind {
                    EntryKind::Directory if !self.config.filter.should_descend(&target.path) => {
                        info!(folder = %target.path, "folder ignored");
                        summary.folders_ignored += 1;
                    }
                    EntryKind::Directory => {
                        folders.spawn(self.clone().walk(target.path));
                    }
                    EntryKind::File => {
                        let engine = self.clone();
                        files.spawn(async move { engine.download_file(target.path).await });
                    }
                }
            }

            while let Some(joined) = files.join_next().await {
                match joined {
                    Ok(child) => summary.merge(child),
                    Err(e) => {
                        warn!(folder = %path, "file download task aborted: {}", e);
                        summary.files_failed += 1;
                    }
                }
            }
            while let Some(joined) = folders.join_next().await {
                match joined {
                    Ok(child) => summary.merge(child),
                    Err(e) => {
                        warn!(folder = %path, "folder walk task aborted: {}", e);
                        summary.folders_failed += 1;
                    }
                }
            }

            summary
        })
    }

    async fn download_file(&self, path: String) -> DownloadSummary {
        let mut summary = DownloadSummary::default();
        let _permit = self.permits.acquire().await.ok();

        let file = match self.source.fetch_file(&path, &self.config.reference).await {
            Ok(file) => file,
            Err(e) => {
                warn!(file = %path, "failed to download file: {}", e);
                summary.files_failed += 1;
                return summary;
            }
        };

        match writer::write_file(&self.config.destination, &path, &file.content).await {
            Ok(written) => {
                info!(file = %path, bytes = file.content.len(), "downloaded to {}", written.display());
                summary.files_written += 1;
                summary.total_bytes += file.content.len() as u64;
            }
            Err(e) => {
                warn!(file = %path, "failed to write file: {}", e);
                summary.files_failed += 1;
            }
        }

        summary
    }
}
