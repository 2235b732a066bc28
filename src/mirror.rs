use std::sync::Arc;

use tokio::fs;
use tracing::{info, warn};

use crate::{
    cache::{fingerprint, should_skip, RunState, StateStore},
    config::MirrorConfig,
    engine::DownloadEngine,
    error::Result,
    source::RepositorySource,
    types::{DownloadSummary, RunOutcome},
};

/// One mirror run: revision check, cache check, traversal, state update
pub struct Mirror {
    source: Arc<dyn RepositorySource>,
    state: Arc<dyn StateStore>,
    config: Arc<MirrorConfig>,
}

impl Mirror {
    pub fn new(
        source: Arc<dyn RepositorySource>,
        state: Arc<dyn StateStore>,
        config: MirrorConfig,
    ) -> Self {
        Self {
            source,
            state,
            config: Arc::new(config),
        }
    }

    /// Mirror every configured root folder unless nothing changed
    ///
    /// Only an invalid configuration, a failed revision lookup or an
    /// uncreatable destination abort the run. Per-file and per-folder
    /// failures are logged and counted in the summary, and the run still
    /// counts as complete.
    pub async fn run(&self) -> Result<RunOutcome> {
        self.config.validate()?;

        let revision_id = self.source.latest_revision(&self.config.reference).await?;
        let fingerprint = fingerprint(&self.config);
        info!(
            source = %self.source.identifier(),
            reference = %self.config.reference,
            revision = %revision_id,
            "resolved latest revision"
        );

        let prior = self.state.load(&fingerprint).await;
        if should_skip(&revision_id, &fingerprint, prior.as_ref()) {
            info!(revision = %revision_id, "revision and configuration unchanged, skipping download");
            return Ok(RunOutcome::Skipped { revision_id });
        }

        fs::create_dir_all(&self.config.destination).await?;

        let engine = DownloadEngine::new(self.source.clone(), self.config.clone());
        let mut summary = DownloadSummary::default();
        for root in &self.config.roots {
            info!(folder = %root, "mirroring folder");
            summary.merge(engine.download_folder(root).await);
        }

        if let Err(e) = self.state.save(&RunState::new(&revision_id, &fingerprint)).await {
            warn!("failed to save run state, next run will download again: {}", e);
        }

        if summary.has_failures() {
            warn!(
                files_failed = summary.files_failed,
                folders_failed = summary.folders_failed,
                "some paths could not be mirrored"
            );
        }
        info!(
            files = summary.files_written,
            bytes = summary.total_bytes,
            ignored = summary.folders_ignored,
            "Download complete"
        );

        Ok(RunOutcome::Completed {
            revision_id,
            summary,
        })
    }
}
