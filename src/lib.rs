pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod gitlab;
pub mod mirror;
pub mod source;
pub mod types;
pub mod writer;

pub use cache::{fingerprint, should_skip, DiskStateStore, MemoryStateStore, NoStateStore, RunState, StateStore};
pub use config::MirrorConfig;
pub use engine::DownloadEngine;
pub use error::{MirrorError, Result};
pub use filter::FilterConfig;
pub use gitlab::GitLabSource;
pub use mirror::Mirror;
pub use source::RepositorySource;
pub use types::{DownloadSummary, DownloadTarget, EntryKind, FileContent, RunOutcome, TreeEntry};
