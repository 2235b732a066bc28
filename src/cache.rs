use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::MirrorConfig;
use crate::error::{MirrorError, Result};

/// State remembered from the last completed run of one configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub last_revision_id: String,
    pub config_fingerprint: String,
}

impl RunState {
    pub fn new(last_revision_id: impl Into<String>, config_fingerprint: impl Into<String>) -> Self {
        Self {
            last_revision_id: last_revision_id.into(),
            config_fingerprint: config_fingerprint.into(),
        }
    }
}

/// Stable digest of everything that decides what a run writes
///
/// Covers host, project, ref, filter terms, destination and root folders.
/// Filter terms and roots are hashed as sets, so reordering them on the
/// command line does not invalidate the cache.
pub fn fingerprint(config: &MirrorConfig) -> String {
    let mut hasher = Sha256::new();
    hash_field(&mut hasher, "host", config.host.trim_end_matches('/'));
    hash_field(&mut hasher, "project", &config.project);
    hash_field(&mut hasher, "ref", &config.reference);
    hash_list(&mut hasher, "filter", config.filter.terms());
    hash_field(
        &mut hasher,
        "destination",
        &normalize_destination(&config.destination).to_string_lossy(),
    );
    hash_list(&mut hasher, "roots", &config.roots);
    format!("{:x}", hasher.finalize())
}

/// Drop `.` components and trailing separators so `out`, `./out` and
/// `out/` name the same destination
fn normalize_destination(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

// Length prefixes keep ("ab", "c") and ("a", "bc") apart.
fn hash_field(hasher: &mut Sha256, label: &str, value: &str) {
    hasher.update(label.as_bytes());
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn hash_list(hasher: &mut Sha256, label: &str, values: &[String]) {
    let mut sorted: Vec<&str> = values.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();

    hasher.update(label.as_bytes());
    hasher.update((sorted.len() as u64).to_le_bytes());
    for value in sorted {
        hash_field(hasher, "item", value);
    }
}

/// True iff a prior run saw the same revision with the same configuration
pub fn should_skip(
    current_revision_id: &str,
    current_fingerprint: &str,
    prior: Option<&RunState>,
) -> bool {
    match prior {
        Some(state) => {
            state.last_revision_id == current_revision_id
                && state.config_fingerprint == current_fingerprint
        }
        None => false,
    }
}

/// Persistence for run state, keyed by configuration fingerprint
///
/// `load` never fails: missing or unreadable state means "first run".
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the state saved for `fingerprint`, if any
    async fn load(&self, fingerprint: &str) -> Option<RunState>;

    /// Overwrite the state saved for `state.config_fingerprint`
    async fn save(&self, state: &RunState) -> Result<()>;
}

/// In-memory state store
pub struct MemoryStateStore {
    store: Arc<RwLock<HashMap<String, RunState>>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Seed the store, as if a previous run had saved `state`
    pub async fn insert(&self, state: RunState) {
        let mut store = self.store.write().await;
        store.insert(state.config_fingerprint.clone(), state);
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self, fingerprint: &str) -> Option<RunState> {
        let store = self.store.read().await;
        store.get(fingerprint).cloned()
    }

    async fn save(&self, state: &RunState) -> Result<()> {
        self.insert(state.clone()).await;
        Ok(())
    }
}

/// Disk-based state store, one JSON file per configuration
pub struct DiskStateStore {
    root_dir: PathBuf,
}

impl DiskStateStore {
    /// Create a state store rooted at the specified directory
    pub async fn new(root_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root_dir).await.map_err(|e| MirrorError::State {
            message: format!("Failed to create state directory {}: {}", root_dir.display(), e),
        })?;
        Ok(Self { root_dir })
    }

    /// Per-user default location, if the platform has a cache directory
    pub fn default_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("gitlab-mirror"))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Convert a fingerprint to a safe file path
    fn key_to_path(&self, fingerprint: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(fingerprint.as_bytes());
        let hash_str = format!("{:x}", hasher.finalize());

        self.root_dir
            .join(&hash_str[..2])
            .join(format!("{}.json", &hash_str[2..]))
    }
}

#[async_trait]
impl StateStore for DiskStateStore {
    async fn load(&self, fingerprint: &str) -> Option<RunState> {
        let path = self.key_to_path(fingerprint);

        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no saved run state");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), "failed to read run state, treating as first run: {}", e);
                return None;
            }
        };

        match serde_json::from_slice::<RunState>(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(path = %path.display(), "corrupt run state, treating as first run: {}", e);
                None
            }
        }
    }

    async fn save(&self, state: &RunState) -> Result<()> {
        let path = self.key_to_path(&state.config_fingerprint);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(state)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &json).await.map_err(|e| MirrorError::State {
            message: format!("Failed to write run state: {}", e),
        })?;
        fs::rename(&tmp, &path).await.map_err(|e| MirrorError::State {
            message: format!("Failed to replace run state: {}", e),
        })
    }
}

/// Store that remembers nothing, so every run downloads everything
pub struct NoStateStore;

#[async_trait]
impl StateStore for NoStateStore {
    async fn load(&self, _fingerprint: &str) -> Option<RunState> {
        None
    }

    async fn save(&self, _state: &RunState) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterConfig;
    use tempfile::TempDir;

    fn config() -> MirrorConfig {
        MirrorConfig::new("https://gitlab.example.com", "42", PathBuf::from("/srv/mirror"))
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        assert_eq!(fingerprint(&config()), fingerprint(&config()));
        assert_eq!(fingerprint(&config()).len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_each_field() {
        let base = fingerprint(&config());

        let mut project = config();
        project.project = "43".to_string();
        let variants = vec![
            project,
            config().with_reference("develop"),
            config().with_filter(FilterConfig::new(["docs"])),
            MirrorConfig::new("https://gitlab.example.com", "42", PathBuf::from("/srv/other")),
            MirrorConfig::new("https://gitlab.other.com", "42", PathBuf::from("/srv/mirror")),
            config().with_roots(["proto"]),
        ];

        for variant in variants {
            assert_ne!(fingerprint(&variant), base, "{:?}", variant);
        }
    }

    #[test]
    fn test_fingerprint_normalizes_destination_spelling() {
        let plain = MirrorConfig::new("https://gitlab.example.com", "42", PathBuf::from("/work/out"));
        let dotted = MirrorConfig::new("https://gitlab.example.com", "42", PathBuf::from("/work/./out"));
        let trailing = MirrorConfig::new("https://gitlab.example.com", "42", PathBuf::from("/work/out/"));
        let relative_dot = MirrorConfig::new("https://gitlab.example.com", "42", PathBuf::from("./out"));
        let relative = MirrorConfig::new("https://gitlab.example.com", "42", PathBuf::from("out"));

        assert_eq!(fingerprint(&plain), fingerprint(&dotted));
        assert_eq!(fingerprint(&plain), fingerprint(&trailing));
        assert_eq!(fingerprint(&relative), fingerprint(&relative_dot));
        assert_ne!(fingerprint(&plain), fingerprint(&relative));
    }

    #[test]
    fn test_fingerprint_ignores_term_order() {
        let a = config().with_filter(FilterConfig::new(["api", "docs"]));
        let b = config().with_filter(FilterConfig::new(["docs", "api"]));
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_fingerprint_field_boundaries() {
        let a = config().with_filter(FilterConfig::new(["ab", "c"]));
        let b = config().with_filter(FilterConfig::new(["a", "bc"]));
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_should_skip() {
        let prior = RunState::new("abc", "F");

        assert!(should_skip("abc", "F", Some(&prior)));
        assert!(!should_skip("def", "F", Some(&prior)));
        assert!(!should_skip("abc", "G", Some(&prior)));
        assert!(!should_skip("def", "G", Some(&prior)));
        assert!(!should_skip("abc", "F", None));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStateStore::new();
        assert!(store.load("F").await.is_none());

        store.save(&RunState::new("abc", "F")).await.unwrap();
        assert_eq!(store.load("F").await, Some(RunState::new("abc", "F")));
        assert!(store.load("G").await.is_none());

        store.save(&RunState::new("def", "F")).await.unwrap();
        assert_eq!(store.load("F").await.unwrap().last_revision_id, "def");
    }

    #[tokio::test]
    async fn test_disk_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = DiskStateStore::new(temp_dir.path().to_path_buf()).await.unwrap();

        assert!(store.load("F").await.is_none());

        let state = RunState::new("0123abcd", "F");
        store.save(&state).await.unwrap();
        assert_eq!(store.load("F").await, Some(state.clone()));

        // Survives a restart
        let reopened = DiskStateStore::new(temp_dir.path().to_path_buf()).await.unwrap();
        assert_eq!(reopened.load("F").await, Some(state));

        // Other fingerprints keep their own slot
        reopened.save(&RunState::new("ffff", "G")).await.unwrap();
        assert_eq!(reopened.load("F").await.unwrap().last_revision_id, "0123abcd");
        assert_eq!(reopened.load("G").await.unwrap().last_revision_id, "ffff");
    }

    #[tokio::test]
    async fn test_disk_store_corrupt_state_is_first_run() {
        let temp_dir = TempDir::new().unwrap();
        let store = DiskStateStore::new(temp_dir.path().to_path_buf()).await.unwrap();

        let path = store.key_to_path("F");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{ not json").unwrap();

        assert!(store.load("F").await.is_none());

        // A later save repairs it
        store.save(&RunState::new("abc", "F")).await.unwrap();
        assert!(store.load("F").await.is_some());
    }

    #[tokio::test]
    async fn test_no_state_store() {
        let store = NoStateStore;
        store.save(&RunState::new("abc", "F")).await.unwrap();
        assert!(store.load("F").await.is_none());
    }
}
