use std::path::PathBuf;

use crate::{
    error::{MirrorError, Result},
    filter::FilterConfig,
};

pub const DEFAULT_REF: &str = "main";
pub const DEFAULT_ROOTS: &[&str] = &["proto", "build"];
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Effective configuration of one mirror run
///
/// Built once and shared read-only by the engine and the run driver.
/// The access token is not part of it; it lives in the source client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    /// GitLab base URL, e.g. `https://gitlab.example.com`
    pub host: String,
    /// Numeric project id or `group/name` path
    pub project: String,
    /// Branch, tag or commit to mirror
    pub reference: String,
    pub filter: FilterConfig,
    /// Local directory that receives the mirrored files
    pub destination: PathBuf,
    /// Top-level folders walked in order
    pub roots: Vec<String>,
    /// Maximum number of remote calls in flight
    pub concurrency: usize,
}

impl MirrorConfig {
    pub fn new(host: impl Into<String>, project: impl Into<String>, destination: PathBuf) -> Self {
        Self {
            host: host.into(),
            project: project.into(),
            reference: DEFAULT_REF.to_string(),
            filter: FilterConfig::default(),
            destination,
            roots: DEFAULT_ROOTS.iter().map(|r| r.to_string()).collect(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }

    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_roots<I, S>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roots = roots
            .into_iter()
            .map(|r| {
                let r: String = r.into();
                r.trim().trim_matches('/').to_string()
            })
            .filter(|r| !r.is_empty())
            .collect();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Reject configurations no run could succeed with
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| -> Result<()> {
            Err(MirrorError::InvalidConfig {
                message: message.to_string(),
            })
        };

        if self.host.trim().is_empty() {
            return invalid("host must not be empty");
        }
        if !self.host.starts_with("http://") && !self.host.starts_with("https://") {
            return invalid("host must start with http:// or https://");
        }
        if self.project.trim().is_empty() {
            return invalid("project must not be empty");
        }
        if self.reference.trim().is_empty() {
            return invalid("ref must not be empty");
        }
        if self.roots.is_empty() {
            return invalid("at least one root folder is required");
        }
        if self.concurrency == 0 {
            return invalid("concurrency must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MirrorConfig {
        MirrorConfig::new("https://gitlab.example.com", "42", PathBuf::from("/tmp/out"))
    }

    #[test]
    fn test_defaults() {
        let config = config();
        assert_eq!(config.reference, "main");
        assert_eq!(config.roots, vec!["proto", "build"]);
        assert!(config.filter.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_roots_are_normalized() {
        let config = config().with_roots(["/proto/", " ", "build"]);
        assert_eq!(config.roots, vec!["proto", "build"]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(config().with_concurrency(0).validate().is_err());
        assert!(config().with_roots(Vec::<String>::new()).validate().is_err());
        assert!(config().with_reference("").validate().is_err());

        let mut bad_host = config();
        bad_host.host = "gitlab.example.com".to_string();
        assert!(matches!(
            bad_host.validate(),
            Err(MirrorError::InvalidConfig { .. })
        ));
    }
}
