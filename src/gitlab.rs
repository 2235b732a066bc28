use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::{MirrorError, Result},
    source::RepositorySource,
    types::{FileContent, TreeEntry},
};

const PER_PAGE: u32 = 100;

/// GitLab-backed repository source
///
/// Talks to the GitLab v4 REST API:
/// - `repository/commits/:ref` to resolve the revision id
/// - `repository/tree` (paginated, non-recursive) for directory listings
/// - `repository/files/:path/raw` for file downloads
#[derive(Clone)]
pub struct GitLabSource {
    client: Client,
    host: String,
    project: String,
}

#[derive(Deserialize)]
struct GitLabTreeEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
}

#[derive(Deserialize)]
struct GitLabCommit {
    id: String,
}

impl GitLabSource {
    /// Create a new GitLab source
    ///
    /// # Arguments
    /// * `host` - Base URL of the GitLab instance
    /// * `project` - Numeric project id or `group/name` path
    /// * `token` - Access token sent as `PRIVATE-TOKEN` on every request
    pub fn new(host: &str, project: &str, token: &str) -> Result<Self> {
        let mut token_value =
            HeaderValue::from_str(token).map_err(|_| MirrorError::InvalidConfig {
                message: "token contains characters not allowed in an HTTP header".to_string(),
            })?;
        token_value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("private-token", token_value);

        let client = Client::builder()
            .user_agent(concat!("gitlab-mirror/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            project: project.to_string(),
        })
    }

    fn project_url(&self) -> String {
        format!(
            "{}/api/v4/projects/{}",
            self.host,
            urlencoding::encode(&self.project)
        )
    }

    fn commit_url(&self, reference: &str) -> String {
        format!(
            "{}/repository/commits/{}",
            self.project_url(),
            urlencoding::encode(reference)
        )
    }

    fn tree_url(&self, path: &str, reference: &str, page: u32) -> String {
        let mut url = format!(
            "{}/repository/tree?ref={}&per_page={}&page={}",
            self.project_url(),
            urlencoding::encode(reference),
            PER_PAGE,
            page
        );
        let path = path.trim_matches('/');
        if !path.is_empty() {
            url.push_str("&path=");
            url.push_str(&urlencoding::encode(path));
        }
        url
    }

    fn raw_url(&self, path: &str, reference: &str) -> String {
        format!(
            "{}/repository/files/{}/raw?ref={}",
            self.project_url(),
            urlencoding::encode(path.trim_start_matches('/')),
            urlencoding::encode(reference)
        )
    }

    /// Check if an error is a rate limit error
    fn is_rate_limit_error(&self, status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS
    }

    /// Map a non-success response onto the error taxonomy
    async fn check_status(&self, response: Response, path: &str) -> Result<Response> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(MirrorError::NotFound {
                path: path.to_string(),
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "token rejected".to_string());
                Err(MirrorError::Unauthorized { message })
            }
            status if self.is_rate_limit_error(status) => {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "GitLab API rate limit exceeded".to_string());
                Err(MirrorError::RateLimited { message })
            }
            status => {
                let message = format!(
                    "Unexpected status {}: {}",
                    status,
                    response.text().await.unwrap_or_default()
                );
                Err(MirrorError::InvalidStructure { message })
            }
        }
    }
}

fn next_page(response: &Response) -> Option<u32> {
    response
        .headers()
        .get("x-next-page")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

#[async_trait]
impl RepositorySource for GitLabSource {
    async fn latest_revision(&self, reference: &str) -> Result<String> {
        let response = self.client.get(self.commit_url(reference)).send().await?;
        let response = self.check_status(response, reference).await?;
        let commit: GitLabCommit = response.json().await?;
        Ok(commit.id)
    }

    async fn list_children(&self, path: &str, reference: &str) -> Result<Vec<TreeEntry>> {
        let mut entries = Vec::new();
        let mut page = 1;

        loop {
            let response = self
                .client
                .get(self.tree_url(path, reference, page))
                .send()
                .await?;
            let response = self.check_status(response, path).await?;
            let next = next_page(&response);
            let api_entries: Vec<GitLabTreeEntry> = response.json().await?;

            for e in api_entries {
                match e.entry_type.as_str() {
                    "blob" => entries.push(TreeEntry::file(e.name)),
                    "tree" => entries.push(TreeEntry::directory(e.name)),
                    other => debug!(path = %e.path, kind = other, "skipping non-file tree entry"),
                }
            }

            match next {
                Some(n) if n > page => page = n,
                _ => break,
            }
        }

        Ok(entries)
    }

    async fn fetch_file(&self, path: &str, reference: &str) -> Result<FileContent> {
        let response = self.client.get(self.raw_url(path, reference)).send().await?;
        let response = self.check_status(response, path).await?;
        let content = response.bytes().await?;

        Ok(FileContent {
            content,
            path: path.to_string(),
        })
    }

    fn identifier(&self) -> String {
        format!("gitlab://{}/{}", self.host, self.project)
    }
}
