pub mod ecr;

use anyhow::Result;
use async_trait::async_trait;

/// A registry taking part in a mirror operation.
///
/// One implementation exists per side of the copy; the destination additionally
/// gets `ensure_repository` called before any image is transferred.
#[async_trait]
pub trait MirrorRegistry: Send + Sync {
    /// Registry hostname, e.g. "123456789012.dkr.ecr.eu-west-1.amazonaws.com".
    fn host(&self) -> &str;

    /// Create the repository if it does not exist yet. An already existing
    /// repository is not an error.
    async fn ensure_repository(&self, repository: &str) -> Result<()>;

    /// Fetch a short-lived authorization token and return the decoded password
    /// (the username is always "AWS").
    async fn authorization_password(&self) -> Result<String>;

    /// List all image identifiers of a repository, following pagination.
    async fn list_images(&self, repository: &str) -> Result<Vec<ImageRef>>;
}

/// An image identifier as returned by the registry listing. Either field may
/// be absent; untagged images only carry a digest.
#[derive(Debug, Clone, Default)]
pub struct ImageRef {
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl ImageRef {
    /// The identifier to mirror under: the tag when present, the digest
    /// otherwise. `None` means the entry carries neither and must be skipped.
    pub fn reference(&self) -> Option<&str> {
        self.tag.as_deref().or(self.digest.as_deref())
    }
}
