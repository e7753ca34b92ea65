use anyhow::Result;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::notify::FailureNotifier;
use crate::registry::MirrorRegistry;
use crate::tool::ImageTool;

/// Username ECR expects for token-based logins.
const REGISTRY_USERNAME: &str = "AWS";

/// Payload returned to the invoker on success.
#[derive(Debug, Serialize)]
pub struct MirrorResult {
    pub status: String,
    pub repository: String,
    pub copied_images: Vec<String>,
    pub total_images: usize,
}

/// Mirror every tag of `repository` from the source registry to the
/// destination registry.
///
/// The destination repository is provisioned first, then both registries are
/// logged into, then tags are copied one at a time. A tag that fails to copy
/// is logged and skipped; everything before the copy loop is fatal.
pub async fn mirror_repository(
    repository: &str,
    source: &dyn MirrorRegistry,
    dest: &dyn MirrorRegistry,
    tool: &dyn ImageTool,
) -> Result<MirrorResult> {
    dest.ensure_repository(repository).await?;

    let source_password = source.authorization_password().await?;
    let dest_password = dest.authorization_password().await?;

    tool.login(source.host(), REGISTRY_USERNAME, &source_password)
        .await?;
    tool.login(dest.host(), REGISTRY_USERNAME, &dest_password)
        .await?;

    let images = source.list_images(repository).await?;

    let mut copied_images = Vec::new();
    for image in &images {
        let Some(tag) = image.reference() else {
            warn!("Skipping image without tag or digest in {}", repository);
            continue;
        };

        let source_uri = format!("{}/{}:{}", source.host(), repository, tag);
        let dest_uri = format!("{}/{}:{}", dest.host(), repository, tag);

        info!("Copying {} to {}", source_uri, dest_uri);

        if tool.copy(&source_uri, &dest_uri).await? {
            info!("Successfully copied: {}:{}", repository, tag);
            copied_images.push(format!("{}:{}", repository, tag));
        } else {
            warn!("Failed to copy: {}", tag);
        }
    }

    Ok(MirrorResult {
        status: "success".to_string(),
        repository: repository.to_string(),
        total_images: copied_images.len(),
        copied_images,
    })
}

/// Log a fatal mirror error and attempt a single best-effort notification.
/// A notification failure is logged and swallowed so it never masks the
/// original error.
pub async fn report_failure(
    notifier: &dyn FailureNotifier,
    repository: &str,
    err: &anyhow::Error,
) {
    error!("Mirror of repository {} failed: {:#}", repository, err);

    if let Err(notify_err) = notifier
        .notify_failure(repository, &format!("{err:#}"))
        .await
    {
        error!("Failed to send failure notification: {:#}", notify_err);
    }
}
