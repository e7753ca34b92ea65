use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// The external tool that performs registry logins and image copies.
///
/// Narrow seam so the mirror orchestration can be tested without spawning
/// real subprocesses.
#[async_trait]
pub trait ImageTool: Send + Sync {
    /// Log in to a registry. A failed login is fatal for the invocation.
    async fn login(&self, registry: &str, username: &str, password: &str) -> Result<()>;

    /// Copy one image reference to another. Returns `Ok(false)` when the tool
    /// ran but reported failure; `Err` only when it could not be run at all.
    async fn copy(&self, source: &str, dest: &str) -> Result<bool>;
}

/// `crane` CLI wrapper.
///
/// All invocations point DOCKER_CONFIG at an invocation-scoped directory so
/// login state never leaks between (possibly concurrent) invocations sharing
/// a warm container.
pub struct CraneCli {
    config_dir: PathBuf,
}

impl CraneCli {
    pub fn new(config_dir: &Path) -> Self {
        Self {
            config_dir: config_dir.to_path_buf(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("crane");
        cmd.env("DOCKER_CONFIG", &self.config_dir);
        cmd
    }
}

#[async_trait]
impl ImageTool for CraneCli {
    async fn login(&self, registry: &str, username: &str, password: &str) -> Result<()> {
        debug!(
            "Executing: crane auth login {} -u {} --password-stdin",
            registry, username
        );

        let mut child = self
            .command()
            .args(["auth", "login", registry, "-u", username, "--password-stdin"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to execute crane auth login")?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(password.as_bytes())
                .await
                .context("Failed to write password to crane stdin")?;
        }

        let output = child
            .wait_with_output()
            .await
            .context("Failed to wait for crane auth login")?;

        if !output.status.success() {
            bail!(
                "Crane login failed for {}:\n{}",
                registry,
                String::from_utf8_lossy(&output.stderr)
            );
        }

        info!("Crane login succeeded for {}", registry);
        Ok(())
    }

    async fn copy(&self, source: &str, dest: &str) -> Result<bool> {
        debug!("Executing: crane copy {} {}", source, dest);

        let output = self
            .command()
            .args(["copy", source, dest])
            .output()
            .await
            .context("Failed to execute crane copy")?;

        if !output.stdout.is_empty() {
            debug!("Crane stdout: {}", String::from_utf8_lossy(&output.stdout));
        }
        if !output.stderr.is_empty() {
            warn!("Crane stderr: {}", String::from_utf8_lossy(&output.stderr));
        }

        Ok(output.status.success())
    }
}
