pub mod git;
pub mod suite;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::process::{CommandRunner, CommandSpec};

pub use suite::{CommandTestRunner, TestRunner};

const APPLY_TIMEOUT: Duration = Duration::from_secs(60);

/// Repository operations a persona's workflow performs, in order.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Create a branch at HEAD and check it out.
    async fn create_branch(&self, name: &str) -> Result<()>;

    /// Apply a patch to the index and working tree together.
    ///
    /// `Ok(false)` means the patch was rejected. No rollback is attempted.
    async fn apply_patch(&self, patch: &str) -> Result<bool>;

    /// Stage everything and commit.
    async fn commit_all(&self, message: &str) -> Result<()>;

    async fn push(&self, branch: &str) -> Result<()>;

    /// URL of the configured remote, if any.
    async fn remote_url(&self) -> Result<Option<String>>;
}

/// The local git working tree every persona mutates in turn.
pub struct GitWorkspace {
    dir: PathBuf,
    remote: String,
    token: Option<String>,
    runner: Arc<dyn CommandRunner>,
}

impl GitWorkspace {
    pub fn new(
        dir: impl Into<PathBuf>,
        remote: impl Into<String>,
        token: Option<String>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            dir: dir.into(),
            remote: remote.into(),
            token,
            runner,
        }
    }
}

#[async_trait]
impl VersionControl for GitWorkspace {
    async fn create_branch(&self, name: &str) -> Result<()> {
        git::create_branch(&self.dir, name).await
    }

    async fn apply_patch(&self, patch: &str) -> Result<bool> {
        let mut file = tempfile::Builder::new()
            .prefix("patchloop-")
            .suffix(".patch")
            .tempfile()?;
        file.write_all(patch.as_bytes())?;
        // git apply treats a missing final newline as a corrupt patch.
        if !patch.ends_with('\n') {
            file.write_all(b"\n")?;
        }
        file.flush()?;

        let spec = CommandSpec::new("git", APPLY_TIMEOUT)
            .args(["apply", "--index"])
            .arg(file.path().to_string_lossy())
            .current_dir(&self.dir);

        tracing::info!(patch_file = %file.path().display(), "Applying patch");
        let output = self.runner.run(&spec).await?;
        if !output.success {
            tracing::warn!(
                code = ?output.code,
                stderr = %output.stderr.trim(),
                "git apply rejected the patch"
            );
        }
        Ok(output.success)
    }

    async fn commit_all(&self, message: &str) -> Result<()> {
        git::add_all(&self.dir).await?;
        git::commit(&self.dir, message).await
    }

    async fn push(&self, branch: &str) -> Result<()> {
        git::push(&self.dir, &self.remote, branch, self.token.as_deref()).await
    }

    async fn remote_url(&self) -> Result<Option<String>> {
        git::remote_url(&self.dir, &self.remote).await
    }
}
