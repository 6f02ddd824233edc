use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::TestsConfig;
use crate::process::{CommandRunner, CommandSpec};

/// The project's test suite. Runs once per run, after every persona.
#[async_trait]
pub trait TestRunner: Send + Sync {
    /// `true` when the suite passed (or was skipped by configuration).
    async fn run_tests(&self) -> bool;
}

/// Runs the configured test command in the working tree, with `TMP`, `TEMP`
/// and `TMPDIR` pointed at a fresh directory so concurrent runs on the same
/// host do not share temp paths.
pub struct CommandTestRunner {
    config: TestsConfig,
    dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl CommandTestRunner {
    pub fn new(config: &TestsConfig, dir: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            config: config.clone(),
            dir: dir.into(),
            runner,
        }
    }

    fn isolation_dir(&self) -> std::io::Result<tempfile::TempDir> {
        let builder = {
            let mut b = tempfile::Builder::new();
            b.prefix("patchloop-tests-");
            b
        };
        match &self.config.tmp_dir {
            Some(base) => {
                std::fs::create_dir_all(base)?;
                builder.tempdir_in(base)
            }
            None => builder.tempdir(),
        }
    }
}

#[async_trait]
impl TestRunner for CommandTestRunner {
    async fn run_tests(&self) -> bool {
        if self.config.skip {
            tracing::info!("Test run skipped by configuration");
            return true;
        }

        let tmp = match self.isolation_dir() {
            Ok(tmp) => tmp,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create test temp directory");
                return false;
            }
        };
        let tmp_path = tmp.path().to_string_lossy().into_owned();

        let spec = CommandSpec::new(&self.config.program, self.config.timeout())
            .args(self.config.args.iter().cloned())
            .current_dir(&self.dir)
            .env("TMP", &tmp_path)
            .env("TEMP", &tmp_path)
            .env("TMPDIR", &tmp_path);

        tracing::info!(command = %spec.display(), "Running tests");
        match self.runner.run(&spec).await {
            Ok(output) => {
                if !output.success {
                    tracing::warn!(
                        code = ?output.code,
                        stdout = %output.stdout,
                        stderr = %output.stderr,
                        "Tests failed"
                    );
                }
                output.success
            }
            Err(e) => {
                tracing::error!(error = %e, "Error while running tests");
                false
            }
        }
    }
}
