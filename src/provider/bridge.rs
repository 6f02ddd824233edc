use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::process::{CommandRunner, CommandSpec};

use super::TextGenerator;

/// Editor-side helper binary, called as `<helper> <prompt_file> <output_file>`.
///
/// Both files are `NamedTempFile` guards, so they are deleted whether the
/// helper succeeds, fails, or times out.
pub struct EditorBridgeProvider {
    helper: Option<PathBuf>,
    timeout: Duration,
    runner: Arc<dyn CommandRunner>,
}

impl EditorBridgeProvider {
    pub fn new(config: &ProviderConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            helper: config
                .bridge_helper
                .clone()
                .filter(|p| !p.as_os_str().is_empty()),
            timeout: config.bridge_timeout(),
            runner,
        }
    }
}

#[async_trait]
impl TextGenerator for EditorBridgeProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let helper = self
            .helper
            .as_ref()
            .ok_or(ProviderError::HelperNotConfigured)?;

        let mut prompt_file = tempfile::Builder::new()
            .prefix("patchloop-")
            .suffix("_prompt.txt")
            .tempfile()?;
        prompt_file.write_all(prompt.as_bytes())?;
        prompt_file.flush()?;

        let output_file = tempfile::Builder::new()
            .prefix("patchloop-")
            .suffix("_output.txt")
            .tempfile()?;

        let spec = CommandSpec::new(helper.to_string_lossy(), self.timeout).args([
            prompt_file.path().to_string_lossy().into_owned(),
            output_file.path().to_string_lossy().into_owned(),
        ]);

        let output = self.runner.run(&spec).await?;
        if !output.success {
            tracing::warn!(helper = %helper.display(), code = ?output.code, "Editor bridge helper failed");
            return Err(ProviderError::HelperFailed {
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        let text = tokio::fs::read_to_string(output_file.path()).await?;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use super::*;
    use crate::error::ProcessError;
    use crate::process::testing::ScriptedRunner;

    fn bridge_config(helper: Option<&Path>) -> ProviderConfig {
        ProviderConfig {
            bridge_helper: helper.map(Path::to_path_buf),
            bridge_timeout_secs: 5,
            ..ProviderConfig::default()
        }
    }

    /// Runner that plays the helper: copies the prompt file into the output file
    /// and remembers both paths.
    fn echoing_runner(paths: Arc<Mutex<Vec<PathBuf>>>) -> ScriptedRunner {
        ScriptedRunner::with_inspector(move |spec| {
            let prompt = PathBuf::from(&spec.args[0]);
            let output = PathBuf::from(&spec.args[1]);
            let text = std::fs::read_to_string(&prompt).unwrap();
            std::fs::write(&output, format!("echo: {text}")).unwrap();
            paths.lock().unwrap().extend([prompt, output]);
        })
    }

    #[tokio::test]
    async fn test_helper_not_configured() {
        let runner = Arc::new(ScriptedRunner::new());
        let p = EditorBridgeProvider::new(&bridge_config(None), runner.clone());
        assert!(matches!(
            p.generate("x").await.unwrap_err(),
            ProviderError::HelperNotConfigured
        ));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_round_trip_through_files_and_cleanup() {
        let paths: Arc<Mutex<Vec<PathBuf>>> = Arc::default();
        let runner = Arc::new(echoing_runner(paths.clone()));
        let p = EditorBridgeProvider::new(
            &bridge_config(Some(Path::new("/usr/local/bin/copilot-bridge"))),
            runner.clone(),
        );

        assert_eq!(p.generate("write a diff").await.unwrap(), "echo: write a diff");

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls[0].program, "/usr/local/bin/copilot-bridge");
        let paths = paths.lock().unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| !p.exists()));
    }

    #[tokio::test]
    async fn test_failure_and_timeout_release_files() {
        let paths: Arc<Mutex<Vec<PathBuf>>> = Arc::default();
        let runner = Arc::new(echoing_runner(paths.clone()));
        runner.push_exit(1, "", "not signed in");
        runner.push(Err(ProcessError::Timeout(Duration::from_secs(5))));
        let p = EditorBridgeProvider::new(&bridge_config(Some(Path::new("bridge"))), runner);

        match p.generate("first").await.unwrap_err() {
            ProviderError::HelperFailed { code, stderr } => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "not signed in");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            p.generate("second").await.unwrap_err(),
            ProviderError::Timeout(_)
        ));

        let paths = paths.lock().unwrap();
        assert_eq!(paths.len(), 4);
        assert!(paths.iter().all(|p| !p.exists()));
    }
}
