use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::process::{CommandRunner, CommandSpec};

use super::TextGenerator;

/// Shell command that reads the prompt on stdin and answers on stdout.
pub struct LocalCliProvider {
    command: Option<String>,
    timeout: Duration,
    runner: Arc<dyn CommandRunner>,
}

impl LocalCliProvider {
    pub fn new(config: &ProviderConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            command: config.cli_command.clone().filter(|c| !c.trim().is_empty()),
            timeout: config.timeout(),
            runner,
        }
    }
}

#[async_trait]
impl TextGenerator for LocalCliProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let command = self.command.as_deref().ok_or(ProviderError::CommandMissing)?;

        let spec = CommandSpec::shell(command, self.timeout).stdin(prompt);
        let output = self.runner.run(&spec).await?;

        if !output.success {
            return Err(ProviderError::NonZeroExit {
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

/// True for commands that invoke `gh copilot`, which ignores stdin.
pub fn is_gh_copilot(command: &str) -> bool {
    let lower = command.to_lowercase();
    lower.contains("gh copilot") || lower.contains("gh.exe copilot")
}

/// Tool that cannot take streamed input: the prompt goes in as a truncated argument.
///
/// The full prompt is still persisted to a temporary file for the duration of
/// the call; the file is removed on every exit path.
pub struct ArgumentLimitedCliProvider {
    tool: String,
    args: Vec<String>,
    max_chars: usize,
    timeout: Duration,
    runner: Arc<dyn CommandRunner>,
}

impl ArgumentLimitedCliProvider {
    pub fn new(config: &ProviderConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            tool: config.tool_path.clone(),
            args: config.tool_args.clone(),
            max_chars: config.max_argument_chars,
            timeout: config.timeout(),
            runner,
        }
    }
}

#[async_trait]
impl TextGenerator for ArgumentLimitedCliProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let mut prompt_file = tempfile::Builder::new()
            .prefix("patchloop-")
            .suffix(".txt")
            .tempfile()?;
        prompt_file.write_all(prompt.as_bytes())?;
        prompt_file.flush()?;

        let spec = CommandSpec::new(&self.tool, self.timeout)
            .args(self.args.iter().cloned())
            .arg(truncate_chars(prompt, self.max_chars));

        tracing::debug!(
            tool = %self.tool,
            prompt_file = %prompt_file.path().display(),
            "Invoking argument-limited tool"
        );

        // `prompt_file` is dropped (and deleted) on every return below.
        let output = self.runner.run(&spec).await?;
        if !output.success {
            return Err(ProviderError::NonZeroExit {
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

/// First `max` characters of `s`, never splitting a code point.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
