//! Text-generation backends.
//!
//! A closed set of providers sits behind [`TextGenerator`]; the active one is
//! picked from [`ProviderConfig::kind`] once at startup.

pub mod bridge;
pub mod cli;
pub mod remote;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::{ProviderError, Result};
use crate::process::CommandRunner;

pub use bridge::EditorBridgeProvider;
pub use cli::{ArgumentLimitedCliProvider, LocalCliProvider};
pub use remote::RemoteApiProvider;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Turn a prompt into raw generated text. The text is not interpreted.
    async fn generate(&self, prompt: &str) -> std::result::Result<String, ProviderError>;
}

pub enum Provider {
    RemoteApi(RemoteApiProvider),
    LocalCli(LocalCliProvider),
    EditorBridge(EditorBridgeProvider),
    ArgumentLimitedCli(ArgumentLimitedCliProvider),
}

impl Provider {
    pub fn from_config(config: &ProviderConfig, runner: Arc<dyn CommandRunner>) -> Result<Self> {
        let provider = match config.kind {
            ProviderKind::RemoteApi => Provider::RemoteApi(RemoteApiProvider::new(config)?),
            ProviderKind::LocalCli => match config.cli_command.as_deref() {
                // gh copilot cannot read the prompt from stdin; the tool comes from tool_path
                Some(cmd) if cli::is_gh_copilot(cmd) => Provider::ArgumentLimitedCli(
                    ArgumentLimitedCliProvider::new(config, runner),
                ),
                _ => Provider::LocalCli(LocalCliProvider::new(config, runner)),
            },
            ProviderKind::EditorBridge => {
                Provider::EditorBridge(EditorBridgeProvider::new(config, runner))
            }
            ProviderKind::ArgumentLimitedCli => {
                Provider::ArgumentLimitedCli(ArgumentLimitedCliProvider::new(config, runner))
            }
        };

        tracing::info!(provider = provider.name(), "Selected text-generation provider");
        Ok(provider)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::RemoteApi(_) => "remote_api",
            Provider::LocalCli(_) => "local_cli",
            Provider::EditorBridge(_) => "editor_bridge",
            Provider::ArgumentLimitedCli(_) => "argument_limited_cli",
        }
    }
}

#[async_trait]
impl TextGenerator for Provider {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, ProviderError> {
        match self {
            Provider::RemoteApi(p) => p.generate(prompt).await,
            Provider::LocalCli(p) => p.generate(prompt).await,
            Provider::EditorBridge(p) => p.generate(prompt).await,
            Provider::ArgumentLimitedCli(p) => p.generate(prompt).await,
        }
    }
}
