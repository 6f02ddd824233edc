use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub tests: TestsConfig,
    #[serde(default)]
    pub run: RunConfig,
}

/// Which text-generation backend answers the prompts.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions endpoint.
    #[default]
    #[serde(alias = "openai", alias = "openai_api")]
    RemoteApi,
    /// Shell command reading the prompt on stdin.
    #[serde(alias = "cli")]
    LocalCli,
    /// Helper binary invoked with a prompt file and an output file.
    #[serde(alias = "vscode", alias = "vscode_chat", alias = "vscode_copilot")]
    EditorBridge,
    /// Tool that only takes the prompt as a (truncated) positional argument.
    #[serde(alias = "copilot", alias = "copilot_cli", alias = "gh_copilot")]
    ArgumentLimitedCli,
}

#[derive(Deserialize, Clone)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub cli_command: Option<String>,
    #[serde(default)]
    pub bridge_helper: Option<PathBuf>,
    #[serde(default = "default_tool_path")]
    pub tool_path: String,
    #[serde(default = "default_tool_args")]
    pub tool_args: Vec<String>,
    #[serde(default = "default_max_argument_chars")]
    pub max_argument_chars: usize,
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_bridge_timeout")]
    pub bridge_timeout_secs: u64,
}

// Manual Debug impl to avoid leaking the API key
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("cli_command", &self.cli_command)
            .field("bridge_helper", &self.bridge_helper)
            .field("tool_path", &self.tool_path)
            .field("tool_args", &self.tool_args)
            .field("max_argument_chars", &self.max_argument_chars)
            .field("timeout_secs", &self.timeout_secs)
            .field("bridge_timeout_secs", &self.bridge_timeout_secs)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            cli_command: None,
            bridge_helper: None,
            tool_path: default_tool_path(),
            tool_args: default_tool_args(),
            max_argument_chars: default_max_argument_chars(),
            timeout_secs: default_provider_timeout(),
            bridge_timeout_secs: default_bridge_timeout(),
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn bridge_timeout(&self) -> Duration {
        Duration::from_secs(self.bridge_timeout_secs)
    }
}

#[derive(Deserialize, Clone)]
pub struct GitHubConfig {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_remote")]
    pub remote: String,
}

// Manual Debug impl to avoid leaking the token
impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("remote", &self.remote)
            .finish()
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: None,
            remote: default_remote(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TestsConfig {
    /// Report success without running anything.
    #[serde(default)]
    pub skip: bool,
    #[serde(default = "default_test_program")]
    pub program: String,
    #[serde(default = "default_test_args")]
    pub args: Vec<String>,
    #[serde(default = "default_test_timeout")]
    pub timeout_secs: u64,
    /// Parent directory for the per-run TMPDIR. System temp dir when unset.
    #[serde(default)]
    pub tmp_dir: Option<PathBuf>,
}

impl Default for TestsConfig {
    fn default() -> Self {
        Self {
            skip: false,
            program: default_test_program(),
            args: default_test_args(),
            timeout_secs: default_test_timeout(),
            tmp_dir: None,
        }
    }
}

impl TestsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RunConfig {
    #[serde(default = "default_repo_dir")]
    pub repo_dir: PathBuf,
    #[serde(default = "default_personas_path")]
    pub personas_path: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            repo_dir: default_repo_dir(),
            personas_path: default_personas_path(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_tool_path() -> String {
    "gh".to_string()
}

fn default_tool_args() -> Vec<String> {
    ["copilot", "suggest", "-t", "shell"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_argument_chars() -> usize {
    200
}

fn default_provider_timeout() -> u64 {
    60
}

fn default_bridge_timeout() -> u64 {
    120
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_test_program() -> String {
    "python".to_string()
}

fn default_test_args() -> Vec<String> {
    ["-m", "pytest", "-q"].iter().map(|s| s.to_string()).collect()
}

fn default_test_timeout() -> u64 {
    30 * 60
}

fn default_repo_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_personas_path() -> PathBuf {
    PathBuf::from("personas.json")
}

/// Plain environment variables understood for compatibility with existing setups,
/// mapped onto their configuration keys.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("LLM_API_KEY", "provider.api_key"),
    ("LLM_MODEL", "provider.model"),
    ("LLM_CLI_COMMAND", "provider.cli_command"),
    ("VSCODE_COPILOT_HELPER", "provider.bridge_helper"),
    ("GH_PATH", "provider.tool_path"),
    ("GITHUB_TOKEN", "github.token"),
];

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        Self::load_from(config_path, None, |var| std::env::var(var).ok())
    }

    /// Build the layered configuration. `env` replaces the process environment
    /// for the `PATCHLOOP__*` layer when given; `lookup` answers the plain
    /// legacy variables.
    fn load_from(
        config_path: Option<&str>,
        env: Option<config::Map<String, String>>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Load from file if specified
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("patchloop").required(false));
        }

        // Environment variable overrides with PATCHLOOP_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("PATCHLOOP")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let legacy = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        for (var, key) in LEGACY_ENV {
            builder = builder
                .set_override_option(*key, legacy(*var))
                .map_err(|e| AppError::Config(e.to_string()))?;
        }

        let provider = legacy("LLM_PROVIDER").map(|v| v.trim().to_lowercase());
        builder = builder
            .set_override_option("provider.kind", provider)
            .map_err(|e| AppError::Config(e.to_string()))?;

        if legacy("SKIP_TESTS").is_some_and(|v| is_truthy(&v)) {
            builder = builder
                .set_override("tests.skip", true)
                .map_err(|e| AppError::Config(e.to_string()))?;
        }

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    pub fn github_token(&self) -> Option<&str> {
        self.github.token.as_deref()
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}
