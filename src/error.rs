use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Persona file error: {0}")]
    Persona(String),

    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    #[error("Git operation failed: {0}")]
    Git(String),

    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of a single text-generation call. None of these abort a run.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no API credential configured (set LLM_API_KEY or provider.api_key)")]
    CredentialMissing,

    #[error("no CLI command configured (set LLM_CLI_COMMAND or provider.cli_command)")]
    CommandMissing,

    #[error("editor bridge helper not configured (set VSCODE_COPILOT_HELPER or provider.bridge_helper)")]
    HelperNotConfigured,

    #[error("request failed with {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("command exited with {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("bridge helper exited with {code:?}: {stderr}")]
    HelperFailed { code: Option<i32>, stderr: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProcessError> for ProviderError {
    fn from(e: ProcessError) -> Self {
        match e {
            ProcessError::Spawn { program, source } => ProviderError::Spawn { program, source },
            ProcessError::Timeout(d) => ProviderError::Timeout(d),
            ProcessError::Io(e) => ProviderError::Io(e),
        }
    }
}

/// Failures of the command runner itself, as opposed to a command that ran and failed.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error while talking to child process: {0}")]
    Io(#[from] std::io::Error),
}

impl From<octocrab::Error> for AppError {
    fn from(e: octocrab::Error) -> Self {
        AppError::GitHubApi(e.to_string())
    }
}

impl From<git2::Error> for AppError {
    fn from(e: git2::Error) -> Self {
        AppError::Git(e.message().to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
