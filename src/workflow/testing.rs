//! In-memory stand-ins for the orchestrator's collaborators.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, ProviderError, Result};
use crate::platform::types::{CreatePullRequest, PublishOutcome};
use crate::platform::Publisher;
use crate::provider::TextGenerator;
use crate::workspace::{TestRunner, VersionControl};

/// Answers prompts from a script, in order. An exhausted script answers "".
#[derive(Default)]
pub struct StubGenerator {
    pub prompts: Mutex<Vec<String>>,
    script: Mutex<VecDeque<std::result::Result<String, ProviderError>>>,
}

impl StubGenerator {
    pub fn new<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = std::result::Result<String, ProviderError>>,
    {
        Self {
            prompts: Mutex::default(),
            script: Mutex::new(responses.into_iter().collect()),
        }
    }

    /// Every persona answers with the same patch wrapped in markers.
    pub fn always_patch(patch: &str, times: usize) -> Self {
        Self::new((0..times).map(|_| Ok(format!("PATCH_START\n{patch}\nPATCH_END"))))
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

/// Records every call as a short string; fails where told to.
#[derive(Default)]
pub struct RecordingVcs {
    pub log: Mutex<Vec<String>>,
    pub reject_patches: bool,
    pub fail_branches: bool,
    pub fail_push: bool,
    pub remote: Option<String>,
}

impl RecordingVcs {
    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.log.lock().unwrap().push(call);
    }
}

#[async_trait]
impl VersionControl for RecordingVcs {
    async fn create_branch(&self, name: &str) -> Result<()> {
        self.record(format!("create_branch {name}"));
        if self.fail_branches {
            return Err(AppError::Git(format!("cannot create {name}")));
        }
        Ok(())
    }

    async fn apply_patch(&self, _patch: &str) -> Result<bool> {
        self.record("apply_patch".to_string());
        Ok(!self.reject_patches)
    }

    async fn commit_all(&self, message: &str) -> Result<()> {
        self.record(format!("commit_all {message}"));
        Ok(())
    }

    async fn push(&self, branch: &str) -> Result<()> {
        self.record(format!("push {branch}"));
        if self.fail_push {
            return Err(AppError::Git("remote rejected".to_string()));
        }
        Ok(())
    }

    async fn remote_url(&self) -> Result<Option<String>> {
        self.record("remote_url".to_string());
        Ok(self.remote.clone())
    }
}

pub struct CountingTests {
    pub runs: AtomicUsize,
    pub pass: bool,
}

impl CountingTests {
    pub fn passing() -> Self {
        Self {
            runs: AtomicUsize::new(0),
            pass: true,
        }
    }

    pub fn failing() -> Self {
        Self {
            runs: AtomicUsize::new(0),
            pass: false,
        }
    }

    pub fn count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TestRunner for CountingTests {
    async fn run_tests(&self) -> bool {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.pass
    }
}

pub struct RecordingPublisher {
    pub requests: Mutex<Vec<CreatePullRequest>>,
    pub outcome: PublishOutcome,
}

impl RecordingPublisher {
    pub fn created(url: &str) -> Self {
        Self {
            requests: Mutex::default(),
            outcome: PublishOutcome::Created {
                number: 7,
                url: Some(url.to_string()),
            },
        }
    }

    pub fn requests(&self) -> Vec<CreatePullRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn open_pull_request(&self, pr: &CreatePullRequest) -> PublishOutcome {
        self.requests.lock().unwrap().push(pr.clone());
        self.outcome.clone()
    }
}
