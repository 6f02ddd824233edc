use crate::platform::types::PublishOutcome;

/// Where a persona's repository workflow got to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Init,
    BranchCreated,
    Applied,
    Committed,
    Pushed,
    /// A step failed; the remaining steps were skipped.
    Terminated,
}

/// Result of one persona's branch → apply → commit → push sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOutcome {
    pub branch_name: String,
    pub state: WorkflowState,
    pub branch_created: bool,
    pub applied: bool,
    pub committed: bool,
    pub pushed: bool,
    pub error: Option<String>,
}

impl WorkflowOutcome {
    pub fn new(branch_name: impl Into<String>) -> Self {
        Self {
            branch_name: branch_name.into(),
            state: WorkflowState::Init,
            branch_created: false,
            applied: false,
            committed: false,
            pushed: false,
            error: None,
        }
    }
}

/// What the loop did for one persona.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The provider call failed; treated as "no patch".
    ProviderFailed { error: String },
    /// The response held no patch.
    NoPatch,
    /// Dry run or apply not requested: patch surfaced, repository untouched.
    Previewed,
    /// The repository workflow ran.
    Workflow(WorkflowOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaReport {
    pub persona_id: String,
    pub display_name: String,
    pub patch: Option<String>,
    pub disposition: Disposition,
}

/// Caller's choices for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub apply: bool,
    pub push: bool,
    pub publish: bool,
    pub dry_run: bool,
}

impl RunOptions {
    /// Whether personas may touch the repository at all.
    pub fn mutates_repository(&self) -> bool {
        self.apply && !self.dry_run
    }
}

/// Terminal artifact of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub last_attempted_branch: Option<String>,
    pub tests_passed: bool,
    pub pr_url: Option<String>,
    pub publish: Option<PublishOutcome>,
    pub personas: Vec<PersonaReport>,
}
