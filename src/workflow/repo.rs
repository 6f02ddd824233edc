use crate::workspace::VersionControl;

use super::types::{WorkflowOutcome, WorkflowState};

/// One persona's pass over the shared working tree.
///
/// Steps must run in order; each failure moves the workflow to
/// [`WorkflowState::Terminated`] and every later step becomes a no-op that
/// returns `false`. A failed apply is not rolled back.
pub struct RepoWorkflow<'a> {
    vcs: &'a dyn VersionControl,
    outcome: WorkflowOutcome,
}

impl<'a> RepoWorkflow<'a> {
    pub fn new(vcs: &'a dyn VersionControl, branch_name: impl Into<String>) -> Self {
        Self {
            vcs,
            outcome: WorkflowOutcome::new(branch_name),
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.outcome.state
    }

    pub async fn create_branch(&mut self) -> bool {
        if !self.in_state(WorkflowState::Init, "create_branch") {
            return false;
        }
        match self.vcs.create_branch(&self.outcome.branch_name).await {
            Ok(()) => {
                tracing::info!(branch = %self.outcome.branch_name, "Created branch");
                self.outcome.branch_created = true;
                self.advance(WorkflowState::BranchCreated);
                true
            }
            Err(e) => self.terminate("create_branch", e.to_string()),
        }
    }

    pub async fn apply_patch(&mut self, patch: &str) -> bool {
        if !self.in_state(WorkflowState::BranchCreated, "apply_patch") {
            return false;
        }
        match self.vcs.apply_patch(patch).await {
            Ok(true) => {
                self.outcome.applied = true;
                self.advance(WorkflowState::Applied);
                true
            }
            Ok(false) => self.terminate("apply_patch", "git apply failed".to_string()),
            Err(e) => self.terminate("apply_patch", e.to_string()),
        }
    }

    pub async fn commit_all(&mut self, message: &str) -> bool {
        if !self.in_state(WorkflowState::Applied, "commit_all") {
            return false;
        }
        match self.vcs.commit_all(message).await {
            Ok(()) => {
                self.outcome.committed = true;
                self.advance(WorkflowState::Committed);
                true
            }
            Err(e) => self.terminate("commit_all", e.to_string()),
        }
    }

    pub async fn push(&mut self) -> bool {
        if !self.in_state(WorkflowState::Committed, "push") {
            return false;
        }
        match self.vcs.push(&self.outcome.branch_name).await {
            Ok(()) => {
                tracing::info!(branch = %self.outcome.branch_name, "Pushed branch");
                self.outcome.pushed = true;
                self.advance(WorkflowState::Pushed);
                true
            }
            Err(e) => self.terminate("push", e.to_string()),
        }
    }

    /// Drive `create_branch → apply_patch → commit_all → push?` as far as it goes.
    pub async fn run(mut self, patch: &str, commit_message: &str, push: bool) -> WorkflowOutcome {
        if !self.create_branch().await {
            return self.outcome;
        }
        if !self.apply_patch(patch).await {
            return self.outcome;
        }
        if !self.commit_all(commit_message).await {
            return self.outcome;
        }
        if push {
            self.push().await;
        }
        self.outcome
    }

    fn in_state(&mut self, expected: WorkflowState, step: &str) -> bool {
        if self.outcome.state == expected {
            return true;
        }
        if self.outcome.state != WorkflowState::Terminated {
            let state = self.outcome.state;
            self.terminate(step, format!("{step} called in state {state:?}"));
        }
        false
    }

    fn advance(&mut self, next: WorkflowState) {
        tracing::debug!(branch = %self.outcome.branch_name, from = ?self.outcome.state, to = ?next, "Workflow step");
        self.outcome.state = next;
    }

    fn terminate(&mut self, step: &str, error: String) -> bool {
        tracing::warn!(
            branch = %self.outcome.branch_name,
            step = step,
            error = %error,
            "Workflow step failed; skipping remaining steps for this persona"
        );
        self.outcome.state = WorkflowState::Terminated;
        self.outcome.error = Some(format!("{step}: {error}"));
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::testing::RecordingVcs;

    #[tokio::test]
    async fn test_full_sequence_with_push() {
        let vcs = RecordingVcs::default();
        let outcome = RepoWorkflow::new(&vcs, "agent/a/1")
            .run("diff", "agent(a): task", true)
            .await;

        assert_eq!(outcome.state, WorkflowState::Pushed);
        assert!(outcome.branch_created && outcome.applied && outcome.committed && outcome.pushed);
        assert_eq!(outcome.error, None);
        assert_eq!(
            vcs.calls(),
            vec![
                "create_branch agent/a/1",
                "apply_patch",
                "commit_all agent(a): task",
                "push agent/a/1"
            ]
        );
    }

    #[tokio::test]
    async fn test_push_not_requested() {
        let vcs = RecordingVcs::default();
        let outcome = RepoWorkflow::new(&vcs, "agent/a/1").run("diff", "m", false).await;
        assert_eq!(outcome.state, WorkflowState::Committed);
        assert!(!outcome.pushed);
        assert!(!vcs.calls().iter().any(|c| c.starts_with("push")));
    }

    #[tokio::test]
    async fn test_apply_failure_skips_commit_and_push() {
        let vcs = RecordingVcs {
            reject_patches: true,
            ..RecordingVcs::default()
        };
        let outcome = RepoWorkflow::new(&vcs, "agent/a/1").run("diff", "m", true).await;

        assert_eq!(outcome.state, WorkflowState::Terminated);
        assert!(outcome.branch_created);
        assert!(!outcome.applied && !outcome.committed && !outcome.pushed);
        assert!(outcome.error.as_deref().unwrap().starts_with("apply_patch"));
        assert_eq!(vcs.calls(), vec!["create_branch agent/a/1", "apply_patch"]);
    }

    #[tokio::test]
    async fn test_branch_failure_terminates_immediately() {
        let vcs = RecordingVcs {
            fail_branches: true,
            ..RecordingVcs::default()
        };
        let outcome = RepoWorkflow::new(&vcs, "agent/a/1").run("diff", "m", true).await;
        assert_eq!(outcome.state, WorkflowState::Terminated);
        assert!(!outcome.branch_created);
        assert_eq!(vcs.calls(), vec!["create_branch agent/a/1"]);
    }

    #[tokio::test]
    async fn test_push_failure_keeps_commit() {
        let vcs = RecordingVcs {
            fail_push: true,
            ..RecordingVcs::default()
        };
        let outcome = RepoWorkflow::new(&vcs, "agent/a/1").run("diff", "m", true).await;
        assert_eq!(outcome.state, WorkflowState::Terminated);
        assert!(outcome.committed);
        assert!(!outcome.pushed);
        assert!(outcome.error.as_deref().unwrap().starts_with("push"));
    }

    #[tokio::test]
    async fn test_out_of_order_step_is_refused() {
        let vcs = RecordingVcs::default();
        let mut wf = RepoWorkflow::new(&vcs, "agent/a/1");
        assert!(!wf.commit_all("m").await);
        assert_eq!(wf.state(), WorkflowState::Terminated);
        assert!(!wf.create_branch().await);
        assert!(vcs.calls().is_empty());
    }
}
