use chrono::{DateTime, Utc};

use crate::agent::{patch, prompt, Persona};
use crate::platform::types::CreatePullRequest;
use crate::platform::Publisher;
use crate::provider::TextGenerator;
use crate::workspace::{TestRunner, VersionControl};

use super::repo::RepoWorkflow;
use super::types::{Disposition, PersonaReport, RunOptions, RunResult};

pub const PR_BODY: &str = "Automated PR created by agents";
pub const PR_BASE: &str = "main";

/// `agent/<persona id>/<run stamp>`
pub fn branch_name(persona_id: &str, stamp: &str) -> String {
    format!("agent/{persona_id}/{stamp}")
}

pub fn run_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H%M%S").to_string()
}

/// Drives every persona in order over one shared working tree, then tests
/// once and publishes at most once.
pub struct Orchestrator<'a> {
    generator: &'a dyn TextGenerator,
    vcs: &'a dyn VersionControl,
    tests: &'a dyn TestRunner,
    publisher: &'a dyn Publisher,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        generator: &'a dyn TextGenerator,
        vcs: &'a dyn VersionControl,
        tests: &'a dyn TestRunner,
        publisher: &'a dyn Publisher,
    ) -> Self {
        Self {
            generator,
            vcs,
            tests,
            publisher,
        }
    }

    pub async fn run(&self, task: &str, personas: &[Persona], options: RunOptions) -> RunResult {
        self.run_at(task, personas, options, Utc::now()).await
    }

    /// Like [`run`](Self::run) with a fixed start time; every branch of the run
    /// shares the stamp derived from it.
    pub async fn run_at(
        &self,
        task: &str,
        personas: &[Persona],
        options: RunOptions,
        started: DateTime<Utc>,
    ) -> RunResult {
        let stamp = run_stamp(started);
        tracing::info!(
            personas = personas.len(),
            apply = options.apply,
            push = options.push,
            publish = options.publish,
            dry_run = options.dry_run,
            "Starting run"
        );

        let mut reports = Vec::with_capacity(personas.len());
        let mut last_attempted_branch = None;

        for persona in personas {
            let report = self.run_persona(persona, task, options, &stamp).await;
            if let Disposition::Workflow(outcome) = &report.disposition {
                if outcome.branch_created {
                    last_attempted_branch = Some(outcome.branch_name.clone());
                }
            }
            reports.push(report);
        }

        let tests_passed = if options.dry_run {
            tracing::info!("Dry run: skipping tests");
            true
        } else {
            let passed = self.tests.run_tests().await;
            tracing::info!(passed, "Test run finished");
            passed
        };

        let publish = match (&last_attempted_branch, tests_passed && options.publish && options.push) {
            (Some(branch), true) => {
                let request = CreatePullRequest {
                    title: format!("agent: {task}"),
                    body: PR_BODY.to_string(),
                    head_branch: branch.clone(),
                    base_branch: PR_BASE.to_string(),
                };
                tracing::info!(branch = %branch, "Publishing pull request");
                Some(self.publisher.open_pull_request(&request).await)
            }
            (None, true) => {
                tracing::info!("No branch was created; nothing to publish");
                None
            }
            _ => None,
        };
        let pr_url = publish
            .as_ref()
            .and_then(|outcome| outcome.url())
            .map(str::to_string);

        RunResult {
            last_attempted_branch,
            tests_passed,
            pr_url,
            publish,
            personas: reports,
        }
    }

    async fn run_persona(
        &self,
        persona: &Persona,
        task: &str,
        options: RunOptions,
        stamp: &str,
    ) -> PersonaReport {
        tracing::info!(persona = %persona.id, name = %persona.display_name, "Running persona");
        let report = |patch: Option<String>, disposition: Disposition| PersonaReport {
            persona_id: persona.id.clone(),
            display_name: persona.display_name.clone(),
            patch,
            disposition,
        };

        let prompt = prompt::patch_prompt(persona, task);
        let raw = match self.generator.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(persona = %persona.id, error = %e, "Provider failed; treating as no patch");
                return report(
                    None,
                    Disposition::ProviderFailed {
                        error: e.to_string(),
                    },
                );
            }
        };

        let Some(patch) = patch::extract(&raw) else {
            tracing::info!(persona = %persona.id, "No patch produced");
            return report(None, Disposition::NoPatch);
        };

        if !options.mutates_repository() {
            tracing::info!(
                persona = %persona.id,
                dry_run = options.dry_run,
                patch = %patch,
                "Patch preview; repository untouched"
            );
            return report(Some(patch), Disposition::Previewed);
        }

        let branch = branch_name(&persona.id, stamp);
        let message = format!("agent({}): {task}", persona.id);
        let outcome = RepoWorkflow::new(self.vcs, branch)
            .run(&patch, &message, options.push)
            .await;
        report(Some(patch), Disposition::Workflow(outcome))
    }
}
