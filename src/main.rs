use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use patchloop::agent::persona;
use patchloop::config::AppConfig;
use patchloop::platform::github::GitHubPublisher;
use patchloop::process::{CommandRunner, SystemRunner};
use patchloop::provider::Provider;
use patchloop::workflow::{Disposition, Orchestrator, RunOptions, RunResult};
use patchloop::workspace::{git, CommandTestRunner, GitWorkspace};

#[derive(Parser)]
#[command(
    name = "patchloop",
    about = "Ask each persona for a patch, apply it, run the tests, open a pull request"
)]
struct Cli {
    /// What the personas should change
    #[arg(long)]
    task: String,

    /// Apply patches to the working tree and commit them
    #[arg(long)]
    apply: bool,

    /// Push each persona branch to the remote
    #[arg(long)]
    push: bool,

    /// Open a pull request for the last attempted branch
    #[arg(long)]
    pr: bool,

    /// Print patches without touching the repository or running tests
    #[arg(long)]
    dry_run: bool,

    /// Report tests as passing without running them
    #[arg(long)]
    skip_tests: bool,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Persona file (JSON, or TOML by extension)
    #[arg(long)]
    personas: Option<PathBuf>,

    /// Repository working tree
    #[arg(long)]
    repo: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn options(&self) -> RunOptions {
        RunOptions {
            apply: self.apply,
            push: self.push,
            publish: self.pr,
            dry_run: self.dry_run,
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries previews and the final result
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if cli.skip_tests {
        config.tests.skip = true;
    }
    if let Some(repo) = &cli.repo {
        config.run.repo_dir = repo.clone();
    }
    if let Some(path) = &cli.personas {
        config.run.personas_path = path.clone();
    }

    let task = cli.task.trim();
    anyhow::ensure!(!task.is_empty(), "--task must not be empty");

    let personas = persona::load(&config.run.personas_path).with_context(|| {
        format!(
            "Failed to load personas from {}",
            config.run.personas_path.display()
        )
    })?;

    let options = cli.options();
    let repo_dir = config.run.repo_dir.clone();
    if options.mutates_repository() {
        git::ensure_repository(&repo_dir)
            .await
            .with_context(|| format!("{} is not a usable git repository", repo_dir.display()))?;
    }

    tracing::info!(
        repo = %repo_dir.display(),
        personas = personas.len(),
        "Starting patchloop"
    );

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let provider = Provider::from_config(&config.provider, Arc::clone(&runner))?;
    let workspace = GitWorkspace::new(
        &repo_dir,
        &config.github.remote,
        config.github_token().map(str::to_string),
        Arc::clone(&runner),
    );
    let tests = CommandTestRunner::new(&config.tests, &repo_dir, Arc::clone(&runner));
    let publisher = GitHubPublisher::new(&config.github, &workspace);

    let result = Orchestrator::new(&provider, &workspace, &tests, &publisher)
        .run(task, &personas, options)
        .await;

    print_result(&result);
    Ok(())
}

fn print_result(result: &RunResult) {
    for report in &result.personas {
        match &report.disposition {
            Disposition::Previewed => {
                println!("=== {} ({}) ===", report.display_name, report.persona_id);
                println!("{}", report.patch.as_deref().unwrap_or_default());
            }
            Disposition::NoPatch => println!("{}: no patch", report.persona_id),
            Disposition::ProviderFailed { error } => {
                println!("{}: provider failed: {error}", report.persona_id)
            }
            Disposition::Workflow(outcome) => match &outcome.error {
                Some(error) => println!("{}: {} failed: {error}", report.persona_id, outcome.branch_name),
                None => println!("{}: {} {:?}", report.persona_id, outcome.branch_name, outcome.state),
            },
        }
    }

    println!(
        "Tests: {}",
        if result.tests_passed { "passed" } else { "failed" }
    );
    if let Some(url) = &result.pr_url {
        println!("PR: {url}");
    }
}
