pub mod orchestrator;
pub mod repo;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::Orchestrator;
pub use types::{Disposition, PersonaReport, RunOptions, RunResult, WorkflowOutcome, WorkflowState};
