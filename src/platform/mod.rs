pub mod github;
pub mod types;

use async_trait::async_trait;

use types::*;

/// Hosting provider that can open a review request for a pushed branch.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Open one pull request. Failures are reported in the outcome, not raised.
    async fn open_pull_request(&self, pr: &CreatePullRequest) -> PublishOutcome;
}
