use async_trait::async_trait;
use octocrab::Octocrab;

use crate::config::GitHubConfig;
use crate::error::{AppError, Result};
use crate::platform::types::*;
use crate::platform::Publisher;
use crate::workspace::VersionControl;

use super::mapper;
use super::remote::parse_remote_url;

/// Opens pull requests on GitHub for the repository behind the local remote.
pub struct GitHubPublisher<'a> {
    config: GitHubConfig,
    vcs: &'a dyn VersionControl,
}

impl<'a> GitHubPublisher<'a> {
    pub fn new(config: &GitHubConfig, vcs: &'a dyn VersionControl) -> Self {
        Self {
            config: config.clone(),
            vcs,
        }
    }

    fn client(&self, token: &str) -> Result<Octocrab> {
        let mut builder = Octocrab::builder().personal_token(token.to_string());
        if let Some(base) = &self.config.api_base {
            builder = builder
                .base_uri(base.as_str())
                .map_err(|e| AppError::Config(format!("Invalid GitHub API base {base}: {e}")))?;
        }
        builder
            .build()
            .map_err(|e| AppError::GitHubApi(format!("Failed to build octocrab client: {e}")))
    }

    /// Work out where to publish, or why not.
    async fn target(&self) -> std::result::Result<(RepoSlug, String), String> {
        let remote = match self.vcs.remote_url().await {
            Ok(Some(url)) => url,
            Ok(None) => {
                return Err(format!(
                    "Could not determine git remote '{}'",
                    self.config.remote
                ))
            }
            Err(e) => return Err(format!("Could not read git remote: {e}")),
        };
        let slug = parse_remote_url(&remote)
            .ok_or_else(|| format!("Could not parse repository from remote {remote}"))?;
        let token = self
            .config
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| "GITHUB_TOKEN not set".to_string())?;
        Ok((slug, token))
    }
}

#[async_trait]
impl Publisher for GitHubPublisher<'_> {
    async fn open_pull_request(&self, pr: &CreatePullRequest) -> PublishOutcome {
        let (slug, token) = match self.target().await {
            Ok(target) => target,
            Err(reason) => {
                tracing::warn!(reason = %reason, "Skipping pull request creation");
                return PublishOutcome::Skipped { reason };
            }
        };

        let client = match self.client(&token) {
            Ok(client) => client,
            Err(e) => {
                return PublishOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        let created = client
            .pulls(&slug.owner, &slug.name)
            .create(&pr.title, &pr.head_branch, &pr.base_branch)
            .body(&pr.body)
            .send()
            .await;

        match created {
            Ok(created) => {
                let created = mapper::map_pull_request(created);
                tracing::info!(
                    repo = %slug,
                    number = created.number,
                    url = ?created.url,
                    "Created pull request"
                );
                PublishOutcome::Created {
                    number: created.number,
                    url: created.url,
                }
            }
            Err(e) => {
                let error = AppError::from(e).to_string();
                tracing::error!(repo = %slug, error = %error, "Failed to create pull request");
                PublishOutcome::Failed { error }
            }
        }
    }
}
