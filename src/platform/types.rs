/// Owner and name of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone)]
pub struct PullRequest {
    pub number: u64,
    pub url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreatePullRequest {
    pub title: String,
    pub body: String,
    pub head_branch: String,
    pub base_branch: String,
}

/// What happened to the publish step. Never an error for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Created { number: u64, url: Option<String> },
    Skipped { reason: String },
    Failed { error: String },
}

impl PublishOutcome {
    pub fn url(&self) -> Option<&str> {
        match self {
            PublishOutcome::Created { url, .. } => url.as_deref(),
            _ => None,
        }
    }
}
