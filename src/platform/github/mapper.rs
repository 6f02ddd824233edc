use crate::platform::types;

pub fn map_pull_request(pr: octocrab::models::pulls::PullRequest) -> types::PullRequest {
    types::PullRequest {
        number: pr.number,
        url: pr.html_url.map(|u| u.to_string()),
    }
}
