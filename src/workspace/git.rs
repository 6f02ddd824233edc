use std::cell::Cell;
use std::path::Path;

use git2::{
    BranchType, Config, Cred, CredentialType, IndexAddOption, PushOptions,
    RemoteCallbacks, Repository, Signature,
};

use crate::error::{AppError, Result};

/// Give up instead of letting libgit2 retry rejected credentials forever.
const MAX_CREDENTIAL_ATTEMPTS: u32 = 3;

/// Validate a branch name to prevent argument injection.
/// Rejects names starting with `-` as defence in depth.
fn validate_branch_name(name: &str) -> Result<()> {
    if name.starts_with('-') {
        return Err(AppError::Git(format!(
            "Invalid branch name (starts with '-'): {name}"
        )));
    }
    Ok(())
}

/// Build `PushOptions` that authenticate via credential callback.
///
/// A configured token is offered as `x-access-token` basic auth; otherwise the
/// SSH agent or the user's git credential helper is asked. A rejected ref
/// update is reported as an error instead of being silently ignored.
fn make_push_options<'a>(token: Option<&'a str>, git_config: &'a Config) -> PushOptions<'a> {
    let attempts = Cell::new(0u32);
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url, username_from_url, allowed_types| {
        attempts.set(attempts.get() + 1);
        if attempts.get() > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str("authentication failed"));
        }
        if let Some(token) = token {
            if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
                return Cred::userpass_plaintext("x-access-token", token);
            }
        }
        if allowed_types.contains(CredentialType::SSH_KEY) {
            return Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"));
        }
        Cred::credential_helper(git_config, url, username_from_url)
    });
    callbacks.push_update_reference(|refname, status| match status {
        Some(msg) => Err(git2::Error::from_str(&format!(
            "remote rejected {refname}: {msg}"
        ))),
        None => Ok(()),
    });
    let mut opts = PushOptions::new();
    opts.remote_callbacks(callbacks);
    opts
}

/// Fail early when `dir` is not inside a git working tree.
pub async fn ensure_repository(dir: &Path) -> Result<()> {
    let dir = dir.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        if repo.is_bare() {
            return Err(AppError::Git(format!(
                "{} is a bare repository",
                dir.display()
            )));
        }
        Ok(())
    })
    .await
    .map_err(|e| AppError::Git(format!("Open-repository task panicked: {e}")))?
}

/// Create and checkout a new branch.
pub async fn create_branch(dir: &Path, branch_name: &str) -> Result<()> {
    validate_branch_name(branch_name)?;

    let dir = dir.to_path_buf();
    let branch_name = branch_name.to_string();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let head = repo.head()?;
        let commit = head.peel_to_commit()?;
        repo.branch(&branch_name, &commit, false)?;
        let obj = repo.revparse_single(&format!("refs/heads/{branch_name}"))?;
        repo.checkout_tree(&obj, None)?;
        repo.set_head(&format!("refs/heads/{branch_name}"))?;
        Ok(())
    })
    .await
    .map_err(|e| AppError::Git(format!("Create-branch task panicked: {e}")))?
}

/// Stage all changes, including deletions.
pub async fn add_all(dir: &Path) -> Result<()> {
    let dir = dir.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let mut index = repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        Ok(())
    })
    .await
    .map_err(|e| AppError::Git(format!("Add-all task panicked: {e}")))?
}

/// Commit the index with a message. Fails when the index matches HEAD.
pub async fn commit(dir: &Path, message: &str) -> Result<()> {
    let dir = dir.to_path_buf();
    let message = message.to_string();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let sig = match repo.signature() {
            Ok(sig) => sig,
            Err(_) => Signature::now("Patchloop Agent", "patchloop@users.noreply.github.com")?,
        };
        let mut index = repo.index()?;
        let tree_oid = index.write_tree()?;
        let tree = repo.find_tree(tree_oid)?;
        let head = repo.head()?;
        let parent = head.peel_to_commit()?;
        if parent.tree_id() == tree_oid {
            return Err(AppError::Git("Nothing to commit".to_string()));
        }
        repo.commit(Some("HEAD"), &sig, &sig, &message, &tree, &[&parent])?;
        Ok(())
    })
    .await
    .map_err(|e| AppError::Git(format!("Commit task panicked: {e}")))?
}

/// Push a branch to `remote_name` and track it as upstream.
pub async fn push(dir: &Path, remote_name: &str, branch_name: &str, token: Option<&str>) -> Result<()> {
    validate_branch_name(branch_name)?;

    let dir = dir.to_path_buf();
    let remote_name = remote_name.to_string();
    let branch_name = branch_name.to_string();
    let token = token.map(str::to_string);

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let git_config = repo.config()?;
        let mut remote = repo.find_remote(&remote_name)?;
        let refspec = format!("refs/heads/{branch_name}:refs/heads/{branch_name}");
        let mut push_opts = make_push_options(token.as_deref(), &git_config);
        remote.push(&[&refspec], Some(&mut push_opts))?;

        // Equivalent of `push -u`; the tracking ref only exists if the remote reported it.
        let upstream = format!("{remote_name}/{branch_name}");
        if let Err(e) = repo
            .find_branch(&branch_name, BranchType::Local)
            .and_then(|mut b| b.set_upstream(Some(upstream.as_str())))
        {
            tracing::debug!(branch = %branch_name, error = %e.message(), "Could not set upstream");
        }
        Ok(())
    })
    .await
    .map_err(|e| AppError::Git(format!("Push task panicked: {e}")))?
}

/// URL of the named remote, or `None` if it is not configured.
pub async fn remote_url(dir: &Path, remote_name: &str) -> Result<Option<String>> {
    let dir = dir.to_path_buf();
    let remote_name = remote_name.to_string();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let url = repo
            .find_remote(&remote_name)
            .ok()
            .and_then(|remote| remote.url().map(str::to_string));
        Ok(url)
    })
    .await
    .map_err(|e| AppError::Git(format!("Remote-url task panicked: {e}")))?
}
