//! Git dependency fetching (spec §4.3).
//!
//! Clones or updates a repository into `ExternalDependency::destination`
//! and checks out the declared branch/tag/commit, recording the resolved
//! commit hash for the cache.

use std::path::Path;

use anyhow::{Context, Result};
use git2::{Repository, ResetType};

use crate::core::dependency::GitDependency;

/// The outcome of a git fetch, recorded into the external-dependency cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitFetchResult {
    pub last_commit_hash: String,
    pub last_branch: Option<String>,
}

/// Clone (if absent) or update (if present) `dest`, then check out the
/// declared reference.
pub fn fetch(dep: &GitDependency, dest: &Path) -> Result<GitFetchResult> {
    if dest.exists() {
        update(dep, dest)?;
    } else {
        clone(dep, dest)?;
    }
    checkout(dep, dest)
}

/// True when the remote's current hash for the declared ref differs from
/// the cached one — avoids a full fetch when nothing changed.
pub fn has_update(dep: &GitDependency, cached_hash: &str) -> Result<bool> {
    let remote_hash = ls_remote(dep)?;
    Ok(remote_hash.as_deref() != Some(cached_hash))
}

fn ls_remote(dep: &GitDependency) -> Result<Option<String>> {
    // Use an in-memory remote rather than a shell `git ls-remote` subprocess;
    // connecting read-only avoids touching any local checkout.
    let repo = Repository::init_bare(std::env::temp_dir().join("crucible-ls-remote-scratch"))
        .or_else(|_| Repository::open(std::env::temp_dir().join("crucible-ls-remote-scratch")))?;
    let mut remote = repo.remote_anonymous(&dep.repository)?;
    let connection = remote.connect_auth(git2::Direction::Fetch, None, None);
    let Ok(mut connection) = connection else {
        return Ok(None);
    };
    let want = dep
        .commit
        .clone()
        .or_else(|| dep.tag.clone().map(|t| format!("refs/tags/{t}")))
        .or_else(|| dep.branch.clone().map(|b| format!("refs/heads/{b}")))
        .unwrap_or_else(|| "HEAD".to_string());

    let heads = connection.list()?;
    let hash = heads
        .iter()
        .find(|h| h.name() == want || h.name().ends_with(&want))
        .map(|h| h.oid().to_string());
    Ok(hash)
}

fn clone(dep: &GitDependency, dest: &Path) -> Result<()> {
    tracing::info!("cloning {}", dep.repository);
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut builder = git2::build::RepoBuilder::new();
    if let Some(branch) = &dep.branch {
        builder.branch(branch);
    }
    let mut fetch_opts = git2::FetchOptions::new();
    if dep.shallow && dep.commit.is_none() {
        fetch_opts.depth(1);
    }
    builder.fetch_options(fetch_opts);

    builder
        .clone(&dep.repository, dest)
        .with_context(|| format!("failed to clone {}", dep.repository))?;

    if dep.submodules {
        let repo = Repository::open(dest)?;
        for mut submodule in repo.submodules()? {
            submodule.update(true, None)?;
        }
    }

    Ok(())
}

fn update(dep: &GitDependency, dest: &Path) -> Result<()> {
    tracing::info!("updating {}", dep.repository);
    let repo = Repository::open(dest).with_context(|| format!("failed to open {}", dest.display()))?;
    let mut remote = repo.find_remote("origin")?;
    remote.fetch(&["refs/heads/*:refs/heads/*", "refs/tags/*:refs/tags/*"], None, None)?;
    Ok(())
}

fn checkout(dep: &GitDependency, dest: &Path) -> Result<GitFetchResult> {
    let repo = Repository::open(dest)?;

    let commit = if let Some(commit) = &dep.commit {
        let oid = git2::Oid::from_str(commit)?;
        repo.find_commit(oid)?
    } else if let Some(tag) = &dep.tag {
        let reference = repo.find_reference(&format!("refs/tags/{tag}"))?;
        reference.peel_to_commit()?
    } else if let Some(branch) = &dep.branch {
        let reference = repo.find_branch(branch, git2::BranchType::Local).or_else(|_| {
            repo.find_branch(&format!("origin/{branch}"), git2::BranchType::Remote)
        })?;
        reference.get().peel_to_commit()?
    } else {
        repo.head()?.peel_to_commit()?
    };

    repo.set_head_detached(commit.id())?;
    repo.reset(commit.as_object(), ResetType::Hard, None)
        .with_context(|| "failed to reset working tree to requested commit")?;
    repo.set_head_detached_from_annotated(repo.find_annotated_commit(commit.id())?)
        .ok();
    repo.checkout_head(Some(git2::build::CheckoutBuilder::new().force())).ok();

    Ok(GitFetchResult {
        last_commit_hash: commit.id().to_string(),
        last_branch: dep.branch.clone(),
    })
}

/// Sanitize a repository URL for use as a directory-name component.
pub fn sanitize_url_for_path(url: &str) -> String {
    let parsed = url::Url::parse(url).ok();
    let mut name = String::new();

    if let Some(parsed) = &parsed {
        if let Some(host) = parsed.host_str() {
            name.push_str(host);
        }
        let path = parsed.path().trim_matches('/');
        if !path.is_empty() {
            name.push('-');
            name.push_str(&path.replace('/', "-"));
        }
    } else {
        name.push_str(url);
    }

    if name.ends_with(".git") {
        name.truncate(name.len() - 4);
    }

    name
}
